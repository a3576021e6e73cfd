use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, Result};

const APP_DIR: &str = "tech-digest";

/// Largest page the Qiita items API accepts.
const QIITA_MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// The only origin allowed to call the API from a browser.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Tags fetched by every ingestion pass.
    #[serde(default = "default_ingest_tags")]
    pub ingest_tags: Vec<String>,

    #[serde(default = "default_ingest_timeout")]
    pub ingest_timeout_secs: u64,

    #[serde(default)]
    pub qiita: QiitaConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QiitaConfig {
    #[serde(default = "default_qiita_url")]
    pub base_url: String,

    #[serde(default = "default_per_page")]
    pub per_page: u32,

    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Informational only; tokens are checked against the project the `api_key` belongs to.
    #[serde(default)]
    pub project_id: String,

    /// Web API key of the identity provider project.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_identity_url")]
    pub base_url: String,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("articles.db").to_string_lossy().to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_ingest_tags() -> Vec<String> {
    [
        "Go",
        "Python",
        "JavaScript",
        "TypeScript",
        "React",
        "Vue",
        "Docker",
        "Kubernetes",
        "AWS",
        "Firebase",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_ingest_timeout() -> u64 {
    60
}

fn default_qiita_url() -> String {
    "https://qiita.com".to_string()
}

fn default_per_page() -> u32 {
    20
}

fn default_identity_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

impl Default for QiitaConfig {
    fn default() -> Self {
        Self {
            base_url: default_qiita_url(),
            per_page: default_per_page(),
            access_token: None,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: String::new(),
            base_url: default_identity_url(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_address: default_bind_address(),
            allowed_origin: default_allowed_origin(),
            ingest_tags: default_ingest_tags(),
            ingest_timeout_secs: default_ingest_timeout(),
            qiita: QiitaConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

impl Config {
    /// Load the config file (writing defaults if there is none), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("TECH_DIGEST_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    fn apply_env(&mut self) {
        if let Some(project_id) = var("FIREBASE_PROJECT_ID") {
            self.identity.project_id = project_id;
        }
        if let Some(api_key) = var("FIREBASE_API_KEY") {
            self.identity.api_key = api_key;
        }
        if let Some(token) = var("QIITA_ACCESS_TOKEN") {
            self.qiita.access_token = Some(token);
        }
        if let Some(bind) = var("TECH_DIGEST_BIND") {
            self.bind_address = bind;
        }
    }

    /// Check the settings the server can't start without.
    pub fn validate(&self) -> Result<()> {
        if self.identity.api_key.is_empty() {
            return Err(AppError::Config(
                "identity.api_key is not set (or FIREBASE_API_KEY)".to_string(),
            ));
        }
        if !(1..=QIITA_MAX_PER_PAGE).contains(&self.qiita.per_page) {
            return Err(AppError::Config(format!(
                "qiita.per_page must be between 1 and {}, got {}",
                QIITA_MAX_PER_PAGE, self.qiita.per_page
            )));
        }
        Ok(())
    }

    pub fn ingest_timeout(&self) -> Duration {
        Duration::from_secs(self.ingest_timeout_secs)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty()).inspect(|_| {
        tracing::info!("Using {key} from the environment");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.ingest_tags.len(), 10);
        assert_eq!(config.ingest_timeout(), Duration::from_secs(60));

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.ingest_tags, config.ingest_tags);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
ingest_tags = ["Rust"]
ingest_timeout_secs = 5

[identity]
project_id = "demo"
api_key = "key"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.ingest_tags, vec!["Rust"]);
        assert_eq!(config.ingest_timeout_secs, 5);
        assert_eq!(config.allowed_origin, "http://localhost:3000");
        assert_eq!(config.qiita.per_page, 20);
        assert_eq!(config.identity.base_url, "https://identitytoolkit.googleapis.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_requires_identity_settings() {
        let config = Config {
            db_path: ":memory:".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn project_id_is_optional() {
        let mut config = Config {
            db_path: ":memory:".to_string(),
            ..Config::default()
        };
        config.identity.api_key = "key".to_string();

        assert!(config.identity.project_id.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn per_page_outside_qiita_range_is_rejected() {
        let mut config = Config {
            db_path: ":memory:".to_string(),
            ..Config::default()
        };
        config.identity.api_key = "key".to_string();

        for per_page in [0, 101] {
            config.qiita.per_page = per_page;
            assert!(
                matches!(config.validate(), Err(AppError::Config(_))),
                "per_page {}",
                per_page
            );
        }
        for per_page in [1, 100] {
            config.qiita.per_page = per_page;
            assert!(config.validate().is_ok(), "per_page {}", per_page);
        }
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "ingest_tags = 3").unwrap();

        assert!(matches!(Config::load_from(&path), Err(AppError::TomlDe(_))));
    }
}
