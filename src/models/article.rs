use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds between the Unix epoch and `0001-01-01T00:00:00Z`.
const ZERO_TIMESTAMP_SECS: i64 = -62_135_596_800;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: i64,
    #[serde(default = "zero_timestamp")]
    pub published_at: DateTime<Utc>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Document key: the source id, or the canonical URL when the source gave none.
    pub fn key(&self) -> Option<&str> {
        [self.id.as_str(), self.url.as_str()]
            .into_iter()
            .find(|k| !k.is_empty())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The timestamp stored when a source timestamp can't be parsed.
pub fn zero_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIMESTAMP_SECS, 0).unwrap_or_default()
}

/// Parse an RFC 3339 timestamp into UTC, degrading to [`zero_timestamp`] with a warning.
pub fn normalize_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!("Failed to parse {} timestamp '{}': {}", context, raw, e);
            zero_timestamp()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, url: &str) -> Article {
        Article {
            id: id.to_string(),
            title: "t".to_string(),
            url: url.to_string(),
            tags: vec!["Go".to_string()],
            likes: 1,
            published_at: zero_timestamp(),
            source: "Qiita".to_string(),
            fetched_at: None,
        }
    }

    #[test]
    fn key_falls_back_to_url() {
        assert_eq!(article("abc", "https://x/1").key(), Some("abc"));
        assert_eq!(article("", "https://x/1").key(), Some("https://x/1"));
        assert_eq!(article("", "").key(), None);
    }

    #[test]
    fn zero_timestamp_serializes_as_year_one() {
        let json = serde_json::to_value(zero_timestamp()).unwrap();
        assert_eq!(json, "0001-01-01T00:00:00Z");
    }

    #[test]
    fn normalize_converts_offsets_to_utc() {
        let dt = normalize_timestamp("2024-03-01T09:00:00+09:00", "test");
        assert_eq!(dt.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn normalize_degrades_on_garbage() {
        assert_eq!(normalize_timestamp("yesterday", "test"), zero_timestamp());
    }

    #[test]
    fn serializes_camel_case_and_omits_missing_fetched_at() {
        let json = serde_json::to_value(article("a", "u")).unwrap();
        assert!(json.get("publishedAt").is_some());
        assert!(json.get("fetchedAt").is_none());
        assert!(json.get("published_at").is_none());
    }
}
