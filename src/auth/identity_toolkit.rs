use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::IdentityConfig;
use crate::error::{AppError, Result};

use super::TokenVerifier;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
}

/// Verifies Firebase ID tokens through the Identity Toolkit `accounts:lookup` endpoint.
pub struct IdentityToolkitVerifier {
    client: Client,
    lookup_url: Url,
    api_key: String,
}

impl IdentityToolkitVerifier {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let lookup_url = Url::parse(&config.base_url)
            .and_then(|base| base.join("/v1/accounts:lookup"))
            .map_err(|e| AppError::Config(format!("invalid identity.base_url: {}", e)))?;

        if config.project_id.is_empty() {
            tracing::info!("Verifying ID tokens with the configured API key");
        } else {
            tracing::info!("Verifying ID tokens for project {}", config.project_id);
        }

        Ok(Self {
            client,
            lookup_url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl TokenVerifier for IdentityToolkitVerifier {
    async fn verify(&self, token: &str) -> Result<Option<String>> {
        let response = self
            .client
            .post(self.lookup_url.clone())
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupRequest { id_token: token })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let lookup: LookupResponse = response.json().await?;
                Ok(lookup.users.into_iter().next().map(|u| u.local_id))
            }
            // INVALID_ID_TOKEN, TOKEN_EXPIRED, USER_NOT_FOUND and friends
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                tracing::debug!("Identity provider rejected token: {}", body);
                Ok(None)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::Identity(format!("lookup returned {}: {}", status, body)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn verifier(server: &MockServer) -> IdentityToolkitVerifier {
        IdentityToolkitVerifier::new(&IdentityConfig {
            project_id: "demo".to_string(),
            api_key: "web-key".to_string(),
            base_url: server.base_url(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_yields_local_id() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/accounts:lookup")
                    .query_param("key", "web-key")
                    .json_body(json!({"idToken": "good-token"}));
                then.status(200)
                    .json_body(json!({"kind": "identitytoolkit#GetAccountInfoResponse", "users": [{"localId": "u1", "email": "a@b.c"}]}));
            })
            .await;

        let subject = verifier(&server).verify("good-token").await.unwrap();

        mock.assert_async().await;
        assert_eq!(subject.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn rejected_token_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/accounts:lookup");
                then.status(400)
                    .json_body(json!({"error": {"code": 400, "message": "INVALID_ID_TOKEN"}}));
            })
            .await;

        assert_eq!(verifier(&server).verify("bad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn provider_fault_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/accounts:lookup");
                then.status(503).body("unavailable");
            })
            .await;

        assert!(matches!(
            verifier(&server).verify("any").await,
            Err(AppError::Identity(_))
        ));
    }
}
