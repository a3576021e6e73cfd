use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user tag preferences, keyed by the identity provider's user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `PUT /api/user/tags`, also echoed back on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagsUpdate {
    pub tags: Vec<String>,
}
