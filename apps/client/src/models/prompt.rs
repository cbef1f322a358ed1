use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved, filled-in instance of one template version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub template_id: String,
    pub version_id: i64,
    pub owner_id: String,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePromptRequest {
    pub template_id: String,
    pub version_id: i64,
    pub owner_id: String,
    pub variables: Vec<String>,
}
