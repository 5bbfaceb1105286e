use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Metadata for one stored upload. `path` is the blob store key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub path: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(rename = "fieldName")]
    pub field_name: String,
}

/// One completed fill of a form. Immutable once written.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Submission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub data: Json<BTreeMap<String, String>>,
    pub files: Json<Vec<FileRecord>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn file_named(&self, name: &str) -> Option<&FileRecord> {
        self.files.0.iter().find(|f| f.name == name)
    }
}

/// Input for inserting a submission.
#[derive(Debug, Clone, Default)]
pub struct NewSubmission {
    pub form_id: Uuid,
    pub data: BTreeMap<String, String>,
    pub files: Vec<FileRecord>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
