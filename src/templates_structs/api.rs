use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::models::form::{Form, FormStats, FormSummary, PublicForm, ThemeTokens};
use crate::models::submission::Submission;

/// API error response.
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Plain acknowledgement, e.g. `{"message": "Form deleted successfully"}`.
#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse { message: message.into() }
    }
}

#[derive(Serialize, Debug)]
pub struct FormListResponse {
    pub forms: Vec<FormSummary>,
}

#[derive(Serialize, Debug)]
pub struct FormResponse {
    pub form: Form,
}

/// Body of the public form read; cached as a whole.
#[derive(Serialize, Debug, Clone)]
pub struct PublicFormResponse {
    pub form: PublicForm,
    pub theme: ThemeTokens,
}

#[derive(Serialize, Debug)]
pub struct FormStatsResponse {
    pub stats: FormStats,
}

#[derive(Serialize, Debug)]
pub struct SubmissionListResponse {
    pub submissions: Vec<Submission>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub submission_id: Uuid,
}

#[derive(Serialize, Debug)]
pub struct MeResponse {
    pub user: Principal,
}

/// Create/update form request. Every key is optional at the wire level so that
/// missing `name`/`fields` can be reported as a 400 rather than a parse failure,
/// and so that updates only overwrite what was sent.
#[derive(Deserialize, Debug, Default)]
pub struct FormRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub fields: Option<serde_json::Value>,
    pub settings: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
pub struct FormReadQuery {
    pub manage: Option<String>,
}

impl FormReadQuery {
    pub fn is_manage(&self) -> bool {
        self.manage.as_deref() == Some("true")
    }
}
