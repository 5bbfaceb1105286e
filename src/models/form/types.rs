use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::field::Field;

fn default_submit_button_text() -> String {
    "Submit".to_string()
}

fn default_success_message() -> String {
    "Thank you for your message!".to_string()
}

fn default_true() -> bool {
    true
}

/// Per-form behavior and presentation settings.
///
/// Unknown keys are rejected so that a misspelled key fails loudly instead of
/// being ignored. Presentation values are kept as the strings the builder sends
/// (`"6"`, `"#d1d5db"`) and only interpreted by `compute_theme_tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormSettings {
    #[serde(default = "default_submit_button_text")]
    pub submit_button_text: String,
    #[serde(default = "default_success_message")]
    pub success_message: String,
    /// Comma-separated recipient list.
    #[serde(default)]
    pub notification_emails: String,
    #[serde(default = "default_true")]
    pub allow_file_upload: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_border_radius: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_border_width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_border_radius: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_border_width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_height: Option<String>,
}

impl Default for FormSettings {
    fn default() -> Self {
        FormSettings {
            submit_button_text: default_submit_button_text(),
            success_message: default_success_message(),
            notification_emails: String::new(),
            allow_file_upload: true,
            primary_color: None,
            input_border_radius: None,
            input_border_color: None,
            input_border_width: None,
            input_height: None,
            button_border_radius: None,
            button_border_color: None,
            button_border_width: None,
            button_height: None,
        }
    }
}

impl FormSettings {
    /// Parse the settings bag from a request body. `null` means defaults.
    pub fn from_json(value: serde_json::Value) -> Result<Self, String> {
        if value.is_null() {
            return Ok(FormSettings::default());
        }
        serde_json::from_value(value).map_err(|e| format!("Invalid settings: {e}"))
    }

    /// Recipients from `notificationEmails`: split on commas, trimmed, blanks dropped.
    pub fn notification_recipients(&self) -> Vec<String> {
        self.notification_emails
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Full form row, as seen by its owner.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Form {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub fields: Json<Vec<Field>>,
    pub settings: Json<FormSettings>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the embed sees. Never carries the owner id or activation state.
#[derive(Debug, Clone, Serialize)]
pub struct PublicForm {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub settings: FormSettings,
}

impl From<Form> for PublicForm {
    fn from(f: Form) -> Self {
        PublicForm {
            id: f.id,
            name: f.name,
            description: f.description,
            fields: f.fields.0,
            settings: f.settings.0,
        }
    }
}

/// Dashboard list entry.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FormSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub form: Form,
    pub submission_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FormStats {
    pub total_submissions: i64,
    pub recent_submissions: i64,
}

/// Input for creating a form.
#[derive(Debug, Clone)]
pub struct NewForm {
    pub name: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub settings: FormSettings,
}

/// Partial update; `None` leaves the column as it is. Fields are replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct FormPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub fields: Option<Vec<Field>>,
    pub settings: Option<FormSettings>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_defaults_apply() {
        let s = FormSettings::from_json(json!({})).unwrap();
        assert_eq!(s, FormSettings::default());
        assert_eq!(s.submit_button_text, "Submit");
        assert!(s.allow_file_upload);
        assert_eq!(FormSettings::from_json(serde_json::Value::Null).unwrap(), s);
    }

    #[test]
    fn settings_accept_builder_keys() {
        let s = FormSettings::from_json(json!({
            "submitButtonText": "Send",
            "successMessage": "Thanks",
            "allowFileUpload": false,
            "notificationEmails": "",
            "primaryColor": "#601033",
            "inputBorderRadius": "6",
            "inputBorderColor": "#d1d5db",
            "inputHeight": "40",
            "inputBorderWidth": "1",
            "buttonBorderRadius": "6",
            "buttonBorderColor": "#601033",
            "buttonHeight": "44",
            "buttonBorderWidth": "0"
        }))
        .unwrap();
        assert_eq!(s.submit_button_text, "Send");
        assert!(!s.allow_file_upload);
        assert_eq!(s.button_height.as_deref(), Some("44"));
    }

    #[test]
    fn settings_reject_misspelled_keys() {
        let err = FormSettings::from_json(json!({"notificationEmail": "a@x.com"})).unwrap_err();
        assert!(err.contains("notificationEmail"));
    }

    #[test]
    fn recipients_skip_blank_entries() {
        let s = FormSettings {
            notification_emails: "a@x.com, , b@x.com,".to_string(),
            ..FormSettings::default()
        };
        assert_eq!(s.notification_recipients(), vec!["a@x.com", "b@x.com"]);
        assert!(FormSettings::default().notification_recipients().is_empty());
    }
}
