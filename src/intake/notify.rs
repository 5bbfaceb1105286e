use std::sync::Arc;
use std::time::Duration;

use askama::Template;

use crate::errors::AppError;
use crate::mailer::{EmailMessage, Mailer};
use crate::models::form::Form;
use crate::models::submission::Submission;
use crate::templates_structs::{AnswerRow, NotificationHtmlTemplate, NotificationTextTemplate};

/// Rendered notification, shared by every recipient.
#[derive(Debug, Clone)]
pub struct Notification {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// What happened to one dispatch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    /// Recipients whose send failed.
    pub failed: Vec<String>,
}

/// Answer rows in form field order. Unanswered fields are skipped.
fn answer_rows(form: &Form, submission: &Submission) -> Vec<AnswerRow> {
    form.fields
        .iter()
        .filter(|f| !f.is_file())
        .filter_map(|f| {
            submission.data.get(&f.name).map(|value| AnswerRow {
                label: f.label.clone(),
                value: value.clone(),
            })
        })
        .collect()
}

pub fn compose(form: &Form, submission: &Submission, dashboard_url: Option<&str>) -> Result<Notification, AppError> {
    let rows = answer_rows(form, submission);
    let files: Vec<String> = submission.files.iter().map(|f| f.name.clone()).collect();
    let submitted_at = submission.created_at.format("%Y-%m-%d %H:%M UTC").to_string();
    let link = dashboard_url.map(|base| format!("{}/forms/{}/submissions", base.trim_end_matches('/'), form.id));

    let html = NotificationHtmlTemplate {
        form_name: &form.name,
        submission_id: submission.id.to_string(),
        submitted_at: submitted_at.clone(),
        rows: &rows,
        files: &files,
        link: link.clone(),
    }
    .render()?;
    let text = NotificationTextTemplate {
        form_name: &form.name,
        submission_id: submission.id.to_string(),
        submitted_at,
        rows: &rows,
        files: &files,
        link,
    }
    .render()?;

    Ok(Notification {
        subject: format!("New submission: {}", form.name),
        html,
        text,
    })
}

/// Send the notification to every configured recipient.
///
/// One send per recipient. A failed send is logged and does not affect the
/// others. Nothing is sent when the form has no recipients.
pub async fn dispatch(
    mailer: &dyn Mailer,
    form: &Form,
    submission: &Submission,
    dashboard_url: Option<&str>,
) -> DispatchReport {
    let recipients = form.settings.notification_recipients();
    if recipients.is_empty() {
        return DispatchReport::default();
    }

    let notification = match compose(form, submission, dashboard_url) {
        Ok(n) => n,
        Err(e) => {
            log::error!("Error rendering notification for form {}: {}", form.id, e);
            return DispatchReport {
                attempted: 0,
                delivered: 0,
                failed: recipients,
            };
        }
    };

    let mut report = DispatchReport::default();
    for to in recipients {
        report.attempted += 1;
        let message = EmailMessage {
            to: to.clone(),
            subject: notification.subject.clone(),
            html: notification.html.clone(),
            text: notification.text.clone(),
        };
        match mailer.send(&message).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                log::error!("Error sending notification for submission {} to {}: {}", submission.id, to, e);
                report.failed.push(to);
            }
        }
    }

    log::info!(
        "Notification for submission {}: {}/{} delivered",
        submission.id,
        report.delivered,
        report.attempted
    );
    report
}

/// Upper bound for one background dispatch, whatever the mailer does.
const DISPATCH_DEADLINE: Duration = Duration::from_secs(120);

/// Run `dispatch` in the background. The caller's response never waits on it.
pub fn spawn_dispatch(mailer: Arc<dyn Mailer>, form: Form, submission: Submission, dashboard_url: Option<String>) {
    if form.settings.notification_recipients().is_empty() {
        return;
    }
    actix_web::rt::spawn(async move {
        let run = dispatch(mailer.as_ref(), &form, &submission, dashboard_url.as_deref());
        if tokio::time::timeout(DISPATCH_DEADLINE, run).await.is_err() {
            log::error!("Notification dispatch for submission {} timed out", submission.id);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UpstreamError;
    use crate::models::field::{Field, FieldType};
    use crate::models::form::FormSettings;
    use crate::models::submission::FileRecord;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use sqlx::types::Json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Records every attempt; fails for addresses listed in `failing`.
    #[derive(Default)]
    struct RecordingMailer {
        failing: Vec<String>,
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), UpstreamError> {
            self.sent.lock().unwrap().push(message.clone());
            if self.failing.contains(&message.to) {
                return Err(UpstreamError::new("email", "status 500 Internal Server Error"));
            }
            Ok(())
        }
    }

    fn field(name: &str, label: &str, field_type: FieldType) -> Field {
        Field {
            id: name.into(),
            name: name.into(),
            label: label.into(),
            field_type,
            placeholder: None,
            required: false,
            options: None,
        }
    }

    fn form(emails: &str) -> Form {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        Form {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Contact <Us>".into(),
            description: String::new(),
            fields: Json(vec![
                field("message", "Message", FieldType::Textarea),
                field("email", "Email", FieldType::Email),
                field("cv", "CV", FieldType::File),
                field("phone", "Phone", FieldType::Tel),
            ]),
            settings: Json(FormSettings {
                notification_emails: emails.into(),
                ..FormSettings::default()
            }),
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    fn submission(form: &Form) -> Submission {
        let mut data = BTreeMap::new();
        data.insert("email".to_string(), "ada@example.com".to_string());
        data.insert("message".to_string(), "Hello".to_string());
        Submission {
            id: Uuid::new_v4(),
            form_id: form.id,
            data: Json(data),
            files: Json(vec![FileRecord {
                name: "cv.pdf".into(),
                path: "k-cv.pdf".into(),
                size: 10,
                content_type: "application/pdf".into(),
                field_name: "cv".into(),
            }]),
            ip_address: None,
            user_agent: None,
            created_at: form.created_at,
        }
    }

    #[test]
    fn compose_lists_answers_in_field_order() {
        let form = form("");
        let sub = submission(&form);
        let n = compose(&form, &sub, Some("https://app.example.com/")).unwrap();

        assert_eq!(n.subject, "New submission: Contact <Us>");
        let message = n.text.find("Message: Hello").unwrap();
        let email = n.text.find("Email: ada@example.com").unwrap();
        assert!(message < email);
        assert!(!n.text.contains("Phone"));
        assert!(n.text.contains("- cv.pdf"));
        assert!(n.text.contains(&format!("https://app.example.com/forms/{}/submissions", form.id)));
        assert!(n.html.contains("Contact &#60;Us&#62;") || n.html.contains("Contact &lt;Us&gt;"));
    }

    #[test]
    fn compose_without_dashboard_has_no_link() {
        let form = form("");
        let n = compose(&form, &submission(&form), None).unwrap();
        assert!(!n.text.contains("View submissions"));
        assert!(!n.html.contains("View submissions"));
    }

    #[actix_rt::test]
    async fn one_failed_recipient_does_not_block_others() {
        let mailer = RecordingMailer {
            failing: vec!["a@x.com".into()],
            ..RecordingMailer::default()
        };
        let form = form("a@x.com, , b@x.com");
        let report = dispatch(&mailer, &form, &submission(&form), None).await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec!["a@x.com".to_string()]);
        let sent: Vec<String> = mailer.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect();
        assert_eq!(sent, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
    }

    #[actix_rt::test]
    async fn no_recipients_means_no_sends() {
        let mailer = RecordingMailer::default();
        let form = form(" , ");
        let report = dispatch(&mailer, &form, &submission(&form), None).await;
        assert_eq!(report, DispatchReport::default());
        assert!(mailer.sent.lock().unwrap().is_empty());
    }
}
