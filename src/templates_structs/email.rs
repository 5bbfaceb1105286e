use askama::Template;

/// One answered field in a notification, in form field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRow {
    pub label: String,
    pub value: String,
}

#[derive(Template)]
#[template(path = "emails/submission_notification.html")]
pub struct NotificationHtmlTemplate<'a> {
    pub form_name: &'a str,
    pub submission_id: String,
    pub submitted_at: String,
    pub rows: &'a [AnswerRow],
    pub files: &'a [String],
    pub link: Option<String>,
}

#[derive(Template)]
#[template(path = "emails/submission_notification.txt")]
pub struct NotificationTextTemplate<'a> {
    pub form_name: &'a str,
    pub submission_id: String,
    pub submitted_at: String,
    pub rows: &'a [AnswerRow],
    pub files: &'a [String],
    pub link: Option<String>,
}
