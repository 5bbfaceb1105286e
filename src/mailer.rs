use async_trait::async_trait;
use serde::Serialize;

use crate::config::ServiceEndpoint;
use crate::errors::UpstreamError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), UpstreamError>;
}

/// Transactional email API over HTTP (`POST {url}/emails`).
pub struct HttpMailer {
    endpoint: ServiceEndpoint,
    from: String,
    client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(endpoint: ServiceEndpoint, from: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint,
            from: from.into(),
            client,
        }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), UpstreamError> {
        let body = SendRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };
        let resp = self
            .client
            .post(format!("{}/emails", self.endpoint.url))
            .bearer_auth(&self.endpoint.key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::new("email", e))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(UpstreamError::new("email", format!("status {status}")))
        }
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), UpstreamError> {
        log::info!("Email to {} ({}):\n{}", message.to, message.subject, message.text);
        Ok(())
    }
}
