use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};

use crate::domain::RecipientEmail;

/// One transactional message addressed to a single recipient.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub recipient: RecipientEmail,
    pub subject: String,
    pub html_body: String,
    pub template_id: Option<u32>,
}

impl NotificationRequest {
    pub fn new(
        recipient: RecipientEmail,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            recipient,
            subject: subject.into(),
            html_body: html_body.into(),
            template_id: None,
        }
    }

    pub fn with_template(mut self, template_id: u32) -> Self {
        self.template_id = Some(template_id);
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("failed to reach the mail service")]
    Transport(#[source] reqwest::Error),

    #[error("the mail service answered {status}: {detail}")]
    Rejected { status: StatusCode, detail: String },
}

/// Client for a Listmonk style transactional mail API (`POST /api/tx`).
#[derive(Clone)]
pub struct MailClient {
    http_client: Client,
    base_url: String,
    username: String,
    password: Secret<String>,
}

#[derive(serde::Serialize)]
struct TransactionalMessage<'a> {
    subscriber_email: &'a str,
    subject: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_id: Option<u32>,
    content_type: &'a str,
}

impl MailClient {
    pub fn new(
        base_url: String,
        username: String,
        password: Secret<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
        })
    }

    /// Sends one message. Every failure comes back as a `MailError`; the
    /// response body of a rejected call is kept as the error detail.
    #[tracing::instrument(
        name = "send transactional email",
        skip(self, request),
        fields(recipient = %request.recipient, subject = %request.subject)
    )]
    pub async fn send(&self, request: NotificationRequest) -> Result<(), MailError> {
        let url = format!("{}/api/tx", self.base_url);
        let message = TransactionalMessage {
            subscriber_email: request.recipient.as_ref(),
            subject: &request.subject,
            body: &request.html_body,
            template_id: request.template_id,
            content_type: "html",
        };

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .json(&message)
            .send()
            .await
            .map_err(MailError::Transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.map_err(MailError::Transport)?;
        let detail = if detail.trim().is_empty() {
            "Failed to send transactional email".to_string()
        } else {
            detail
        };

        Err(MailError::Rejected { status, detail })
    }
}
