use async_trait::async_trait;
use reqwest::Client;

use super::slack_message::{build_message, MessageFormat};
use crate::core::notifications::{validate_webhook_url, ChatWebhook, NotifyError, TodoNotification};

/// Posts todo notifications to a Slack incoming webhook.
///
/// The URL is validated on every call rather than at startup so that a missing
/// webhook only breaks the notify endpoint, not the whole service.
pub struct SlackWebhookClient {
    client: Client,
    webhook_url: Option<String>,
    format: MessageFormat,
}

impl SlackWebhookClient {
    pub fn new(webhook_url: Option<String>, format: MessageFormat) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
            format,
        }
    }
}

#[async_trait]
impl ChatWebhook for SlackWebhookClient {
    fn ensure_configured(&self) -> Result<(), NotifyError> {
        validate_webhook_url(self.webhook_url.as_deref()).map(|_| ())
    }

    async fn deliver(&self, notification: &TodoNotification) -> Result<(), NotifyError> {
        let url = validate_webhook_url(self.webhook_url.as_deref())?;
        let message = build_message(notification, self.format);

        let resp = self
            .client
            .post(url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        // Slack explains rejections in a plain-text body ("invalid_payload", "no_service", ...).
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        tracing::error!(status = status.as_u16(), %body, "Slack webhook rejected message");

        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
