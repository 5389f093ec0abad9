// Chat notification business logic.
//
// **Order of checks matters:**
// 1. Missing todo text is a client error and must not touch the network.
// 2. An unconfigured webhook is a server error and must not touch the network
//    either, so it is checked before any inline summary is generated.
// 3. Only then may the LLM (optional) and the webhook (exactly once) be called.

use super::notification_models::TodoNotification;
use crate::core::summarization::{SummarizationService, SummaryProvider};
use crate::core::todos::{non_blank, TodoInput};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Value shipped in sample `.env` files; treated the same as an unset URL.
pub const WEBHOOK_URL_PLACEHOLDER: &str = "YOUR_SLACK_WEBHOOK_URL_HERE";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Todo text is required.")]
    MissingText,

    #[error("Slack webhook URL is not configured.")]
    NotConfigured,

    /// The webhook answered with a non-2xx status. `body` is kept for diagnostics.
    #[error("Failed to send message to Slack ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to reach Slack webhook: {0}")]
    Transport(String),
}

// ============================================================================
// WEBHOOK TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait ChatWebhook: Send + Sync {
    /// Fails with [`NotifyError::NotConfigured`] when there is nowhere to post.
    fn ensure_configured(&self) -> Result<(), NotifyError>;

    /// Posts one notification. Exactly one outbound call, no retries.
    async fn deliver(&self, notification: &TodoNotification) -> Result<(), NotifyError>;
}

#[async_trait]
impl ChatWebhook for Box<dyn ChatWebhook> {
    fn ensure_configured(&self) -> Result<(), NotifyError> {
        (**self).ensure_configured()
    }

    async fn deliver(&self, notification: &TodoNotification) -> Result<(), NotifyError> {
        (**self).deliver(notification).await
    }
}

/// Returns the usable webhook URL, or `NotConfigured` for blank/placeholder values.
pub fn validate_webhook_url(url: Option<&str>) -> Result<&str, NotifyError> {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() && url != WEBHOOK_URL_PLACEHOLDER => Ok(url),
        _ => Err(NotifyError::NotConfigured),
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct NotificationService<W: ChatWebhook, P: SummaryProvider> {
    webhook: W,
    summarizer: Arc<SummarizationService<P>>,
}

impl<W: ChatWebhook, P: SummaryProvider> NotificationService<W, P> {
    pub fn new(webhook: W, summarizer: Arc<SummarizationService<P>>) -> Self {
        Self {
            webhook,
            summarizer,
        }
    }

    /// Sends one todo to the chat webhook, generating a summary first if the
    /// caller did not provide one.
    pub async fn notify(
        &self,
        todo: TodoInput,
        summary: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(), NotifyError> {
        if !todo.has_text() {
            return Err(NotifyError::MissingText);
        }

        self.webhook.ensure_configured()?;

        let summary = match non_blank(summary) {
            Some(summary) => summary,
            None => self.summarizer.summarize_for_chat(&todo).await.summary,
        };

        let notification = TodoNotification::new(todo, summary, user_agent);
        self.webhook.deliver(&notification).await?;

        tracing::info!(
            user_id = %notification.user_id,
            "Todo notification delivered"
        );
        Ok(())
    }
}
