// Summarization business logic.
// Like the rest of core/, this knows nothing about Gemini or HTTP. It builds a
// prompt, hands it to whatever SummaryProvider it was given, and decides what
// to do when the provider comes back without usable text.

use super::prompts::{build_prompt, PromptStyle};
use crate::core::todos::{SummaryResult, TodoInput};
use async_trait::async_trait;
use thiserror::Error;

/// Returned by `/summarize-single-todo` when the provider answered but gave no text.
pub const FALLBACK_SUMMARY: &str = "Could not generate a meaningful summary for this task.";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("{0}")]
    NotConfigured(String),

    /// The provider answered with a non-2xx status.
    #[error("Summarization provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Failed to reach summarization provider: {0}")]
    Transport(String),

    #[error("Unexpected response from summarization provider: {0}")]
    UnexpectedShape(String),

    /// Well-formed response without any candidate text (e.g. safety-blocked).
    #[error("Summarization provider returned no candidate text")]
    EmptyCandidate,
}

// ============================================================================
// PROVIDER TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Sends one prompt and returns the first generated text candidate.
    ///
    /// Implementations make exactly one outbound call and never retry.
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError>;
}

// Lets the service hold a trait object chosen at startup.
#[async_trait]
impl SummaryProvider for Box<dyn SummaryProvider> {
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
        (**self).generate(prompt).await
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct SummarizationService<P: SummaryProvider> {
    provider: P,
}

impl<P: SummaryProvider> SummarizationService<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Summarizes a todo for direct display to the caller.
    ///
    /// An empty candidate is a soft failure and yields [`FALLBACK_SUMMARY`];
    /// every other provider failure is returned as an error.
    pub async fn summarize(&self, todo: &TodoInput) -> Result<SummaryResult, SummaryError> {
        let prompt = build_prompt(todo, PromptStyle::Detailed);

        match self.provider.generate(&prompt).await {
            Ok(summary) => {
                tracing::info!(
                    user_id = %todo.user_id,
                    chars = summary.len(),
                    "Generated todo summary"
                );
                Ok(SummaryResult { summary })
            }
            Err(SummaryError::EmptyCandidate) => {
                tracing::warn!(
                    user_id = %todo.user_id,
                    "Provider returned no summary text, using fallback"
                );
                Ok(SummaryResult {
                    summary: FALLBACK_SUMMARY.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Summarizes a todo for a chat message. Never fails: any provider error is
    /// replaced with a fallback line that still names the task.
    pub async fn summarize_for_chat(&self, todo: &TodoInput) -> SummaryResult {
        let prompt = build_prompt(todo, PromptStyle::ChatMessage);

        let summary = match self.provider.generate(&prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    user_id = %todo.user_id,
                    error = %e,
                    "Inline summary failed, notification will use fallback text"
                );
                chat_fallback_summary(&todo.text)
            }
        };

        SummaryResult { summary }
    }
}

/// Fallback summary used in chat messages when generation fails.
pub fn chat_fallback_summary(text: &str) -> String {
    format!("Could not generate a summary for \"{}\".", text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider that replays a canned outcome and records every prompt.
    struct ScriptedProvider {
        outcome: fn() -> Result<String, SummaryError>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(outcome: fn() -> Result<String, SummaryError>) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SummaryProvider for ScriptedProvider {
        async fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.outcome)()
        }
    }

    fn todo() -> TodoInput {
        TodoInput::new("Buy milk", Some("2024-01-01".into()), None, "u-1")
    }

    #[tokio::test]
    async fn test_summarize_returns_provider_text() {
        let service = SummarizationService::new(ScriptedProvider::new(|| {
            Ok("Buy milk by Jan 1.".to_string())
        }));

        let result = service.summarize(&todo()).await.unwrap();

        assert_eq!(result.summary, "Buy milk by Jan 1.");
        assert_eq!(service.provider.calls.load(Ordering::SeqCst), 1);
        let prompts = service.provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("Due date: 2024-01-01"));
    }

    #[tokio::test]
    async fn test_summarize_empty_candidate_uses_fallback() {
        let service =
            SummarizationService::new(ScriptedProvider::new(|| Err(SummaryError::EmptyCandidate)));

        let result = service.summarize(&todo()).await.unwrap();

        assert_eq!(result.summary, FALLBACK_SUMMARY);
    }

    #[tokio::test]
    async fn test_summarize_propagates_provider_error() {
        let service = SummarizationService::new(ScriptedProvider::new(|| {
            Err(SummaryError::Provider {
                status: 429,
                message: "Resource exhausted".to_string(),
            })
        }));

        let err = service.summarize(&todo()).await.unwrap_err();

        assert!(matches!(err, SummaryError::Provider { status: 429, .. }));
        assert_eq!(service.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chat_summary_falls_back_with_task_text() {
        let service = SummarizationService::new(ScriptedProvider::new(|| {
            Err(SummaryError::Transport("connection refused".to_string()))
        }));

        let result = service.summarize_for_chat(&todo()).await;

        assert!(result.summary.contains("Buy milk"));
        let prompts = service.provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("for a Slack message"));
    }

    #[tokio::test]
    async fn test_chat_summary_empty_candidate_also_falls_back() {
        let service =
            SummarizationService::new(ScriptedProvider::new(|| Err(SummaryError::EmptyCandidate)));

        let result = service.summarize_for_chat(&todo()).await;

        assert_eq!(result.summary, chat_fallback_summary("Buy milk"));
    }
}
