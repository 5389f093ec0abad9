pub mod prompts;
pub mod summarization_service;

pub use prompts::{build_prompt, PromptStyle};
pub use summarization_service::{
    chat_fallback_summary, SummarizationService, SummaryError, SummaryProvider, FALLBACK_SUMMARY,
};
