// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// This module provides an implementation of the `SummaryProvider` trait that
// communicates with Google's Gemini API (https://ai.google.dev/gemini-api/docs).
//
// **Wire format:**
// - Authentication: API key is passed as a query parameter (`?key=API_KEY`).
// - Request: a single user turn in `contents[]` with one text `part`.
// - Response: generated text is at `candidates[0].content.parts[*].text`.
//
// One prompt in, one call out. No streaming, no retries, and no timeout
// beyond reqwest's default.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - Your API key from https://aistudio.google.com/apikey
// - `GEMINI_MODEL` - Model id, e.g. `gemini-1.5-flash`
// - `GEMINI_API_BASE` - Override the API host (used by tests)

use crate::core::summarization::{SummaryError, SummaryProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================
//
// See: https://ai.google.dev/api/generate-content

/// A single part of content. Gemini uses a "parts" array to support
/// multimodal content; we only ever send and read text.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Set by thinking models on reasoning parts; those never reach the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

/// One turn of the conversation.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    /// Role: "user" or "model".
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

/// Generation configuration options that control the model's output.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// The request body sent to the Gemini generateContent endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// A candidate response from the model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    /// Missing when the candidate was blocked by safety filters.
    #[serde(default)]
    content: Option<Content>,

    #[allow(dead_code)]
    finish_reason: Option<String>,
}

/// The response from the Gemini generateContent endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

/// Error response from the Gemini API.
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[allow(dead_code)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// `None` means every call fails with `SummaryError::NotConfigured`.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            temperature: Some(0.7),
            max_output_tokens: None,
        }
    }
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

/// Client for Google's Gemini `generateContent` endpoint.
///
/// # Example
/// ```ignore
/// let client = GeminiClient::new(GeminiConfig {
///     api_key: Some(std::env::var("GEMINI_API_KEY")?),
///     ..Default::default()
/// });
/// let text = client.generate("Summarize: buy milk").await?;
/// ```
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.api_base.trim_end_matches('/'),
            self.config.model,
            api_key
        )
    }

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                    thought: None,
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            }),
        }
    }

    /// Pulls the first candidate's text out of a decoded response.
    ///
    /// An answer may be split across several parts; they are concatenated in
    /// order, skipping any part flagged as a thought.
    fn first_candidate_text(response: &GenerateContentResponse) -> Option<String> {
        let content = response
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|candidate| candidate.content.as_ref())?;

        let text: String = content
            .parts
            .iter()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect();

        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Turns a non-2xx body into a readable message, preferring Gemini's own envelope.
    fn error_message(body: &str) -> String {
        match serde_json::from_str::<GeminiErrorResponse>(body) {
            Ok(parsed) => parsed.error.message,
            Err(_) if body.trim().is_empty() => "empty error response".to_string(),
            Err(_) => body.to_string(),
        }
    }
}

#[async_trait]
impl SummaryProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SummaryError::NotConfigured("Gemini API key is not configured.".into()))?;

        // Never log the URL itself: it carries the API key.
        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Sending Gemini generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint(api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| SummaryError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SummaryError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            let message = Self::error_message(&body);
            tracing::error!(status = status.as_u16(), %message, "Gemini API error");
            return Err(SummaryError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let decoded: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| SummaryError::UnexpectedShape(e.to_string()))?;

        let text = Self::first_candidate_text(&decoded).ok_or(SummaryError::EmptyCandidate)?;

        tracing::debug!(chars = text.len(), "Gemini response received");
        Ok(text)
    }
}

// =============================================================================
// TESTS
// =============================================================================
