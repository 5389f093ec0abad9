use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::errors::ApiError;
use super::state::AppState;
use crate::core::todos::{resolve_caller_id, TodoInput};
use crate::infra::firestore::CredentialSource;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Body accepted by both todo endpoints. Every field is optional on the wire;
/// the services decide what is actually required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub due_time: Option<String>,
    /// Only read by the notify endpoint.
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl TodoRequest {
    /// Splits the wire body into the todo itself and an optional caller-supplied summary.
    fn into_parts(self, headers: &HeaderMap) -> (TodoInput, Option<String>) {
        let header_user = headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok());
        let user_id = resolve_caller_id(header_user, self.user_id.as_deref());

        let todo = TodoInput::new(
            self.text.unwrap_or_default(),
            self.due_date,
            self.due_time,
            user_id,
        );
        (todo, self.summary)
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBody {
    pub status: &'static str,
    pub project_id: String,
    pub credential_source: CredentialSource,
}

/// `POST /summarize-single-todo`
pub async fn summarize_single_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TodoRequest>, JsonRejection>,
) -> Result<Json<SuccessBody>, ApiError> {
    let Json(request) = payload?;
    let (todo, _) = request.into_parts(&headers);

    tracing::info!(user_id = %todo.user_id, "Summarize request");
    let result = state.summarizer.summarize(&todo).await?;

    Ok(Json(SuccessBody {
        message: "Summary generated successfully.".to_string(),
        summary: Some(result.summary),
    }))
}

/// `POST /send-single-todo-to-slack`
pub async fn send_single_todo_to_slack(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TodoRequest>, JsonRejection>,
) -> Result<Json<SuccessBody>, ApiError> {
    let Json(request) = payload?;
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let (todo, summary) = request.into_parts(&headers);

    tracing::info!(user_id = %todo.user_id, "Slack notification request");
    state.notifier.notify(todo, summary, user_agent).await?;

    Ok(Json(SuccessBody {
        message: "Todo sent to Slack successfully!".to_string(),
        summary: None,
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        project_id: state.identity.project_id().to_string(),
        credential_source: state.identity.source,
    })
}
