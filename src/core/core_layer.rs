// The core module contains all business logic.
// Each feature gets its own submodule. Nothing in here knows about axum,
// Gemini or Slack; those live in http/ and infra/.

#[path = "todos/todo_models.rs"]
pub mod todos;

#[path = "summarization/mod.rs"]
pub mod summarization;

#[path = "notifications/mod.rs"]
pub mod notifications;
