use crate::core::todos::{describe_due, TodoInput};

/// Everything a chat adapter needs to announce one todo.
///
/// The core fills this in; the adapter decides how it looks on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoNotification {
    pub text: String,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub summary: String,
    pub user_id: String,
    pub user_agent: Option<String>,
}

impl TodoNotification {
    pub fn new(todo: TodoInput, summary: String, user_agent: Option<String>) -> Self {
        Self {
            text: todo.text.trim().to_string(),
            due_date: todo.due_date,
            due_time: todo.due_time,
            summary,
            user_id: todo.user_id,
            user_agent: user_agent.filter(|ua| !ua.trim().is_empty()),
        }
    }

    /// Human-readable due line, e.g. "Due Jan 1, 2024 at 9:00 AM".
    pub fn due_description(&self) -> Option<String> {
        describe_due(self.due_date.as_deref(), self.due_time.as_deref())
    }
}
