// Request-scoped todo data shared by summarization and notifications.
// Nothing here is persisted: a TodoInput lives exactly as long as the
// HTTP request that produced it.

use chrono::{NaiveDate, NaiveTime};

/// Caller id used when neither the `x-user-id` header nor the body names one.
pub const ANONYMOUS_USER: &str = "anonymous";

/// A single todo item as received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoInput {
    pub text: String,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub user_id: String,
}

impl TodoInput {
    /// Builds an input, dropping blank optional fields so they never reach a prompt.
    pub fn new(
        text: impl Into<String>,
        due_date: Option<String>,
        due_time: Option<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            due_date: non_blank(due_date),
            due_time: non_blank(due_time),
            user_id: user_id.into(),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Summary text produced for one todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub summary: String,
}

/// Picks the caller identity: header first, then the body's `userId`, then "anonymous".
pub fn resolve_caller_id(header: Option<&str>, body: Option<&str>) -> String {
    header
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| body.map(str::trim).filter(|v| !v.is_empty()))
        .unwrap_or(ANONYMOUS_USER)
        .to_string()
}

/// Treats `Some("")` and `Some("   ")` the same as `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Renders `2024-01-01` as `Jan 1, 2024`. Anything else is shown as given.
pub fn display_due_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Renders `09:05` (or `09:05:00`) as `9:05 AM`. Anything else is shown as given.
pub fn display_due_time(raw: &str) -> String {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map(|time| time.format("%-I:%M %p").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// One-line description of when a todo is due, if it has any due info at all.
pub fn describe_due(due_date: Option<&str>, due_time: Option<&str>) -> Option<String> {
    match (due_date, due_time) {
        (Some(date), Some(time)) => Some(format!(
            "Due {} at {}",
            display_due_date(date),
            display_due_time(time)
        )),
        (Some(date), None) => Some(format!("Due {}", display_due_date(date))),
        (None, Some(time)) => Some(format!("Due at {}", display_due_time(time))),
        (None, None) => None,
    }
}
