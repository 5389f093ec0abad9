//! Slack incoming-webhook payloads for todo notifications.
//!
//! Two layouts are supported: a flat `text` message, and a Block Kit layout
//! (header, two-column task/summary section, context line). Block Kit messages
//! still carry a top-level `text`, which Slack uses for notifications and
//! clients that cannot render blocks.
//!
//! Every caller-supplied value is escaped before it lands in mrkdwn, so a todo
//! reading `<!channel>` shows up as text instead of pinging anyone.

use crate::core::notifications::TodoNotification;
use crate::core::todos::{display_due_date, display_due_time};
use serde::Serialize;
use std::str::FromStr;

/// Slack rejects section field text longer than this.
const MAX_FIELD_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    #[default]
    Blocks,
    Text,
}

impl FromStr for MessageFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "blocks" | "block" => Ok(MessageFormat::Blocks),
            "text" | "plain" => Ok(MessageFormat::Text),
            other => Err(format!(
                "Unknown Slack message format '{}', expected 'blocks' or 'text'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlackMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        fields: Vec<TextObject>,
    },
    Context {
        elements: Vec<TextObject>,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: TextKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    PlainText,
    Mrkdwn,
}

impl TextObject {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::PlainText,
            text: text.into(),
            emoji: Some(true),
        }
    }

    fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::Mrkdwn,
            text: text.into(),
            emoji: None,
        }
    }
}

pub fn build_message(notification: &TodoNotification, format: MessageFormat) -> SlackMessage {
    match format {
        MessageFormat::Text => SlackMessage {
            text: flat_text(notification),
            blocks: None,
        },
        MessageFormat::Blocks => SlackMessage {
            text: truncate(&format!("New to-do: {}", escape(&notification.text))),
            blocks: Some(blocks(notification)),
        },
    }
}

fn flat_text(notification: &TodoNotification) -> String {
    let mut lines = vec![
        "*New To-Do Item*".to_string(),
        format!("*Task:* {}", escape(&notification.text)),
    ];
    if let Some(date) = &notification.due_date {
        lines.push(format!("*Due Date:* {}", escape(&display_due_date(date))));
    }
    if let Some(time) = &notification.due_time {
        lines.push(format!("*Due Time:* {}", escape(&display_due_time(time))));
    }
    lines.push(format!("*Summary:*\n{}", escape(&notification.summary)));
    lines.join("\n")
}

fn blocks(notification: &TodoNotification) -> Vec<Block> {
    let due = notification
        .due_description()
        .unwrap_or_else(|| "No due date".to_string());
    let client = notification
        .user_agent
        .as_deref()
        .unwrap_or("unknown client");

    vec![
        Block::Header {
            text: TextObject::plain("📝 New To-Do Item"),
        },
        Block::Section {
            fields: vec![
                TextObject::mrkdwn(truncate(&format!(
                    "*Task:*\n{}",
                    escape(&notification.text)
                ))),
                TextObject::mrkdwn(truncate(&format!(
                    "*Summary:*\n{}",
                    escape(&notification.summary)
                ))),
            ],
        },
        Block::Context {
            elements: vec![TextObject::mrkdwn(truncate(&format!(
                "🗓️ {} | Sent by {} via {}",
                escape(&due),
                escape(&notification.user_id),
                escape(client)
            )))],
        },
    ]
}

/// Slack's control characters in mrkdwn. Everything else is passed through.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_FIELD_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_FIELD_CHARS - 3).collect();
    cut.push_str("...");
    cut
}
