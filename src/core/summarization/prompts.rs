//! Prompt text sent to the LLM provider.
//!
//! Both prompts embed the todo text and whatever due information the client
//! sent. Fields the client left out are omitted rather than rendered empty.

use crate::core::todos::TodoInput;

/// Which audience the summary is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// Returned straight to the client from `/summarize-single-todo`.
    Detailed,
    /// Embedded in a chat message when the client did not supply a summary.
    ChatMessage,
}

const DETAILED_INSTRUCTIONS: &str = "\
Write a summary of between 100 and 299 words. \
Use bullet points. \
Keep it action-oriented: start each bullet with a verb and focus on concrete next steps.";

const CHAT_INSTRUCTIONS: &str = "\
Keep it between 100 and 299 words, formatted as short bullet points \
that are action-oriented and easy to scan in a chat channel. \
Do not add a title or greeting.";

/// Builds the full instruction string for one todo.
pub fn build_prompt(todo: &TodoInput, style: PromptStyle) -> String {
    let lead = match style {
        PromptStyle::Detailed => "Summarize the following to-do item.",
        PromptStyle::ChatMessage => "Summarize the following single to-do item for a Slack message.",
    };

    let mut prompt = format!("{}\n\nTask: {}", lead, todo.text.trim());

    if let Some(date) = &todo.due_date {
        prompt.push_str(&format!("\nDue date: {}", date));
    }
    if let Some(time) = &todo.due_time {
        prompt.push_str(&format!("\nDue time: {}", time));
    }

    let instructions = match style {
        PromptStyle::Detailed => DETAILED_INSTRUCTIONS,
        PromptStyle::ChatMessage => CHAT_INSTRUCTIONS,
    };
    prompt.push_str("\n\n");
    prompt.push_str(instructions);

    prompt
}
