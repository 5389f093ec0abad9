// Slack incoming-webhook adapter for the notifications core.

pub mod slack_message;
pub mod slack_webhook_client;

pub use slack_message::MessageFormat;
pub use slack_webhook_client::SlackWebhookClient;
