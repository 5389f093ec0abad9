pub mod notification_models;
pub mod notification_service;

pub use notification_models::TodoNotification;
pub use notification_service::{
    validate_webhook_url, ChatWebhook, NotificationService, NotifyError, WEBHOOK_URL_PLACEHOLDER,
};
