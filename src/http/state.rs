use std::sync::Arc;

use crate::core::notifications::{ChatWebhook, NotificationService};
use crate::core::summarization::{SummarizationService, SummaryProvider};
use crate::infra::firestore::FirestoreIdentity;

pub type Summarizer = SummarizationService<Box<dyn SummaryProvider>>;
pub type Notifier = NotificationService<Box<dyn ChatWebhook>, Box<dyn SummaryProvider>>;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub summarizer: Arc<Summarizer>,
    pub notifier: Arc<Notifier>,
    pub identity: Arc<FirestoreIdentity>,
}

impl AppState {
    /// Wires the notifier to the same summarizer the summarize endpoint uses.
    pub fn new(
        provider: Box<dyn SummaryProvider>,
        webhook: Box<dyn ChatWebhook>,
        identity: FirestoreIdentity,
    ) -> Self {
        let summarizer = Arc::new(SummarizationService::new(provider));
        let notifier = Arc::new(NotificationService::new(webhook, Arc::clone(&summarizer)));

        Self {
            summarizer,
            notifier,
            identity: Arc::new(identity),
        }
    }
}
