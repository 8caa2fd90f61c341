use crate::{content_client::ContentClient, notifier::SubscriberNotifier, storage::Storage};

#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub content_client: ContentClient,
    pub notifier: SubscriberNotifier,
}
