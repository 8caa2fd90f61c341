use super::StorageError;
use crate::domain::{Account, NewSubscriber, Subscription};
use secrecy::Secret;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// Process-lifetime store used when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<RwLock<State>>,
}

#[derive(Default)]
struct State {
    users: Vec<Account>,
    subscriptions: Vec<Subscription>,
    visit_count: Option<i32>,
    next_user_id: i32,
    next_subscription_id: i32,
}

impl State {
    fn next_user_id(&mut self) -> i32 {
        self.next_user_id += 1;
        self.next_user_id
    }

    fn next_subscription_id(&mut self) -> i32 {
        self.next_subscription_id += 1;
        self.next_subscription_id
    }
}

impl InMemoryStorage {
    pub async fn get_user(&self, id: i32) -> Option<Account> {
        let state = self.state.read().await;
        state.users.iter().find(|u| u.id == id).cloned()
    }

    pub async fn get_user_by_username(&self, username: &str) -> Option<Account> {
        let state = self.state.read().await;
        state.users.iter().find(|u| u.username == username).cloned()
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: Secret<String>,
    ) -> Result<Account, StorageError> {
        let mut state = self.state.write().await;

        if state.users.iter().any(|u| u.username == username) {
            return Err(StorageError::UniqueViolation {
                field: "username",
                value: username.to_string(),
            });
        }

        let account = Account {
            id: state.next_user_id(),
            username: username.to_string(),
            password,
        };
        state.users.push(account.clone());

        Ok(account)
    }

    #[tracing::instrument(name = "Save new subscriber in memory", skip(self))]
    pub async fn create_email_subscription(
        &self,
        new_subscriber: &NewSubscriber,
    ) -> Result<Subscription, StorageError> {
        let mut state = self.state.write().await;
        let email = new_subscriber.email.as_ref();

        if state.subscriptions.iter().any(|s| s.email == email) {
            return Err(StorageError::UniqueViolation {
                field: "email",
                value: email.to_string(),
            });
        }

        let subscription = Subscription {
            id: state.next_subscription_id(),
            email: email.to_string(),
            location: new_subscriber.location.clone(),
            subscribed_at: OffsetDateTime::now_utc(),
        };
        state.subscriptions.push(subscription.clone());

        Ok(subscription)
    }

    pub async fn get_email_subscription(&self, email: &str) -> Option<Subscription> {
        let state = self.state.read().await;
        state.subscriptions.iter().find(|s| s.email == email).cloned()
    }

    pub async fn get_all_email_subscriptions(&self) -> Vec<Subscription> {
        self.state.read().await.subscriptions.clone()
    }

    pub async fn increment_visitor_count(&self) -> Result<i32, StorageError> {
        let mut state = self.state.write().await;

        let count = match state.visit_count {
            Some(count) => count.checked_add(1).ok_or(StorageError::CounterOverflow)?,
            None => 0,
        };
        state.visit_count = Some(count);

        Ok(count)
    }

    pub async fn get_visitor_count(&self) -> i32 {
        let mut state = self.state.write().await;
        *state.visit_count.get_or_insert(0)
    }
}
