//! Persistence for accounts, subscriptions and the visit counter.
//!
//! [`Storage`] is chosen once at startup: Postgres when a database url is
//! configured, otherwise a process-local in-memory store with the same contract.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStorage;
pub use postgres::PgStorage;

use crate::domain::{Account, NewSubscriber, Subscription};
use secrecy::Secret;

/// Key of the single visit counter row.
pub const VISIT_COUNTER_ID: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("`{value}` is already taken for unique field `{field}`")]
    UniqueViolation { field: &'static str, value: String },
    #[error("Visit counter is at its maximum value")]
    CounterOverflow,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

#[derive(Clone)]
pub enum Storage {
    Postgres(PgStorage),
    InMemory(InMemoryStorage),
}

impl Storage {
    pub fn in_memory() -> Self {
        Self::InMemory(InMemoryStorage::default())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::InMemory(_) => "in-memory",
        }
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<Account>, StorageError> {
        match self {
            Self::Postgres(s) => s.get_user(id).await,
            Self::InMemory(s) => Ok(s.get_user(id).await),
        }
    }

    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StorageError> {
        match self {
            Self::Postgres(s) => s.get_user_by_username(username).await,
            Self::InMemory(s) => Ok(s.get_user_by_username(username).await),
        }
    }

    /// Fails with [`StorageError::UniqueViolation`] if the username is taken.
    pub async fn create_user(
        &self,
        username: &str,
        password: Secret<String>,
    ) -> Result<Account, StorageError> {
        match self {
            Self::Postgres(s) => s.create_user(username, password).await,
            Self::InMemory(s) => s.create_user(username, password).await,
        }
    }

    /// Fails with [`StorageError::UniqueViolation`] if the email is already subscribed.
    pub async fn create_email_subscription(
        &self,
        new_subscriber: &NewSubscriber,
    ) -> Result<Subscription, StorageError> {
        match self {
            Self::Postgres(s) => s.create_email_subscription(new_subscriber).await,
            Self::InMemory(s) => s.create_email_subscription(new_subscriber).await,
        }
    }

    pub async fn get_email_subscription(
        &self,
        email: &str,
    ) -> Result<Option<Subscription>, StorageError> {
        match self {
            Self::Postgres(s) => s.get_email_subscription(email).await,
            Self::InMemory(s) => Ok(s.get_email_subscription(email).await),
        }
    }

    pub async fn get_all_email_subscriptions(&self) -> Result<Vec<Subscription>, StorageError> {
        match self {
            Self::Postgres(s) => s.get_all_email_subscriptions().await,
            Self::InMemory(s) => Ok(s.get_all_email_subscriptions().await),
        }
    }

    /// Returns the new count. A missing counter is created at 0 and 0 is
    /// returned, so the first call ever does not count as an increment.
    pub async fn increment_visitor_count(&self) -> Result<i32, StorageError> {
        match self {
            Self::Postgres(s) => s.increment_visitor_count().await,
            Self::InMemory(s) => s.increment_visitor_count().await,
        }
    }

    /// Creates the counter at 0 if it does not exist yet.
    pub async fn get_visitor_count(&self) -> Result<i32, StorageError> {
        match self {
            Self::Postgres(s) => s.get_visitor_count().await,
            Self::InMemory(s) => Ok(s.get_visitor_count().await),
        }
    }
}
