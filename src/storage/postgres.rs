use super::{StorageError, VISIT_COUNTER_ID};
use crate::domain::{Account, NewSubscriber, Subscription};
use secrecy::{ExposeSecret, Secret};
use sqlx::{postgres::PgRow, PgPool, Row};

#[derive(Clone)]
pub struct PgStorage {
    db_pool: PgPool,
}

impl PgStorage {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    #[tracing::instrument(name = "Get user by id", skip(self))]
    pub async fn get_user(&self, id: i32) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.map(account_from_row).transpose()?)
    }

    #[tracing::instrument(name = "Get user by username", skip(self))]
    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.map(account_from_row).transpose()?)
    }

    #[tracing::instrument(name = "Create user", skip(self, password))]
    pub async fn create_user(
        &self,
        username: &str,
        password: Secret<String>,
    ) -> Result<Account, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, password)
            VALUES ($1, $2)
            RETURNING id, username, password
            "#,
        )
        .bind(username)
        .bind(password.expose_secret())
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| unique_violation_or(e, "username", username))?;

        Ok(account_from_row(row)?)
    }

    #[tracing::instrument(name = "Save new subscriber in the database", skip(self))]
    pub async fn create_email_subscription(
        &self,
        new_subscriber: &NewSubscriber,
    ) -> Result<Subscription, StorageError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO email_subscriptions (email, location, subscribed_at)
            VALUES ($1, $2, now())
            RETURNING id, email, location, subscribed_at
            "#,
        )
        .bind(new_subscriber.email.as_ref())
        .bind(new_subscriber.location.as_deref())
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| unique_violation_or(e, "email", new_subscriber.email.as_ref()))
    }

    #[tracing::instrument(name = "Get subscription by email", skip(self))]
    pub async fn get_email_subscription(
        &self,
        email: &str,
    ) -> Result<Option<Subscription>, StorageError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, email, location, subscribed_at
            FROM email_subscriptions
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(subscription)
    }

    #[tracing::instrument(name = "Get all subscriptions", skip(self))]
    pub async fn get_all_email_subscriptions(&self) -> Result<Vec<Subscription>, StorageError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, email, location, subscribed_at
            FROM email_subscriptions
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(subscriptions)
    }

    /// Single upsert, so concurrent increments are serialized by Postgres.
    #[tracing::instrument(name = "Increment visitor count", skip(self))]
    pub async fn increment_visitor_count(&self) -> Result<i32, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO visitor_counter (id, count, last_updated)
            VALUES ($1, 0, now())
            ON CONFLICT (id) DO UPDATE
            SET count = visitor_counter.count + 1, last_updated = now()
            RETURNING count
            "#,
        )
        .bind(VISIT_COUNTER_ID)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(row.try_get("count")?)
    }

    #[tracing::instrument(name = "Get visitor count", skip(self))]
    pub async fn get_visitor_count(&self) -> Result<i32, StorageError> {
        sqlx::query(
            r#"
            INSERT INTO visitor_counter (id, count, last_updated)
            VALUES ($1, 0, now())
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(VISIT_COUNTER_ID)
        .execute(&self.db_pool)
        .await?;

        let row = sqlx::query(
            r#"
            SELECT count
            FROM visitor_counter
            WHERE id = $1
            "#,
        )
        .bind(VISIT_COUNTER_ID)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(row.try_get("count")?)
    }
}

fn account_from_row(row: PgRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password: Secret::new(row.try_get("password")?),
    })
}

fn unique_violation_or(error: sqlx::Error, field: &'static str, value: &str) -> StorageError {
    let is_unique_violation = error
        .as_database_error()
        .is_some_and(|e| e.is_unique_violation());

    if is_unique_violation {
        StorageError::UniqueViolation {
            field,
            value: value.to_string(),
        }
    } else {
        StorageError::Database(error)
    }
}
