//! Durable backend tests. They need a reachable Postgres server given by
//! `APP_DATABASE__URL` or `DATABASE_URL`; run them with `cargo test -- --ignored`.

use graceperiod::{
    domain::{NewSubscriber, SubscriberEmail},
    startup::get_pg_connection_pool,
    storage::{PgStorage, Storage, StorageError},
};
use secrecy::{ExposeSecret, Secret};
use sqlx::{postgres::PgConnectOptions, Connection, Executor, PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

async fn configure_database() -> PgPool {
    let url = std::env::var("APP_DATABASE__URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("DATABASE_URL must be set to run Postgres tests");
    let options = PgConnectOptions::from_str(&url).expect("Invalid database url");

    let mut conn = PgConnection::connect_with(&options)
        .await
        .expect("Failed to connect to Postgres");

    let database_name = Uuid::new_v4().to_string();
    conn.execute(format!(r#"CREATE DATABASE "{}";"#, database_name).as_str())
        .await
        .expect("Failed to create database");

    let pool = get_pg_connection_pool(options.database(&database_name), 5);

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

async fn storage() -> (Storage, PgPool) {
    let pool = configure_database().await;
    (Storage::Postgres(PgStorage::new(pool.clone())), pool)
}

fn new_subscriber(email: &str, location: Option<&str>) -> NewSubscriber {
    NewSubscriber {
        email: SubscriberEmail::parse(email.to_string()).unwrap(),
        location: location.map(String::from),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn sequential_increments_from_empty_count_from_zero() {
    // given
    let (storage, _) = storage().await;

    // when
    let mut counts = Vec::new();
    for _ in 0..5 {
        counts.push(storage.increment_visitor_count().await.unwrap());
    }

    // then
    assert_eq!(counts, [0, 1, 2, 3, 4]);
    assert_eq!(storage.get_visitor_count().await.unwrap(), 4);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn concurrent_increments_are_not_lost() {
    // given
    let (storage, _) = storage().await;
    let n = 20;

    // when
    let handles: Vec<_> = (0..n)
        .map(|_| {
            let storage = storage.clone();
            tokio::spawn(async move { storage.increment_visitor_count().await.unwrap() })
        })
        .collect();
    let mut counts = Vec::new();
    for handle in handles {
        counts.push(handle.await.unwrap());
    }

    // then
    counts.sort_unstable();
    assert_eq!(counts, (0..n).collect::<Vec<_>>());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn reading_a_missing_counter_creates_a_single_row_at_zero() {
    // given
    let (storage, pool) = storage().await;

    // when
    let first = storage.get_visitor_count().await.unwrap();
    let second = storage.get_visitor_count().await.unwrap();

    // then
    assert_eq!((first, second), (0, 0));
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visitor_counter")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn explicitly_seeded_counter_starts_at_the_column_default() {
    // given
    let (storage, pool) = storage().await;
    sqlx::query("INSERT INTO visitor_counter (id) VALUES (1)")
        .execute(&pool)
        .await
        .unwrap();

    // then
    assert_eq!(storage.get_visitor_count().await.unwrap(), 1012);
    assert_eq!(storage.increment_visitor_count().await.unwrap(), 1013);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn subscriptions_round_trip_through_the_database() {
    // given
    let (storage, _) = storage().await;

    // when
    let created = storage
        .create_email_subscription(&new_subscriber("fan@example.com", Some("Lisbon")))
        .await
        .unwrap();

    // then
    let found = storage
        .get_email_subscription("fan@example.com")
        .await
        .unwrap()
        .expect("Subscription not found");
    assert_eq!(found.id, created.id);
    assert_eq!(found.location.as_deref(), Some("Lisbon"));
    assert_eq!(found.subscribed_at, created.subscribed_at);
    assert!(storage
        .get_email_subscription("FAN@example.com")
        .await
        .unwrap()
        .is_none());
    assert_eq!(storage.get_all_email_subscriptions().await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn duplicate_email_is_a_unique_violation() {
    // given
    let (storage, _) = storage().await;
    storage
        .create_email_subscription(&new_subscriber("fan@example.com", None))
        .await
        .unwrap();

    // when
    let result = storage
        .create_email_subscription(&new_subscriber("fan@example.com", None))
        .await;

    // then
    assert!(matches!(
        result,
        Err(StorageError::UniqueViolation { field: "email", .. })
    ));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn users_are_created_and_found() {
    // given
    let (storage, _) = storage().await;

    // when
    let created = storage
        .create_user("grace", Secret::new("opaque".into()))
        .await
        .unwrap();
    let duplicate = storage
        .create_user("grace", Secret::new("other".into()))
        .await;

    // then
    let by_id = storage.get_user(created.id).await.unwrap().unwrap();
    let by_name = storage
        .get_user_by_username("grace")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_id.username, "grace");
    assert_eq!(by_name.password.expose_secret(), "opaque");
    assert!(duplicate.is_err_and(|e| e.is_unique_violation()));
}
