pub mod app_state;
pub mod canonical_host;
pub mod configuration;
pub mod content_client;
pub mod domain;
pub mod email_client;
pub mod notifier;
pub mod routes;
pub mod startup;
pub mod storage;
pub mod telemetry;
pub mod utils;
