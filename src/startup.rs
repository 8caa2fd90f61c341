use crate::{
    app_state::AppState,
    canonical_host::{CanonicalHost, CanonicalHostLayer, CANONICAL_HOST},
    configuration::{DatabaseSettings, Settings},
    notifier::SubscriberNotifier,
    routes::{health_check, posts, subscriptions, visitor_count},
    storage::{PgStorage, Storage},
    telemetry::{request_span, RequestUuid},
};
use anyhow::Context;
use axum::{extract::Request, Router, ServiceExt};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub struct Application {
    listener: TcpListener,
    app: CanonicalHost<Router>,
}

impl Application {
    /// Fails on any configuration the service cannot run without: an invalid
    /// database url, unreachable migrations, or a missing content provider.
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let storage = get_storage(&config.database).await?;
        tracing::info!("Using {} storage", storage.backend_name());

        let content_client = config.content.client()?;
        let notifier = SubscriberNotifier::new(
            config.email_client.client()?,
            config
                .email_client
                .recipient()
                .map_err(anyhow::Error::msg)
                .context("Invalid notification recipient")?,
        );

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {address}"))?;

        let app_state = AppState {
            storage,
            content_client,
            notifier,
        };

        Ok(Self {
            listener,
            app: app(app_state),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        tracing::info!("Listening on {}", self.listener.local_addr()?);
        axum::serve(
            self.listener,
            ServiceExt::<Request>::into_make_service(self.app),
        )
        .await
    }
}

/// The host redirect wraps the router so it also runs for unmatched paths.
/// The last layer added runs first, so the request id exists before the trace span reads it.
pub fn app(app_state: AppState) -> CanonicalHost<Router> {
    let router = Router::new()
        .merge(health_check::router())
        .merge(subscriptions::router())
        .merge(posts::router())
        .merge(visitor_count::router())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::x_request_id(RequestUuid))
        .with_state(app_state);

    CanonicalHostLayer::new(CANONICAL_HOST).layer(router)
}

pub fn get_pg_connection_pool(options: PgConnectOptions, max_connections: u32) -> PgPool {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_lazy_with(options)
}

/// Postgres when a database url is configured, in-memory otherwise.
pub async fn get_storage(settings: &DatabaseSettings) -> Result<Storage, anyhow::Error> {
    let Some(options) = settings.connect_options() else {
        tracing::warn!("Database url is not set; subscriptions will only be kept in memory");
        return Ok(Storage::in_memory());
    };

    let pool = get_pg_connection_pool(
        options.context("Invalid database url")?,
        settings.max_connections,
    );

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate the database")?;

    Ok(Storage::Postgres(PgStorage::new(pool)))
}
