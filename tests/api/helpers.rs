use axum::Router;
use graceperiod::{
    app_state::AppState,
    canonical_host::CanonicalHost,
    configuration::{get_configuration, Settings},
    content_client::ContentClient,
    domain::SubscriberEmail,
    notifier::SubscriberNotifier,
    startup::{app, Application},
    storage::Storage,
    telemetry::{get_subscriber, init_subscriber},
};
use once_cell::sync::Lazy;
use reqwest::{redirect::Policy, Client, Response};
use secrecy::Secret;
use serde_json::Value;
use std::{net::SocketAddr, time::Duration};
use wiremock::{MockServer, Request};

static TRACING: Lazy<()> = Lazy::new(|| {
    let name = "test";
    let default_env_filter = "info";
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(name.into(), default_env_filter.into(), std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(name.into(), default_env_filter.into(), std::io::sink);
        init_subscriber(subscriber);
    }
});

static FAILED_TO_EXECUTE_REQUEST: &str = "Failed to execute request";

pub const PAGE_ID: &str = "0123456789abcdef0123456789abcdef";

pub struct TestApp {
    pub address: SocketAddr,
    pub email_server: MockServer,
    pub content_server: MockServer,
    client: Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns the app against the in-memory store, with both providers mocked.
    /// `configure` runs last and may override anything.
    pub async fn spawn_with(configure: impl FnOnce(&mut Settings)) -> Self {
        Lazy::force(&TRACING);

        let email_server = MockServer::start().await;
        let content_server = MockServer::start().await;

        let mut config = test_configuration(&email_server, &content_server);
        configure(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build application");
        let address = app.local_addr().expect("Failed to get local address");

        tokio::spawn(app.run_until_stopped());

        Self {
            address,
            email_server,
            content_server,
            client: Client::builder()
                .redirect(Policy::none())
                .build()
                .expect("Failed to build http client"),
        }
    }

    pub async fn get_health_check(&self) -> Response {
        self.get("/health_check").await
    }

    pub async fn post_subscribe(&self, body: &Value) -> Response {
        self.client
            .post(self.url("/api/subscribe"))
            .json(body)
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn post_subscribe_raw(&self, content_type: &str, body: &'static str) -> Response {
        self.client
            .post(self.url("/api/subscribe"))
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn get_subscriptions(&self) -> Vec<Value> {
        let response = self.get("/api/subscriptions").await;
        assert_eq!(response.status(), 200);
        response.json().await.expect("Failed to decode subscriptions")
    }

    pub async fn get_posts(&self) -> Response {
        self.get("/api/posts").await
    }

    pub async fn post_visitor_count(&self) -> Response {
        self.client
            .post(self.url("/api/visitor-count"))
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn get_visitor_count(&self) -> Response {
        self.get("/api/visitor-count").await
    }

    pub async fn get_with_host(&self, endpoint: &str, host: &str) -> Response {
        self.client
            .get(self.url(endpoint))
            .header("Host", host)
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    /// Notifications are sent in the background, so poll until they arrive.
    pub async fn email_requests(&self, expected: usize) -> Vec<Request> {
        for _ in 0..50 {
            let requests = self.received_email_requests().await;
            if requests.len() >= expected {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        self.received_email_requests().await
    }

    async fn received_email_requests(&self) -> Vec<Request> {
        self.email_server
            .received_requests()
            .await
            .expect("Request recording is disabled")
    }

    async fn get(&self, endpoint: &str) -> Response {
        self.client
            .get(self.url(endpoint))
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("http://{}{endpoint}", self.address)
    }
}

/// The router alone over `storage`, for driving with `tower::ServiceExt::oneshot`.
/// Email is disabled and the content provider is unreachable.
pub fn app_with_storage(storage: Storage) -> CanonicalHost<Router> {
    Lazy::force(&TRACING);

    let content_client = ContentClient::new(
        "http://127.0.0.1:1".into(),
        "2022-06-28".into(),
        Secret::new("secret_test".into()),
        PAGE_ID.into(),
        Duration::from_millis(200),
    )
    .expect("Failed to build content client");
    let recipient = SubscriberEmail::parse("artist@example.com".into())
        .expect("Invalid notification recipient");

    app(AppState {
        storage,
        content_client,
        notifier: SubscriberNotifier::new(None, recipient),
    })
}

pub fn test_configuration(email_server: &MockServer, content_server: &MockServer) -> Settings {
    let mut config = get_configuration().expect("Failed to read configuration");

    config.application.host = "127.0.0.1".into();
    config.application.port = 0;
    config.database.url = None;

    config.email_client.base_url = email_server.uri();
    config.email_client.api_key = Some(Secret::new("re_test_key".into()));
    config.email_client.timeout_milliseconds = 500;

    config.content.base_url = content_server.uri();
    config.content.integration_secret = Some(Secret::new("secret_test".into()));
    config.content.page_url = Some(format!("https://www.notion.so/grace/Posts-{PAGE_ID}"));
    config.content.timeout_milliseconds = 500;

    config
}

pub fn query_path() -> String {
    format!("/v1/databases/{PAGE_ID}/query")
}
