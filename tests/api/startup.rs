use crate::helpers::test_configuration;
use graceperiod::startup::Application;
use wiremock::MockServer;

#[tokio::test]
async fn missing_content_secret_aborts_startup() {
    // given
    let (email_server, content_server) = (MockServer::start().await, MockServer::start().await);
    let mut config = test_configuration(&email_server, &content_server);
    config.content.integration_secret = None;

    // when
    let result = Application::build(config).await;

    // then
    assert!(result.is_err());
}

#[tokio::test]
async fn page_url_without_an_id_aborts_startup() {
    // given
    let (email_server, content_server) = (MockServer::start().await, MockServer::start().await);
    let mut config = test_configuration(&email_server, &content_server);
    config.content.page_url = Some("https://www.notion.so/grace/Posts".into());

    // when
    let result = Application::build(config).await;

    // then
    assert!(result.is_err());
}

#[tokio::test]
async fn missing_email_api_key_does_not_abort_startup() {
    // given
    let (email_server, content_server) = (MockServer::start().await, MockServer::start().await);
    let mut config = test_configuration(&email_server, &content_server);
    config.email_client.api_key = None;

    // when
    let result = Application::build(config).await;

    // then
    assert!(result.is_ok());
}
