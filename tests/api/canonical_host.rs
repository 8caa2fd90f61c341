use crate::helpers::TestApp;

#[tokio::test]
async fn www_host_is_permanently_redirected_to_the_bare_domain() {
    // given
    let app = TestApp::spawn().await;

    // when
    let response = app.get_with_host("/x?y=1", "www.graceperiod.live").await;

    // then
    assert_eq!(response.status(), 301);
    assert_eq!(
        response.headers()["Location"],
        "http://graceperiod.live/x?y=1"
    );
}

#[tokio::test]
async fn api_routes_are_redirected_too() {
    // given
    let app = TestApp::spawn().await;

    // when
    let response = app
        .get_with_host("/api/visitor-count", "www.graceperiod.live")
        .await;

    // then
    assert_eq!(response.status(), 301);
    assert_eq!(
        response.headers()["Location"],
        "http://graceperiod.live/api/visitor-count"
    );
}

#[tokio::test]
async fn bare_domain_is_not_redirected() {
    // given
    let app = TestApp::spawn().await;

    // when
    let response = app.get_with_host("/health_check", "graceperiod.live").await;

    // then
    assert_eq!(response.status(), 200);
}
