#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test — panics are the assertion mechanism")]

use meshsync_client::{ClientConfig, ClientError, ControlPlaneHttpClient};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn state_body() -> serde_json::Value {
    serde_json::json!({
        "serviceNameToInstances": {
            "echo": {
                "serviceName": "echo",
                "instances": [
                    {"id": "echo-1", "tags": ["lorem", "ipsum"], "address": "10.0.0.1", "port": 8080},
                    {"id": "echo-2", "tags": [], "address": "10.0.0.2", "port": 8080, "canary": true}
                ]
            }
        }
    })
}

fn client() -> ControlPlaneHttpClient {
    ControlPlaneHttpClient::new(ClientConfig {
        connection_timeout: Duration::from_millis(200),
        read_timeout: Duration::from_millis(200),
    })
    .expect("client builds")
}

#[tokio::test]
async fn test_get_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(state_body()))
        .expect(1)
        .mount(&server)
        .await;

    let uri = Url::parse(&server.uri()).expect("mock uri");
    let state = client().get_state(&uri).await.expect("state fetched");

    let echo = state.get("echo").expect("echo present");
    assert_eq!(echo.len(), 2);
    assert!(echo.get("echo-2").expect("echo-2 present").canary);
}

#[tokio::test]
async fn test_get_service_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state/echo"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(state_body()["serviceNameToInstances"]["echo"].clone()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/state/unknown"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let uri = Url::parse(&server.uri()).expect("mock uri");
    let client = client();

    let echo = client.get_service_state(&uri, "echo").await.expect("request ok");
    assert_eq!(echo.map(|e| e.len()), Some(2));

    let unknown = client.get_service_state(&uri, "unknown").await.expect("request ok");
    assert!(unknown.is_none());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(503).set_body_string("draining"))
        .mount(&server)
        .await;

    let uri = Url::parse(&server.uri()).expect("mock uri");
    let err = client().get_state(&uri).await.expect_err("503 must fail");

    assert!(
        matches!(err, ClientError::ServerError { status: 503, ref message } if message == "draining"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"serviceNameToInstances\": 7}"))
        .mount(&server)
        .await;

    let uri = Url::parse(&server.uri()).expect("mock uri");
    let err = client().get_state(&uri).await.expect_err("bad body must fail");
    assert!(matches!(err, ClientError::InvalidResponse(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_slow_peer_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(state_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let uri = Url::parse(&server.uri()).expect("mock uri");
    let err = client().get_state(&uri).await.expect_err("slow peer must time out");
    assert!(err.is_timeout(), "unexpected error: {err:?}");
}
