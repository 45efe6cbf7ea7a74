// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use crate::error::is_not_found;
use crate::runtime::NoBackoff;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> LinodeClientConfig {
    LinodeClientConfig::builder()
        .base_url(server.uri())
        .token("test-token")
        .retry(RetryConfig::builder().backoff(NoBackoff).build())
        .build()
}

fn test_client(server: &MockServer) -> LinodeClient {
    LinodeClient::new(test_config(server)).expect("client")
}

fn count_requests(client: &LinodeClient) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    client.on_before_request(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    count
}

#[test]
fn test_default_config() {
    let config = LinodeClientConfig::default();
    assert_eq!(config.base_url, "api.linode.com");
    assert_eq!(config.api_version, "v4");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.poll_interval, Duration::from_secs(3));
    assert_eq!(config.cache_expiration, Duration::from_secs(15 * 60));
    assert_eq!(config.retry.max_wait_time, Duration::from_secs(30));
    assert!(config.token.is_none());
    assert!(!config.debug);
}

#[test]
fn test_endpoint_building() {
    let config = LinodeClientConfig::default();
    assert_eq!(
        config.endpoint().unwrap().as_str(),
        "https://api.linode.com/v4/"
    );

    let config = LinodeClientConfig::builder()
        .base_url("http://127.0.0.1:8080/")
        .api_version("/v4beta/")
        .build();
    assert_eq!(
        config.endpoint().unwrap().as_str(),
        "http://127.0.0.1:8080/v4beta/"
    );
}

#[test]
fn test_profile_is_applied() {
    let profile = ResolvedProfile {
        name: "staging".to_string(),
        token: "abc".to_string(),
        api_url: "api.staging.linode.com".to_string(),
        api_version: "v4beta".to_string(),
    };
    let config = LinodeClientConfig::default().with_profile(&profile);
    assert_eq!(config.token.as_deref(), Some("abc"));
    assert_eq!(
        config.endpoint().unwrap().as_str(),
        "https://api.staging.linode.com/v4beta/"
    );
}

#[test]
fn test_encode_segment() {
    assert_eq!(encode_segment("mysql"), "mysql");
    assert_eq!(encode_segment("a b/c?d"), "a%20b%2Fc%3Fd");
}

#[test]
fn test_invalid_ca_path() {
    let config = LinodeClientConfig::builder()
        .ca_path("/nonexistent/path_12345.pem")
        .build();

    match LinodeClient::new(config) {
        Err(LinodeError::Config(msg)) => assert!(msg.contains("Failed to read CA cert")),
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[test]
fn test_ca_file_without_certificates() {
    let dir = tempfile::tempdir().unwrap();
    let ca = dir.path().join("empty.pem");
    std::fs::write(&ca, "not a certificate").unwrap();

    let config = LinodeClientConfig::builder()
        .ca_path(ca.to_string_lossy())
        .build();
    match LinodeClient::new(config) {
        Err(LinodeError::Config(msg)) => assert!(msg.contains("No certificates found")),
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_sends_standard_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/profile"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Accept", "application/json"))
        .and(header("User-Agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let profile: Value = client.get("profile").await.unwrap();
    assert_eq!(profile["username"], "ada");
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v4/volumes"))
        .and(header("Content-Type", "application/json"))
        .and(wiremock::matchers::body_json(json!({"label": "data", "size": 20})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let created: Value = client
        .post("volumes", &json!({"label": "data", "size": 20}))
        .await
        .unwrap();
    assert_eq!(created["id"], 7);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/linode/instances/404"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"errors": [{"reason": "Not found"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.get::<Value>("linode/instances/404").await.unwrap_err();
    assert!(is_not_found(&err));
    assert_eq!(err.to_string(), "[404] Not found");
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/regions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v4/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let body: Value = client.get("regions").await.unwrap();
    assert_eq!(body["data"], json!([]));
    assert_eq!(client.metrics().retries(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_return_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/regions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .expect(3)
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    client.set_retry_config(
        RetryConfig::builder()
            .backoff(NoBackoff)
            .max_retries(2)
            .build(),
    );

    let err = client.get::<Value>("regions").await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(err.to_string(), "[500] Internal Server Error");
}

#[tokio::test]
async fn test_not_implemented_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(501))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.get::<Value>("regions").await.unwrap_err();
    assert_eq!(err.status_code(), Some(501));
}

#[tokio::test]
async fn test_custom_retry_condition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(409))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    client.add_retry_condition(RetryCondition::new("conflict", |input| {
        input.status == StatusCode::CONFLICT
    }));
    let requests = count_requests(&client);

    client.get::<Value>("volumes/1").await.unwrap();
    assert_eq!(requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_filter_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(header("X-Filter", r#"{"region":"us-east"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1}], "page": 1, "pages": 1, "results": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let opts = ListOptions::new().with_filter(r#"{"region":"us-east"}"#);
    let items: Vec<Value> = client.list("linode/instances", &opts).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_list_walks_pages() {
    let server = MockServer::start().await;
    for page in 1..=2u32 {
        Mock::given(method("GET"))
            .and(path("/v4/volumes"))
            .and(query_param("page", page.to_string()))
            .and(query_param("page_size", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": page * 10}, {"id": page * 10 + 1}],
                "page": page, "pages": 2, "results": 4
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = test_client(&server);
    let items: Vec<Value> = client
        .list("volumes", &ListOptions::new().with_page_size(2))
        .await
        .unwrap();
    let ids: Vec<u64> = items.iter().map(|v| v["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![10, 11, 20, 21]);
}

#[tokio::test]
async fn test_cache_hit_skips_network_and_hooks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "us-east"}]})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let requests = count_requests(&client);

    let first: Value = client.get_cached("regions").await.unwrap();
    let second: Value = client.get_cached("regions").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(requests.load(Ordering::SeqCst), 1);
    assert_eq!(client.metrics().cache_hits(), 1);

    // Uncached GETs always go out.
    let _: Value = client.get("regions").await.unwrap();
    assert_eq!(requests.load(Ordering::SeqCst), 2);

    assert_eq!(client.invalidate_cache_endpoint("regions"), 1);
    let _: Value = client.get_cached("regions").await.unwrap();
    assert_eq!(requests.load(Ordering::SeqCst), 3);

    client.set_cache_expiration(Duration::ZERO);
    let _: Value = client.get_cached("regions").await.unwrap();
    assert_eq!(requests.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_failed_responses_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.get_cached::<Value>("regions").await.is_err());
    assert!(client.get_cached::<Value>("regions").await.is_err());
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_before_hook_error_aborts_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.on_before_request(|_| Err("offline mode".into()));

    match client.get::<Value>("regions").await {
        Err(LinodeError::Hook(msg)) => assert_eq!(msg, "offline mode"),
        other => panic!("Expected Hook error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_before_hook_can_add_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("X-Request-Source", "tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.on_before_request(|req| {
        req.headers
            .insert("X-Request-Source", HeaderValue::from_static("tests"));
        Ok(())
    });
    client.get::<Value>("regions").await.unwrap();
}

#[tokio::test]
async fn test_after_hook_error_fails_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.on_after_response(|resp| {
        if resp.url.path().ends_with("/forbidden") {
            return Err("response rejected".into());
        }
        Ok(())
    });

    client.get::<Value>("regions").await.unwrap();
    assert!(matches!(
        client.get::<Value>("forbidden").await,
        Err(LinodeError::Hook(_))
    ));
}

#[tokio::test]
async fn test_transport_error_is_not_classified() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = LinodeClient::new(
        LinodeClientConfig::builder()
            .base_url(format!("http://{addr}"))
            .timeout(Duration::from_secs(2))
            .build(),
    )
    .unwrap();

    let err = client.get::<Value>("regions").await.unwrap_err();
    assert!(matches!(err, LinodeError::Transport(_)));
    assert!(err.as_api_error().is_none());
}

#[tokio::test]
async fn test_undecodable_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(matches!(
        client.get::<Value>("regions").await,
        Err(LinodeError::Decode(_))
    ));
}
