//! Exercise every helper over real HTTP against the mock server.
//!
//! # Design
//! Each test starts its own server on a random port in a background thread
//! with a current-thread tokio runtime, then calls the blocking helpers
//! directly. Tests that need the plain routes use `mock_server::run`; the
//! body-read failure tests use `mock_server::run_truncated` and
//! `mock_server::run_stalled`.

use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use easyhttp_core::{ClientConfig, HttpError, JsonClient};
use tracing_test::traced_test;

fn spawn_server<F, Fut>(serve: F) -> SocketAddr
where
    F: FnOnce(tokio::net::TcpListener) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), std::io::Error>>,
{
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            serve(listener).await
        })
        .unwrap();
    });

    addr
}

fn mock() -> String {
    format!("http://{}", spawn_server(mock_server::run))
}

fn seen_headers(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

// ---------------------------------------------------------------------------
// Echo
// ---------------------------------------------------------------------------

#[test]
fn post_echoes_body() {
    let base = mock();
    let (body, response) = easyhttp_core::post(&format!("{base}/echo"), br#"{"a":1}"#).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(body, br#"{"a":1}"#);
}

#[test]
fn put_and_patch_echo_body() {
    let base = mock();
    let url = format!("{base}/echo");

    let (body, response) = easyhttp_core::put(&url, br#"{"put":true}"#).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(body, br#"{"put":true}"#);

    let (body, response) = easyhttp_core::patch(&url, br#"{"patch":true}"#).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(body, br#"{"patch":true}"#);
}

#[test]
fn empty_body_is_sent_and_echoed() {
    let base = mock();
    let (body, response) = easyhttp_core::post(&format!("{base}/echo"), b"").unwrap();
    assert_eq!(response.status, 200);
    assert!(body.is_empty());
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

#[test]
fn get_sends_json_content_type_and_accept() {
    let base = mock();
    let (body, response) = easyhttp_core::get(&format!("{base}/headers")).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("application/json"));

    let seen = seen_headers(&body);
    assert_eq!(seen["content-type"], "application/json");
    assert_eq!(seen["accept"], "application/json");
    assert!(seen.get("authorization").is_none());
}

#[test]
fn writes_send_json_content_type() {
    let base = mock();
    let url = format!("{base}/headers");
    let client = JsonClient::default();

    for (name, result) in [
        ("post", client.post(&url, b"{}")),
        ("put", client.put(&url, b"{}")),
        ("patch", client.patch(&url, b"{}")),
    ] {
        let (body, response) = result.unwrap();
        assert_eq!(response.status, 200, "{name}");
        assert_eq!(seen_headers(&body)["content-type"], "application/json", "{name}");
    }
}

#[test]
fn bearer_variants_send_exact_authorization() {
    let base = mock();
    let url = format!("{base}/headers");
    let client = JsonClient::default();

    for (name, result) in [
        ("get", client.get_with_bearer(&url, "abc123")),
        ("graph", client.get_with_bearer_graph(&url, "abc123")),
        ("post", client.post_with_bearer(&url, b"{}", "abc123")),
        ("put", client.put_with_bearer(&url, b"{}", "abc123")),
        ("patch", client.patch_with_bearer(&url, b"{}", "abc123")),
    ] {
        let (body, _) = result.unwrap();
        assert_eq!(seen_headers(&body)["authorization"], "Bearer abc123", "{name}");
    }
}

#[test]
fn graph_get_asks_for_eventual_consistency_not_json() {
    let base = mock();
    let (body, response) = easyhttp_core::get_with_bearer_graph(&format!("{base}/headers"), "tok").unwrap();
    assert_eq!(response.status, 200);

    let seen = seen_headers(&body);
    assert_eq!(seen["consistencylevel"], "eventual");
    assert_eq!(seen["content-type"], "application/json");
    assert_ne!(seen.get("accept").and_then(|v| v.as_str()), Some("application/json"));
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[test]
fn bearer_endpoint_accepts_only_matching_token() {
    let base = mock();
    let url = format!("{base}/bearer");

    let (body, response) = easyhttp_core::get_with_bearer(&url, "abc123").unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(seen_headers(&body)["authorized"], true);

    let (_, response) = easyhttp_core::get_with_bearer(&url, "wrong").unwrap();
    assert_eq!(response.status, 401);

    let (_, response) = easyhttp_core::get(&url).unwrap();
    assert_eq!(response.status, 401);
}

#[test]
fn basic_variants_are_accepted_by_standard_server() {
    let base = mock();
    let url = format!("{base}/basic");
    let client = JsonClient::default();

    for (name, result) in [
        ("get", client.get_with_basic_auth(&url, "user", "pass")),
        ("post", client.post_with_basic_auth(&url, b"{}", "user", "pass")),
        ("put", client.put_with_basic_auth(&url, b"{}", "user", "pass")),
        ("patch", client.patch_with_basic_auth(&url, b"{}", "user", "pass")),
    ] {
        let (body, response) = result.unwrap();
        assert_eq!(response.status, 200, "{name}");
        assert_eq!(seen_headers(&body)["user"], "user", "{name}");
    }
}

#[test]
fn wrong_basic_password_is_a_401_not_an_error() {
    let base = mock();
    let (_, response) = easyhttp_core::post_with_basic_auth(&format!("{base}/basic"), b"{}", "user", "nope").unwrap();
    assert_eq!(response.status, 401);
    assert!(response.header("www-authenticate").is_some());
}

#[test]
fn free_functions_match_client_methods() {
    let base = mock();
    let url = format!("{base}/basic");

    let (_, response) = easyhttp_core::get_with_basic_auth(&url, "user", "pass").unwrap();
    assert_eq!(response.status, 200);
    let (_, response) = easyhttp_core::put_with_basic_auth(&url, b"{}", "user", "pass").unwrap();
    assert_eq!(response.status, 200);
    let (_, response) = easyhttp_core::patch_with_basic_auth(&url, b"{}", "user", "pass").unwrap();
    assert_eq!(response.status, 200);

    let url = format!("{base}/echo");
    let (body, _) = easyhttp_core::post_with_bearer(&url, b"[1]", "t").unwrap();
    assert_eq!(body, b"[1]");
    let (body, _) = easyhttp_core::put_with_bearer(&url, b"[2]", "t").unwrap();
    assert_eq!(body, b"[2]");
    let (body, _) = easyhttp_core::patch_with_bearer(&url, b"[3]", "t").unwrap();
    assert_eq!(body, b"[3]");
}

// ---------------------------------------------------------------------------
// Status codes and failures
// ---------------------------------------------------------------------------

#[test]
fn error_statuses_are_returned_as_data() {
    let base = mock();
    for code in [404u16, 500] {
        let (_, response) = easyhttp_core::get(&format!("{base}/status/{code}")).unwrap();
        assert_eq!(response.status, code);
        assert!(!response.is_success());
    }
}

#[test]
fn invalid_url_returns_invalid_request() {
    let err = easyhttp_core::get("not a url").unwrap_err();
    assert!(matches!(err, HttpError::InvalidRequest(_)), "{err:?}");
}

#[test]
fn exceeding_timeout_is_a_transport_error() {
    let base = mock();
    let client = JsonClient::new(ClientConfig::default().with_timeout(Duration::from_millis(200)));

    let err = client.get(&format!("{base}/slow?ms=3000")).unwrap_err();
    assert!(matches!(err, HttpError::Transport { .. }), "{err:?}");
    assert!(err.is_timeout());
}

#[test]
fn response_within_timeout_succeeds() {
    let base = mock();
    let client = JsonClient::new(ClientConfig::default().with_timeout(Duration::from_secs(5)));

    let (body, response) = client.get(&format!("{base}/slow?ms=50")).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(seen_headers(&body)["slept_ms"], 50);
}

#[test]
fn refused_connection_is_a_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = easyhttp_core::get(&format!("http://{addr}/")).unwrap_err();
    assert!(matches!(err, HttpError::Transport { .. }), "{err:?}");
    assert!(!err.is_timeout());
}

#[test]
#[traced_test]
fn truncated_body_discards_metadata_and_logs_release() {
    let addr = spawn_server(mock_server::run_truncated);

    // The server sent 200, but the metadata does not survive the failed read.
    let err = easyhttp_core::get(&format!("http://{addr}/")).unwrap_err();
    assert!(matches!(err, HttpError::BodyRead { .. }), "{err:?}");
    assert!(logs_contain("response body released before it was fully read"));
    assert!(!logs_contain("connection discarded"));
}

#[test]
fn truncated_body_fails_for_writes_too() {
    let addr = spawn_server(mock_server::run_truncated);
    let err = easyhttp_core::post_with_bearer(&format!("http://{addr}/"), b"{}", "abc123").unwrap_err();
    assert!(matches!(err, HttpError::BodyRead { .. }), "{err:?}");
}

#[test]
fn timeout_covers_the_body_read() {
    let addr = spawn_server(|listener| mock_server::run_stalled(listener, Duration::from_secs(5)));
    let client = JsonClient::new(ClientConfig::default().with_timeout(Duration::from_millis(300)));

    let started = Instant::now();
    let err = client.get(&format!("http://{addr}/")).unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, HttpError::BodyRead { .. }), "{err:?}");
    assert!(err.is_timeout());
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
}

#[test]
fn redirect_without_location_is_a_transport_error() {
    let base = mock();
    let err = easyhttp_core::get_with_bearer(&format!("{base}/status/302"), "abc123").unwrap_err();
    assert!(
        matches!(err, HttpError::Transport { source: ureq::Error::Protocol(_), .. }),
        "{err:?}"
    );
    assert!(!err.is_timeout());
}

#[test]
fn concurrent_calls_do_not_interfere() {
    let base = mock();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let url = format!("{base}/echo");
            std::thread::spawn(move || {
                let payload = format!(r#"{{"n":{i}}}"#);
                let (body, response) = easyhttp_core::post(&url, payload.as_bytes()).unwrap();
                assert_eq!(response.status, 200);
                assert_eq!(body, payload.as_bytes());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
