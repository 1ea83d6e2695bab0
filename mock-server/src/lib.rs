use std::{collections::BTreeMap, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

pub const BEARER_TOKEN: &str = "abc123";
pub const BASIC_USER: &str = "user";
pub const BASIC_PASSWORD: &str = "pass";

/// Bytes actually written by `run_truncated`, well short of the advertised length.
pub const TRUNCATED_BODY: &str = r#"{"partial":"#;
pub const TRUNCATED_CONTENT_LENGTH: usize = 64;

#[derive(Deserialize)]
pub struct SlowParams {
    #[serde(default)]
    pub ms: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", post(echo).put(echo).patch(echo))
        .route("/headers", any(headers))
        .route("/bearer", get(bearer))
        .route("/basic", any(basic))
        .route("/slow", get(slow))
        .route("/status/{code}", get(status))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Answer every connection with a 200 whose body ends early, then hang up.
pub async fn run_truncated(listener: TcpListener) -> Result<(), std::io::Error> {
    serve_short_body(listener, None).await
}

/// Like `run_truncated`, but hold the connection open for `stall` after the
/// partial body so the client is left waiting mid-read.
pub async fn run_stalled(listener: TcpListener, stall: Duration) -> Result<(), std::io::Error> {
    serve_short_body(listener, Some(stall)).await
}

async fn serve_short_body(listener: TcpListener, stall: Option<Duration>) -> Result<(), std::io::Error> {
    loop {
        let (mut socket, peer) = listener.accept().await?;
        tokio::spawn(async move {
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {TRUNCATED_CONTENT_LENGTH}\r\n\r\n{TRUNCATED_BODY}"
            );
            if let Err(e) = socket.write_all(response.as_bytes()).await {
                tracing::debug!(%peer, "short body write failed: {e}");
                return;
            }
            if let Some(stall) = stall {
                let _ = socket.flush().await;
                tokio::time::sleep(stall).await;
            }
            let _ = socket.shutdown().await;
            // Swallow any unread request body so closing does not reset the
            // connection before the client has seen the response.
            let mut rest = Vec::new();
            let _ = socket.read_to_end(&mut rest).await;
        });
    }
}

async fn echo(body: Bytes) -> Bytes {
    body
}

async fn headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    Json(
        headers
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect(),
    )
}

async fn bearer(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let expected = format!("Bearer {BEARER_TOKEN}");
    match headers.get(header::AUTHORIZATION) {
        Some(value) if value.as_bytes() == expected.as_bytes() => Ok(Json(json!({ "authorized": true }))),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn basic(headers: HeaderMap) -> Response {
    match basic_credentials(&headers) {
        Some((user, password)) if user == BASIC_USER && password == BASIC_PASSWORD => {
            Json(json!({ "user": user })).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, r#"Basic realm="mock""#)],
        )
            .into_response(),
    }
}

async fn slow(Query(params): Query<SlowParams>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(json!({ "slept_ms": params.ms }))
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Decode `Authorization: Basic ...` into `(user, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}
