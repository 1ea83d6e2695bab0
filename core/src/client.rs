//! Blocking JSON request helpers.
//!
//! # Design
//! `JsonClient` holds only a `ClientConfig`. Every call builds its own
//! `ureq::Agent`, so no connection or transport state outlives a call and
//! concurrent callers never share anything. Non-2xx statuses come back as
//! data; only failures to build, send, or read produce an `HttpError`.
//!
//! The response body is drained through a `BodyGuard`. Dropping the guard
//! releases the connection whether or not the read finished; a guard dropped
//! before reaching the end of the body logs a warning and otherwise leaves the
//! caller's result alone.

use tracing::{debug, warn};
use ureq::http::{Method, Request, Uri};

use crate::config::ClientConfig;
use crate::error::HttpError;
use crate::http::{Credentials, HttpMethod, HttpRequest, HttpResponse};

/// Buffered body plus response metadata, or the reason there is neither.
pub type HttpResult = Result<(Vec<u8>, HttpResponse), HttpError>;

/// Stateless request helper bound to a configuration.
#[derive(Debug, Clone, Default)]
pub struct JsonClient {
    config: ClientConfig,
}

impl JsonClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn get(&self, url: &str) -> HttpResult {
        self.execute(HttpRequest::new(HttpMethod::Get, url, None))
    }

    pub fn get_with_basic_auth(&self, url: &str, username: &str, password: &str) -> HttpResult {
        self.execute(
            HttpRequest::new(HttpMethod::Get, url, None)
                .with_credentials(&Credentials::basic(username, password)),
        )
    }

    pub fn get_with_bearer(&self, url: &str, token: &str) -> HttpResult {
        self.execute(HttpRequest::new(HttpMethod::Get, url, None).with_credentials(&Credentials::bearer(token)))
    }

    /// Bearer GET for APIs that need `ConsistencyLevel: eventual` on advanced
    /// queries. Sends no `Accept: application/json`.
    pub fn get_with_bearer_graph(&self, url: &str, token: &str) -> HttpResult {
        self.execute(
            HttpRequest::new(HttpMethod::Get, url, None)
                .with_eventual_consistency()
                .with_credentials(&Credentials::bearer(token)),
        )
    }

    pub fn post(&self, url: &str, body: &[u8]) -> HttpResult {
        self.send(HttpMethod::Post, url, body, &Credentials::None)
    }

    pub fn post_with_basic_auth(&self, url: &str, body: &[u8], username: &str, password: &str) -> HttpResult {
        self.send(HttpMethod::Post, url, body, &Credentials::basic(username, password))
    }

    pub fn post_with_bearer(&self, url: &str, body: &[u8], token: &str) -> HttpResult {
        self.send(HttpMethod::Post, url, body, &Credentials::bearer(token))
    }

    pub fn put(&self, url: &str, body: &[u8]) -> HttpResult {
        self.send(HttpMethod::Put, url, body, &Credentials::None)
    }

    pub fn put_with_basic_auth(&self, url: &str, body: &[u8], username: &str, password: &str) -> HttpResult {
        self.send(HttpMethod::Put, url, body, &Credentials::basic(username, password))
    }

    pub fn put_with_bearer(&self, url: &str, body: &[u8], token: &str) -> HttpResult {
        self.send(HttpMethod::Put, url, body, &Credentials::bearer(token))
    }

    pub fn patch(&self, url: &str, body: &[u8]) -> HttpResult {
        self.send(HttpMethod::Patch, url, body, &Credentials::None)
    }

    pub fn patch_with_basic_auth(&self, url: &str, body: &[u8], username: &str, password: &str) -> HttpResult {
        self.send(HttpMethod::Patch, url, body, &Credentials::basic(username, password))
    }

    pub fn patch_with_bearer(&self, url: &str, body: &[u8], token: &str) -> HttpResult {
        self.send(HttpMethod::Patch, url, body, &Credentials::bearer(token))
    }

    fn send(&self, method: HttpMethod, url: &str, body: &[u8], credentials: &Credentials) -> HttpResult {
        self.execute(HttpRequest::new(method, url, Some(body)).with_credentials(credentials))
    }

    /// Run one request end to end: validate, send, drain the body.
    ///
    /// A body-read failure discards the response metadata even though a
    /// status line was received.
    pub fn execute(&self, request: HttpRequest) -> HttpResult {
        let uri = parse_url(&request.url)?;
        let agent = self.agent();

        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let sent = match request.body.as_deref() {
            Some(body) => agent.run(to_transport(&request, uri, body)?),
            None => agent.run(to_transport(&request, uri, ())?),
        };
        let response = sent.map_err(|source| match source {
            ureq::Error::BadUri(msg) => HttpError::InvalidRequest(msg),
            ureq::Error::Http(e) => HttpError::InvalidRequest(e.to_string()),
            source => HttpError::Transport {
                url: request.url.clone(),
                source,
            },
        })?;

        let (parts, body) = response.into_parts();
        let mut guard = BodyGuard::new(body, &request.url);
        let bytes = guard.read_all().map_err(|source| HttpError::BodyRead {
            url: request.url.clone(),
            source,
        })?;

        let meta = HttpResponse {
            status: parts.status.as_u16(),
            headers: parts
                .headers
                .iter()
                .map(|(name, value)| {
                    (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
                })
                .collect(),
        };
        debug!(status = meta.status, bytes = bytes.len(), url = %request.url, "response received");
        Ok((bytes, meta))
    }

    fn agent(&self) -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(self.config.timeout))
            .build()
            .new_agent()
    }
}

/// Reject URLs the transport could never dial.
fn parse_url(url: &str) -> Result<Uri, HttpError> {
    if url.is_empty() {
        return Err(HttpError::InvalidRequest("empty url".to_string()));
    }
    let uri: Uri = url
        .parse()
        .map_err(|e| HttpError::InvalidRequest(format!("malformed url {url:?}: {e}")))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(HttpError::InvalidRequest(format!("url {url:?} has no scheme or host")));
    }
    Ok(uri)
}

fn to_transport<B>(request: &HttpRequest, uri: Uri, body: B) -> Result<Request<B>, HttpError> {
    let method = match request.method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
    };
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(body)
        .map_err(|e| HttpError::InvalidRequest(e.to_string()))
}

/// Owns the response body until it has been read or the call unwinds.
struct BodyGuard<'a> {
    body: ureq::Body,
    url: &'a str,
    drained: bool,
}

impl<'a> BodyGuard<'a> {
    fn new(body: ureq::Body, url: &'a str) -> Self {
        Self {
            body,
            url,
            drained: false,
        }
    }

    fn read_all(&mut self) -> Result<Vec<u8>, ureq::Error> {
        let bytes = self.body.with_config().limit(u64::MAX).read_to_vec()?;
        self.drained = true;
        Ok(bytes)
    }
}

impl Drop for BodyGuard<'_> {
    fn drop(&mut self) {
        if !self.drained {
            warn!(url = self.url, "response body released before it was fully read");
        }
    }
}

// ---------------------------------------------------------------------------
// Free functions using the default configuration
// ---------------------------------------------------------------------------

pub fn get(url: &str) -> HttpResult {
    JsonClient::default().get(url)
}

pub fn get_with_basic_auth(url: &str, username: &str, password: &str) -> HttpResult {
    JsonClient::default().get_with_basic_auth(url, username, password)
}

pub fn get_with_bearer(url: &str, token: &str) -> HttpResult {
    JsonClient::default().get_with_bearer(url, token)
}

pub fn get_with_bearer_graph(url: &str, token: &str) -> HttpResult {
    JsonClient::default().get_with_bearer_graph(url, token)
}

pub fn post(url: &str, body: &[u8]) -> HttpResult {
    JsonClient::default().post(url, body)
}

pub fn post_with_basic_auth(url: &str, body: &[u8], username: &str, password: &str) -> HttpResult {
    JsonClient::default().post_with_basic_auth(url, body, username, password)
}

pub fn post_with_bearer(url: &str, body: &[u8], token: &str) -> HttpResult {
    JsonClient::default().post_with_bearer(url, body, token)
}

pub fn put(url: &str, body: &[u8]) -> HttpResult {
    JsonClient::default().put(url, body)
}

pub fn put_with_basic_auth(url: &str, body: &[u8], username: &str, password: &str) -> HttpResult {
    JsonClient::default().put_with_basic_auth(url, body, username, password)
}

pub fn put_with_bearer(url: &str, body: &[u8], token: &str) -> HttpResult {
    JsonClient::default().put_with_bearer(url, body, token)
}

pub fn patch(url: &str, body: &[u8]) -> HttpResult {
    JsonClient::default().patch(url, body)
}

pub fn patch_with_basic_auth(url: &str, body: &[u8], username: &str, password: &str) -> HttpResult {
    JsonClient::default().patch_with_basic_auth(url, body, username, password)
}

pub fn patch_with_bearer(url: &str, body: &[u8], token: &str) -> HttpResult {
    JsonClient::default().patch_with_bearer(url, body, token)
}
