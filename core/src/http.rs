//! HTTP request and response types described as plain data.
//!
//! # Design
//! Header assembly lives here and touches no network, so every verb and auth
//! combination can be checked in unit tests. `client` turns an `HttpRequest`
//! into a transport request and an incoming response head into an
//! `HttpResponse`.

use base64::{engine::general_purpose::STANDARD, Engine};

pub const CONTENT_TYPE: &str = "Content-type";
pub const ACCEPT: &str = "Accept";
pub const AUTHORIZATION: &str = "Authorization";
pub const CONSISTENCY_LEVEL: &str = "ConsistencyLevel";

pub const APPLICATION_JSON: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// How a request authenticates itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    Basic { username: String, password: String },
    Bearer(String),
}

impl Credentials {
    pub fn basic(username: &str, password: &str) -> Self {
        Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn bearer(token: &str) -> Self {
        Credentials::Bearer(token.to_string())
    }

    /// Value for the `Authorization` header, if any.
    pub fn authorization(&self) -> Option<String> {
        match self {
            Credentials::None => None,
            Credentials::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                Some(format!("Basic {encoded}"))
            }
            Credentials::Bearer(token) => Some(format!("Bearer {token}")),
        }
    }
}

/// A single outgoing request. Built fresh for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Every request declares a JSON content type; GETs also ask for JSON back.
    pub fn new(method: HttpMethod, url: &str, body: Option<&[u8]>) -> Self {
        let mut headers = vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())];
        if method == HttpMethod::Get {
            headers.push((ACCEPT.to_string(), APPLICATION_JSON.to_string()));
        }
        Self {
            method,
            url: url.to_string(),
            headers,
            body: body.map(<[u8]>::to_vec),
        }
    }

    pub fn with_credentials(mut self, credentials: &Credentials) -> Self {
        if let Some(value) = credentials.authorization() {
            self.set_header(AUTHORIZATION, &value);
        }
        self
    }

    /// Trade `Accept: application/json` for `ConsistencyLevel: eventual`, as
    /// required by directory APIs that serve advanced queries from replicas.
    pub fn with_eventual_consistency(mut self) -> Self {
        self.headers.retain(|(name, _)| !name.eq_ignore_ascii_case(ACCEPT));
        self.set_header(CONSISTENCY_LEVEL, "eventual");
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }
}

/// Response metadata. The body travels next to it, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup; returns the first value.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
