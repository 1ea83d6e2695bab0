//! Small blocking helpers for talking JSON over HTTP.
//!
//! # Overview
//! Thirteen operations cover GET, POST, PUT and PATCH, each without auth,
//! with HTTP Basic auth, and with a bearer token, plus a bearer GET that
//! sends `ConsistencyLevel: eventual`. Every call returns the fully buffered
//! body together with the response metadata.
//!
//! # Design
//! - `http` assembles requests as plain data; `client` performs the I/O.
//! - Each call builds its own transport agent; nothing is pooled or shared.
//! - Requests time out after 29 seconds unless a `ClientConfig` says
//!   otherwise. The free functions always use the default.
//! - Non-2xx responses are returned, not raised.
//! - If the body cannot be read, the metadata is dropped too and the
//!   premature release of the body is logged as a warning.
//!
//! ```no_run
//! let (body, response) = easyhttp_core::post("http://localhost:3000/echo", br#"{"a":1}"#)?;
//! assert_eq!(response.status, 200);
//! assert_eq!(body, br#"{"a":1}"#);
//! # Ok::<(), easyhttp_core::HttpError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;

pub use client::{
    get, get_with_basic_auth, get_with_bearer, get_with_bearer_graph, patch, patch_with_basic_auth,
    patch_with_bearer, post, post_with_basic_auth, post_with_bearer, put, put_with_basic_auth, put_with_bearer,
    HttpResult, JsonClient,
};
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use error::HttpError;
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse};
