//! # HTTP collaborator.
//!
//! Workers never talk to `reqwest` directly; they go through two seams:
//!
//! - [`HttpAgent`]: one cookie session; sends an [`ApiRequest`] and returns the raw
//!   response. Transport only: status codes are not interpreted here.
//! - [`Connector`]: creates one agent per simulated user.
//!
//! [`request`] layers the status-code contract on top of an agent, and the typed
//! wrappers in [`endpoints`] cover every remote path the load engine uses.
//!
//! ```text
//!   worker ──► endpoints::register_courses ──► request(.., acceptable) ──► HttpAgent::send
//!                                                   │                           │
//!                                     unexpected status → LoadError::Http   ReqwestAgent
//!                                                                          (or a test fake)
//! ```

pub mod endpoints;
mod link;
mod client;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::LoadError;

pub use link::{Links, parse_link_header};
pub use client::{ReqwestAgent, ReqwestConnector};

/// HTTP method subset used by the target API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// Request payload.
#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    /// `multipart/form-data` with a single file part.
    Multipart {
        field: &'static str,
        file_name: String,
        content_type: String,
        data: Vec<u8>,
    },
}

/// A request relative to the agent's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path plus optional query string, e.g. `/api/announcements?page=2`.
    pub path: String,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, body: Body) -> Self {
        Self {
            method,
            path: path.into(),
            body,
        }
    }

    /// Short `METHOD path` description for error messages.
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Fully read response.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Header pairs; names are compared case-insensitively.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json(mut self, value: &serde_json::Value) -> Self {
        self.body = value.to_string().into_bytes();
        self.headers
            .push(("content-type".into(), "application/json".into()));
        self
    }

    /// All values of header `name`, in arrival order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One cookie session against the target.
#[async_trait]
pub trait HttpAgent: Send + Sync + 'static {
    /// Sends the request and reads the whole body.
    ///
    /// Returns [`LoadError::Timeout`] when the per-request deadline expires and
    /// [`LoadError::Http`] for other transport failures.
    async fn send(&self, req: ApiRequest) -> Result<RawResponse, LoadError>;
}

/// Creates one agent per simulated user.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self) -> Result<Arc<dyn HttpAgent>, LoadError>;
}

/// Sends a request and enforces the acceptable status codes.
///
/// An unexpected status becomes [`LoadError::Http`] naming the method and path; the
/// body has already been drained by the agent.
pub async fn request(
    agent: &dyn HttpAgent,
    method: Method,
    path: impl Into<String>,
    body: Body,
    acceptable: &[u16],
) -> Result<RawResponse, LoadError> {
    let req = ApiRequest::new(method, path, body);
    let what = req.describe();
    let res = agent.send(req).await?;
    if !acceptable.contains(&res.status) {
        return Err(LoadError::http(format!(
            "unexpected status {} ({what})",
            res.status
        )));
    }
    Ok(res)
}

/// Decodes a JSON body; malformed bodies become [`LoadError::Http`].
pub fn decode<T: DeserializeOwned>(res: &RawResponse, what: &str) -> Result<T, LoadError> {
    serde_json::from_slice(&res.body)
        .map_err(|e| LoadError::http(format!("malformed JSON body ({what}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u16);

    #[async_trait]
    impl HttpAgent for Fixed {
        async fn send(&self, _req: ApiRequest) -> Result<RawResponse, LoadError> {
            Ok(RawResponse::new(self.0).with_json(&serde_json::json!({"id": "c-1"})))
        }
    }

    #[tokio::test]
    async fn unexpected_status_is_http_error() {
        let err = request(&Fixed(500), Method::Get, "/api/courses", Body::Empty, &[200])
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "load_http");
        assert!(err.as_message().contains("GET /api/courses"));
    }

    #[tokio::test]
    async fn acceptable_status_decodes() {
        #[derive(serde::Deserialize)]
        struct Id {
            id: String,
        }
        let res = request(&Fixed(201), Method::Post, "/api/courses", Body::Empty, &[201])
            .await
            .unwrap();
        let id: Id = decode(&res, "POST /api/courses").unwrap();
        assert_eq!(id.id, "c-1");
        assert!(decode::<Vec<u8>>(&res, "POST /api/courses").is_err());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let res = RawResponse::new(200)
            .with_header("Link", "<a>; rel=\"next\"")
            .with_header("link", "<b>; rel=\"prev\"");
        assert_eq!(res.header_values("LINK").count(), 2);
    }
}
