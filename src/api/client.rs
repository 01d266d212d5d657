//! `reqwest`-backed agents.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, multipart};

use super::{ApiRequest, Body, Connector, HttpAgent, Method, RawResponse};
use crate::{config::Config, error::LoadError};

const USER_AGENT: &str = concat!("courseload/", env!("CARGO_PKG_VERSION"));

/// Builds one cookie-holding client per user.
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    base_url: String,
    timeout: Option<Duration>,
}

impl ReqwestConnector {
    pub fn new(cfg: &Config) -> Self {
        Self {
            base_url: cfg.base_url(),
            timeout: cfg.request_timeout(),
        }
    }
}

impl Connector for ReqwestConnector {
    fn connect(&self) -> Result<Arc<dyn HttpAgent>, LoadError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT);
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| LoadError::critical(format!("failed to build http client: {e}")))?;
        Ok(Arc::new(ReqwestAgent {
            client,
            base_url: self.base_url.clone(),
            timeout: self.timeout.unwrap_or_default(),
        }))
    }
}

/// One user session.
#[derive(Debug)]
pub struct ReqwestAgent {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestAgent {
    fn map_err(&self, e: reqwest::Error, what: &str) -> LoadError {
        if e.is_timeout() {
            LoadError::Timeout {
                timeout: self.timeout,
            }
        } else {
            LoadError::http(format!("{what}: {e}"))
        }
    }
}

#[async_trait]
impl HttpAgent for ReqwestAgent {
    async fn send(&self, req: ApiRequest) -> Result<RawResponse, LoadError> {
        let what = req.describe();
        let url = format!("{}{}", self.base_url, req.path);
        let builder = match req.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
        };
        let builder = match req.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart {
                field,
                file_name,
                content_type,
                data,
            } => {
                let part = multipart::Part::bytes(data)
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|e| LoadError::critical(format!("{what}: bad mime type: {e}")))?;
                builder.multipart(multipart::Form::new().part(field, part))
            }
        };

        let res = builder.send().await.map_err(|e| self.map_err(e, &what))?;
        let status = res.status().as_u16();
        let headers = res
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        // read to the end so the connection can be reused
        let body = res.bytes().await.map_err(|e| self.map_err(e, &what))?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
