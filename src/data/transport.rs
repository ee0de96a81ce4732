//! HTTP transport used by the source adapters.
//!
//! Adapters only ever issue plain GETs and only care about the status and the
//! body text, so the seam is a one-method trait. The production implementation
//! is a blocking `reqwest` client that never follows redirects (a redirect on
//! these sites usually lands on an unrelated page) and bounds every request
//! with a timeout.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use thiserror::Error;

use crate::error::AppError;

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

/// Failure to obtain any HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to read response body: {0}")]
    Body(String),
}

pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// Blocking `reqwest` transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        tracing::debug!(url, "fetching");

        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Ok(HttpResponse::status(status));
        }

        let body = resp.text().map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) use canned::CannedTransport;

#[cfg(test)]
mod canned {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{HttpResponse, Transport, TransportError};

    /// Serves fixed responses by exact URL; unknown URLs answer 404.
    #[derive(Debug, Default)]
    pub(crate) struct CannedTransport {
        pages: HashMap<String, Result<HttpResponse, TransportError>>,
        hits: Mutex<Vec<String>>,
    }

    impl CannedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), Ok(HttpResponse::ok(body)));
            self
        }

        pub(crate) fn status(mut self, url: &str, status: u16) -> Self {
            self.pages.insert(url.to_string(), Ok(HttpResponse::status(status)));
            self
        }

        pub(crate) fn failure(mut self, url: &str, err: TransportError) -> Self {
            self.pages.insert(url.to_string(), Err(err));
            self
        }

        pub(crate) fn hits(&self) -> Vec<String> {
            self.hits.lock().unwrap().clone()
        }
    }

    impl Transport for CannedTransport {
        fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.hits.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::status(404)))
        }
    }
}
