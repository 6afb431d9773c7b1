//! HTTP transport seam
//!
//! The integration only needs "GET with headers, get back status + body".
//! Hosts with their own pooled session implement [`HttpClient`]; everyone else
//! uses [`ReqwestHttpClient`].

use crate::constants::{REQUEST_TIMEOUT_SECS, USER_AGENT};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Outgoing GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response: status code and body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract used by the provider and the credential validator
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Production transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Creates a client with the integration's timeout and user agent
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::new(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wraps an existing reqwest client (e.g. the host's pooled session)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::new(format!("request timeout: {e}"))
            } else if e.is_connect() {
                HttpError::new(format!("connection failed: {e}"))
            } else {
                HttpError::new(format!("request failed: {e}"))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| HttpError::new(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory transport keyed by URL path suffix
    #[derive(Clone, Default)]
    pub struct MockHttpClient {
        routes: Arc<Mutex<HashMap<String, Result<HttpResponse, HttpError>>>>,
        requests: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, path: &str, status: u16, body: &str) {
            self.routes
                .lock()
                .unwrap()
                .insert(path.to_string(), Ok(HttpResponse::new(status, body)));
        }

        pub fn fail(&self, path: &str, message: &str) {
            self.routes
                .lock()
                .unwrap()
                .insert(path.to_string(), Err(HttpError::new(message)));
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn call_count(&self, path: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.url.ends_with(path))
                .count()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            self.requests.lock().unwrap().push(request.clone());
            let routes = self.routes.lock().unwrap();
            routes
                .iter()
                .find(|(path, _)| request.url.ends_with(path.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "")))
        }
    }
}
