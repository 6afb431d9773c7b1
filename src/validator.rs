//! API key validation used by the configuration step

use crate::{
    constants::{API_BASE_URL, ASSET_WALLETS_ENDPOINT},
    http::{HttpClient, HttpRequest},
    providers::bitpanda::auth_headers,
};
use std::sync::Arc;

/// Checks an API key with a single authenticated request
///
/// Network failures and rejected keys both read as an invalid key.
pub struct CredentialValidator {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl CredentialValidator {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self::with_base_url(http, API_BASE_URL)
    }

    pub fn with_base_url(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// True only for HTTP 200 with a JSON body that has a top-level `data` field
    pub async fn validate(&self, api_key: &str) -> bool {
        let url = format!("{}{}", self.base_url, ASSET_WALLETS_ENDPOINT);
        tracing::debug!(url = %url, "Testing API key");

        let request = auth_headers(HttpRequest::get(url), api_key);
        let response = match self.http.get(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "API key validation error");
                return false;
            }
        };

        tracing::debug!(
            status = response.status,
            body = %response.body,
            "API key test response"
        );

        match response.status {
            200 => match serde_json::from_str::<serde_json::Value>(&response.body) {
                Ok(body) if body.get("data").is_some() => true,
                Ok(body) => {
                    tracing::error!(body = %body, "Unexpected response data");
                    false
                }
                Err(e) => {
                    tracing::error!(error = %e, "API key test returned invalid JSON");
                    false
                }
            },
            401 => {
                tracing::error!("Unauthorized access - invalid API key");
                false
            }
            status => {
                tracing::error!(status, "Unexpected response status");
                false
            }
        }
    }
}
