//! Bitpanda REST provider implementation

use crate::{
    constants::{
        API_BASE_URL, API_KEY_HEADER, ASSET_WALLETS_ENDPOINT, FIAT_WALLETS_ENDPOINT,
        TICKER_ENDPOINT,
    },
    error::ProviderError,
    http::{HttpClient, HttpRequest},
    normalize::{parse_json, AssetWalletsResponse, FiatWalletsResponse, TickerResponse},
    provider::WalletProvider,
    types::TickerTable,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Bitpanda provider bound to one API key
pub struct BitpandaProvider {
    http: Arc<dyn HttpClient>,
    base_url: String,
    api_key: String,
}

impl BitpandaProvider {
    /// Creates a provider against the public API
    pub fn new(http: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http, API_BASE_URL, api_key)
    }

    /// Creates a provider against a custom base URL
    pub fn with_base_url(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// GETs an endpoint and parses the JSON body; any non-2xx status fails
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        authenticated: bool,
    ) -> Result<T, ProviderError> {
        let url = self.url(endpoint);
        let mut request = HttpRequest::get(&url);
        if authenticated {
            request = auth_headers(request, &self.api_key);
        }

        tracing::debug!(url = %url, "Fetching from Bitpanda");
        let response = self.http.get(request).await?;
        tracing::debug!(
            endpoint = endpoint,
            status = response.status,
            body = %response.body,
            "Bitpanda response"
        );

        if !response.is_success() {
            return Err(ProviderError::http_status(endpoint, response.status));
        }

        parse_json(endpoint, &response.body)
    }
}

/// Adds the API key and JSON accept headers
pub(crate) fn auth_headers(request: HttpRequest, api_key: &str) -> HttpRequest {
    request
        .with_header(API_KEY_HEADER, api_key)
        .with_header("Accept", "application/json")
}

#[async_trait]
impl WalletProvider for BitpandaProvider {
    async fn fetch_ticker(&self) -> Result<TickerTable, ProviderError> {
        let ticker: TickerResponse = self.get_json(TICKER_ENDPOINT, false).await?;
        let ticker = TickerTable::from(ticker);
        tracing::debug!(symbols = ticker.len(), "Fetched ticker table");
        Ok(ticker)
    }

    async fn fetch_fiat_wallets(&self) -> Result<FiatWalletsResponse, ProviderError> {
        self.get_json(FIAT_WALLETS_ENDPOINT, true).await
    }

    async fn fetch_asset_wallets(&self) -> Result<AssetWalletsResponse, ProviderError> {
        self.get_json(ASSET_WALLETS_ENDPOINT, true).await
    }

    fn provider_name(&self) -> &'static str {
        "bitpanda"
    }
}
