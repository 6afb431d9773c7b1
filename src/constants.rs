//! Constants for the Bitpanda wallet integration
//!
//! Endpoints, timings and configuration keys live here. The only runtime
//! configuration is the config entry handed over by the host.

use std::time::Duration;

/// Integration domain, used as prefix for sensor unique ids
pub const DOMAIN: &str = "bitpanda_wallets";

/// Human readable integration name
pub const INTEGRATION_NAME: &str = "Bitpanda Wallets";

/// Config entry key for the API key
pub const CONF_API_KEY: &str = "api_key";

/// Config entry key for the fiat currency
pub const CONF_CURRENCY: &str = "currency";

/// Config entry key for the selected wallet types
pub const CONF_WALLET: &str = "wallet";

/// Bitpanda public API base URL
pub const API_BASE_URL: &str = "https://api.bitpanda.com/v1";

/// Endpoint for asset wallets (stocks, indices, metals, crypto, ETFs)
pub const ASSET_WALLETS_ENDPOINT: &str = "/asset-wallets";

/// Endpoint for fiat wallets
pub const FIAT_WALLETS_ENDPOINT: &str = "/fiatwallets";

/// Endpoint for the public ticker table (no authentication)
pub const TICKER_ENDPOINT: &str = "/ticker";

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// How often wallet balances are polled (in seconds)
pub const UPDATE_INTERVAL_SECS: u64 = 300;

/// How often wallet balances are polled
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(UPDATE_INTERVAL_SECS);

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Number of poll samples kept for metrics
pub const METRICS_WINDOW: usize = 100;

/// Capacity of the tracker event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// User agent for HTTP requests
pub const USER_AGENT: &str = concat!("bitpanda-wallets/", env!("CARGO_PKG_VERSION"));
