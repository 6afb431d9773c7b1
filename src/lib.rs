//! # Bitpanda Wallets
//!
//! Polls the Bitpanda REST API and exposes one balance sensor per wallet type
//! (fiat, stocks, indices, metals, cryptocoins, ETFs) to a home-automation host.
//!
//! The host supplies three things: an [`HttpClient`] for GET requests, a
//! [`SensorSink`] receiving published values, and the persisted
//! [`ConfigEntry`]. Everything else runs on tokio.
//!
//! ```no_run
//! use bitpanda_wallets::{ConfigEntry, ReqwestHttpClient, SensorSink, SensorState, WalletIntegration};
//! use std::sync::Arc;
//!
//! struct PrintSink;
//!
//! impl SensorSink for PrintSink {
//!     fn publish(&self, state: &SensorState) {
//!         println!("{} = {:.2} {}", state.name, state.value, state.unit);
//!     }
//! }
//!
//! # async fn example(entry: ConfigEntry) -> Result<(), Box<dyn std::error::Error>> {
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! let mut integration = WalletIntegration::new(http, Arc::new(PrintSink));
//! let sensors = integration.setup(entry).await?;
//! println!("{} sensors loaded", sensors.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! CredentialValidator (config step, once)
//!     ↓
//! WalletIntegration::setup
//!     ↓
//! WalletTracker (ticks every 5 minutes)
//!     ↓  ticker table, then wallet types concurrently
//! BitpandaProvider → normalize → PollResult
//!     ↓
//! SnapshotStore → SensorPublisher → SensorSink
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod integration;
pub mod metrics;
pub mod normalize;
pub mod provider;
pub mod providers;
pub mod sensor;
pub mod store;
pub mod tracker;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use config::{create_entry, ConfigEntry, Credentials, EntryData, EntryOptions, UserInput};
pub use error::{ConfigError, ProviderError, SetupError, UpdateFailed};
pub use http::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use integration::WalletIntegration;
pub use metrics::PollMetrics;
pub use sensor::{SensorSink, SensorState, WalletSensor};
pub use tracker::WalletTracker;
pub use types::{
    ComponentHealth, Currency, HealthStatus, PollResult, WalletEntry, WalletEvent, WalletType,
    WalletTypeSnapshot,
};
pub use validator::CredentialValidator;
