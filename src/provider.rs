//! Provider abstraction for fetching wallet data from the exchange API

use crate::{
    error::ProviderError,
    normalize::{AssetWalletsResponse, FiatWalletsResponse},
    types::TickerTable,
};
use async_trait::async_trait;

/// Trait for wallet data providers
///
/// One call maps to exactly one HTTP request; retries are left to the next
/// poll tick.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Fetches the public ticker table (no authentication)
    async fn fetch_ticker(&self) -> Result<TickerTable, ProviderError>;

    /// Fetches the fiat wallets of the account
    async fn fetch_fiat_wallets(&self) -> Result<FiatWalletsResponse, ProviderError>;

    /// Fetches the asset wallets of the account, grouped by wallet type
    async fn fetch_asset_wallets(&self) -> Result<AssetWalletsResponse, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
