//! Types for the Bitpanda wallet integration

use crate::constants::{ASSET_WALLETS_ENDPOINT, FIAT_WALLETS_ENDPOINT};
use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Supported fiat currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro
    #[default]
    EUR,
    /// US Dollar
    USD,
    /// Swiss Franc
    CHF,
}

impl Currency {
    /// ISO code as used by the API
    pub fn code(&self) -> &'static str {
        match self {
            Currency::EUR => "EUR",
            Currency::USD => "USD",
            Currency::CHF => "CHF",
        }
    }

    /// Get all supported currencies
    pub fn all() -> &'static [Currency] {
        &[Currency::EUR, Currency::USD, Currency::CHF]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::all()
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnsupportedCurrency(s.to_string()))
    }
}

/// Which API endpoint serves a wallet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletEndpoint {
    Fiat,
    Asset,
}

impl WalletEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            WalletEndpoint::Fiat => FIAT_WALLETS_ENDPOINT,
            WalletEndpoint::Asset => ASSET_WALLETS_ENDPOINT,
        }
    }
}

/// Category of holdings
///
/// Identifiers outside the fixed set are kept as [`WalletType::Other`] so a
/// stale selection degrades to an empty snapshot instead of failing the poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WalletType {
    Fiat,
    Stock,
    Index,
    Metal,
    Cryptocoin,
    Etf,
    Other(String),
}

impl WalletType {
    /// Identifier as stored in the config entry
    pub fn as_str(&self) -> &str {
        match self {
            WalletType::Fiat => "FIAT",
            WalletType::Stock => "STOCK",
            WalletType::Index => "INDEX",
            WalletType::Metal => "METAL",
            WalletType::Cryptocoin => "CRYPTOCOIN",
            WalletType::Etf => "ETF",
            WalletType::Other(id) => id,
        }
    }

    /// The six supported wallet types
    pub fn all() -> [WalletType; 6] {
        [
            WalletType::Fiat,
            WalletType::Stock,
            WalletType::Index,
            WalletType::Metal,
            WalletType::Cryptocoin,
            WalletType::Etf,
        ]
    }

    /// Endpoint serving this wallet type; `None` for unknown identifiers
    pub fn endpoint(&self) -> Option<WalletEndpoint> {
        match self {
            WalletType::Fiat => Some(WalletEndpoint::Fiat),
            WalletType::Other(_) => None,
            _ => Some(WalletEndpoint::Asset),
        }
    }

    /// Sub-key of the asset-wallets response holding this type's collection
    pub fn sub_key(&self) -> String {
        self.as_str().to_lowercase()
    }

    /// Wallet attribute carrying the asset symbol, e.g. `cryptocoin_symbol`
    pub fn symbol_key(&self) -> String {
        format!("{}_symbol", self.sub_key())
    }

    /// True for the asset types that expose a per-wallet breakdown
    pub fn has_holdings(&self) -> bool {
        matches!(
            self,
            WalletType::Stock
                | WalletType::Index
                | WalletType::Metal
                | WalletType::Cryptocoin
                | WalletType::Etf
        )
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, WalletType::Other(_))
    }
}

impl From<String> for WalletType {
    fn from(id: String) -> Self {
        match id.trim().to_uppercase().as_str() {
            "FIAT" => WalletType::Fiat,
            "STOCK" => WalletType::Stock,
            "INDEX" => WalletType::Index,
            "METAL" => WalletType::Metal,
            "CRYPTOCOIN" => WalletType::Cryptocoin,
            "ETF" => WalletType::Etf,
            _ => WalletType::Other(id),
        }
    }
}

impl From<&str> for WalletType {
    fn from(id: &str) -> Self {
        WalletType::from(id.to_string())
    }
}

impl From<WalletType> for String {
    fn from(wallet_type: WalletType) -> Self {
        wallet_type.as_str().to_string()
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange rates: asset symbol -> fiat symbol -> rate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerTable {
    rates: HashMap<String, HashMap<String, f64>>,
}

impl TickerTable {
    pub fn new(rates: HashMap<String, HashMap<String, f64>>) -> Self {
        Self { rates }
    }

    /// Rate of `symbol` in `currency`, `None` when either is missing
    pub fn rate(&self, symbol: &str, currency: Currency) -> Option<f64> {
        self.rates
            .get(symbol)
            .and_then(|quotes| quotes.get(currency.code()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// A single holding inside a wallet type
#[derive(Debug, Clone, PartialEq)]
pub struct WalletEntry {
    pub name: String,
    /// Amount in the asset's own unit, always > 0
    pub balance_token: f64,
    /// Converted value, rounded to 2 decimals
    pub balance_fiat: f64,
    /// Fiat currency of `balance_fiat`
    pub fiat: Currency,
    /// Asset symbol, e.g. `BTC`
    pub currency: String,
}

impl WalletEntry {
    /// Attribute name of the converted balance, e.g. `balance_eur`
    pub fn fiat_balance_key(&self) -> String {
        format!("balance_{}", self.fiat.code().to_lowercase())
    }
}

impl Serialize for WalletEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("balance_token", &self.balance_token)?;
        map.serialize_entry(&self.fiat_balance_key(), &self.balance_fiat)?;
        map.serialize_entry("currency", &self.currency)?;
        map.end()
    }
}

/// Aggregated balance of one wallet type
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WalletTypeSnapshot {
    /// Sum of converted balances, accumulated before rounding
    pub total_balance: f64,
    pub wallets: Vec<WalletEntry>,
    /// Some value fell back to zero (unknown type, missing sub-key or rate)
    #[serde(skip)]
    pub degraded: bool,
}

impl WalletTypeSnapshot {
    pub fn new(total_balance: f64, wallets: Vec<WalletEntry>) -> Self {
        Self {
            total_balance,
            wallets,
            degraded: false,
        }
    }

    /// Zero balance placeholder for a type the API had nothing for
    pub fn empty_degraded() -> Self {
        Self {
            total_balance: 0.0,
            wallets: Vec::new(),
            degraded: true,
        }
    }
}

/// Result of one successful poll tick, published as a whole
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollResult {
    pub snapshots: BTreeMap<WalletType, WalletTypeSnapshot>,
    pub last_updated: DateTime<Utc>,
}

impl PollResult {
    pub fn new(snapshots: BTreeMap<WalletType, WalletTypeSnapshot>) -> Self {
        Self {
            snapshots,
            last_updated: Utc::now(),
        }
    }

    pub fn get(&self, wallet_type: &WalletType) -> Option<&WalletTypeSnapshot> {
        self.snapshots.get(wallet_type)
    }

    pub fn contains(&self, wallet_type: &WalletType) -> bool {
        self.snapshots.contains_key(wallet_type)
    }

    pub fn is_degraded(&self) -> bool {
        self.snapshots.values().any(|s| s.degraded)
    }
}

/// Events emitted by the tracker after every tick
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletEvent {
    /// A new poll result replaced the previous one
    SnapshotPublished {
        id: Uuid,
        wallet_types: Vec<WalletType>,
        degraded: bool,
        timestamp: DateTime<Utc>,
    },

    /// A poll tick failed; previous values are stale
    PollFailed {
        id: Uuid,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl WalletEvent {
    pub fn published(result: &PollResult) -> Self {
        WalletEvent::SnapshotPublished {
            id: Uuid::new_v4(),
            wallet_types: result.snapshots.keys().cloned().collect(),
            degraded: result.is_degraded(),
            timestamp: result.last_updated,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        WalletEvent::PollFailed {
            id: Uuid::new_v4(),
            error_message: error_message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            WalletEvent::SnapshotPublished { id, .. } => *id,
            WalletEvent::PollFailed { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            WalletEvent::SnapshotPublished { .. } => "SNAPSHOT_PUBLISHED",
            WalletEvent::PollFailed { .. } => "POLL_FAILED",
        }
    }
}

impl fmt::Display for WalletEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletEvent::SnapshotPublished { wallet_types, .. } => {
                write!(f, "Snapshot published for {} wallet types", wallet_types.len())
            }
            WalletEvent::PollFailed { error_message, .. } => {
                write!(f, "Poll failed: {}", error_message)
            }
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Latest poll succeeded with complete data
    Healthy,
    /// Serving data, but the last poll failed or some values fell back to zero
    Degraded,
    /// No data has been received yet
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
