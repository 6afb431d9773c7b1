//! Response shapes and normalization into wallet snapshots
//!
//! Each endpoint gets a small typed parser. Shapes that do not match are
//! rejected with [`ProviderError::InvalidResponse`]; the only zero fallbacks
//! are a missing wallet-type collection and a missing ticker rate, both of
//! which mark the snapshot as degraded. Ticker quotes are the exception to
//! strict parsing: an unusable quote is dropped and behaves like a missing
//! rate.

use crate::{
    error::ProviderError,
    types::{Currency, TickerTable, WalletEntry, WalletType, WalletTypeSnapshot},
};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Finite numeric amount sent either as a JSON number or as a numeric string
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amount(pub f64);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        let value = match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Some(value),
            Raw::Text(text) => text.trim().parse::<f64>().ok(),
        };

        // `f64::from_str` accepts "NaN" and "inf"
        match value {
            Some(value) if value.is_finite() => Ok(Amount(value)),
            Some(value) => Err(de::Error::custom(format!("non-finite amount {value}"))),
            None => Err(de::Error::custom("amount is not a number")),
        }
    }
}

/// `GET /ticker`: asset symbol -> fiat symbol -> rate
///
/// Only the top level must be an object. Quotes are parsed one by one when
/// the table is built, so a bad quote for one asset never fails the tick.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct TickerResponse(Map<String, Value>);

impl From<TickerResponse> for TickerTable {
    fn from(response: TickerResponse) -> Self {
        let mut rates = HashMap::with_capacity(response.0.len());

        for (symbol, quotes) in response.0 {
            let Value::Object(quotes) = quotes else {
                tracing::debug!(symbol = %symbol, "Dropping ticker entry that is not an object");
                continue;
            };

            let quotes = quotes
                .into_iter()
                .filter_map(|(fiat, raw)| match Amount::deserialize(&raw) {
                    Ok(amount) => Some((fiat, amount.0)),
                    Err(e) => {
                        tracing::debug!(symbol = %symbol, fiat = %fiat, error = %e, "Dropping ticker quote");
                        None
                    }
                })
                .collect();
            rates.insert(symbol, quotes);
        }

        TickerTable::new(rates)
    }
}

/// `GET /fiatwallets`
#[derive(Debug, Deserialize)]
pub struct FiatWalletsResponse {
    pub data: Vec<FiatWallet>,
}

#[derive(Debug, Deserialize)]
pub struct FiatWallet {
    pub attributes: FiatWalletAttributes,
}

#[derive(Debug, Deserialize)]
pub struct FiatWalletAttributes {
    #[serde(default)]
    pub fiat_symbol: String,
    pub balance: Amount,
    #[serde(default)]
    pub name: String,
}

/// `GET /asset-wallets`
///
/// The attribute tree groups collections by wallet type, sometimes one level
/// deeper under a grouping key (`commodity`, `security`), so it is kept as raw
/// JSON and searched per wallet type.
#[derive(Debug, Deserialize)]
pub struct AssetWalletsResponse {
    pub data: AssetWalletsData,
}

#[derive(Debug, Deserialize)]
pub struct AssetWalletsData {
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct WalletCollection {
    attributes: WalletCollectionAttributes,
}

#[derive(Debug, Deserialize)]
struct WalletCollectionAttributes {
    wallets: Vec<AssetWallet>,
}

#[derive(Debug, Deserialize)]
struct AssetWallet {
    attributes: AssetWalletAttributes,
}

#[derive(Debug, Deserialize)]
struct AssetWalletAttributes {
    #[serde(default)]
    name: String,
    balance: Amount,
    #[serde(flatten)]
    fields: HashMap<String, Value>,
}

impl AssetWalletAttributes {
    fn symbol(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or_default()
    }
}

/// Parses a JSON body, naming the endpoint in the error
pub fn parse_json<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("Failed to parse {endpoint} response: {e}"))
    })
}

/// Rounds to 2 decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// FIAT balance: first wallet whose symbol matches the configured currency
pub fn fiat_snapshot(response: &FiatWalletsResponse, currency: Currency) -> WalletTypeSnapshot {
    let balance = response
        .data
        .iter()
        .map(|wallet| &wallet.attributes)
        .find(|attributes| attributes.fiat_symbol == currency.code())
        .map(|attributes| attributes.balance.0)
        .unwrap_or(0.0);

    WalletTypeSnapshot::new(balance, Vec::new())
}

/// Aggregates one asset wallet type, converting holdings with the ticker table
pub fn asset_snapshot(
    response: &AssetWalletsResponse,
    wallet_type: &WalletType,
    currency: Currency,
    ticker: &TickerTable,
) -> Result<WalletTypeSnapshot, ProviderError> {
    let sub_key = wallet_type.sub_key();
    let Some(raw) = find_collection(&response.data.attributes, &sub_key) else {
        if response.data.attributes.contains_key(&sub_key) {
            tracing::debug!(
                wallet_type = %wallet_type,
                sub_key = %sub_key,
                "Wallet type has no wallet collection, treating it as empty"
            );
            return Ok(WalletTypeSnapshot::default());
        }
        tracing::warn!(
            wallet_type = %wallet_type,
            sub_key = %sub_key,
            "Wallet type not found in asset wallets response"
        );
        return Ok(WalletTypeSnapshot::empty_degraded());
    };

    let collection: WalletCollection = serde_json::from_value(raw.clone()).map_err(|e| {
        ProviderError::invalid_response(format!("Malformed {sub_key} wallet collection: {e}"))
    })?;

    let symbol_key = wallet_type.symbol_key();
    let mut snapshot = WalletTypeSnapshot::default();

    for wallet in &collection.attributes.wallets {
        let attributes = &wallet.attributes;
        let balance_token = attributes.balance.0;
        if balance_token.is_nan() || balance_token <= 0.0 {
            continue;
        }

        let symbol = attributes.symbol(&symbol_key);
        let rate = match ticker.rate(symbol, currency) {
            Some(rate) => rate,
            None => {
                tracing::debug!(
                    symbol = %symbol,
                    currency = %currency,
                    "No ticker rate, valuing holding at zero"
                );
                snapshot.degraded = true;
                0.0
            }
        };

        let balance_converted = balance_token * rate;
        snapshot.total_balance += balance_converted;
        snapshot.wallets.push(WalletEntry {
            name: attributes.name.clone(),
            balance_token,
            balance_fiat: round2(balance_converted),
            fiat: currency,
            currency: symbol.to_string(),
        });
    }

    Ok(snapshot)
}

/// Depth-first search for a wallet collection stored under `key`
fn find_collection<'a>(tree: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(found) = tree.get(key).filter(|value| is_collection(value)) {
        return Some(found);
    }

    tree.values()
        .filter_map(Value::as_object)
        .find_map(|child| find_collection(child, key))
}

fn is_collection(value: &Value) -> bool {
    value
        .get("attributes")
        .and_then(|attributes| attributes.get("wallets"))
        .is_some()
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! JSON bodies shaped like the live API

    pub const TICKER: &str = r#"{
        "BTC": {"EUR": 50000, "USD": "54000.00", "CHF": "48000.00"},
        "XAU": {"EUR": "60.00", "USD": "65.00", "CHF": "58.00"}
    }"#;

    pub const FIAT_WALLETS: &str = r#"{
        "data": [
            {"type": "fiat_wallet", "attributes": {"fiat_id": "2", "fiat_symbol": "USD", "balance": "42.50", "name": "USD Wallet"}, "id": "f-2"},
            {"type": "fiat_wallet", "attributes": {"fiat_id": "1", "fiat_symbol": "EUR", "balance": "100.00", "name": "EUR Wallet"}, "id": "f-1"},
            {"type": "fiat_wallet", "attributes": {"fiat_id": "1", "fiat_symbol": "EUR", "balance": "7.00", "name": "EUR Savings"}, "id": "f-3"}
        ]
    }"#;

    pub const ASSET_WALLETS: &str = r#"{
        "data": {
            "type": "data",
            "attributes": {
                "cryptocoin": {
                    "type": "collection",
                    "attributes": {
                        "wallets": [
                            {"type": "wallet", "attributes": {"cryptocoin_symbol": "BTC", "balance": "0.01000000", "name": "BTC Wallet"}, "id": "w-1"},
                            {"type": "wallet", "attributes": {"cryptocoin_symbol": "ETH", "balance": "0.00000000", "name": "ETH Wallet"}, "id": "w-2"}
                        ]
                    }
                },
                "commodity": {
                    "metal": {
                        "type": "collection",
                        "attributes": {
                            "wallets": [
                                {"type": "wallet", "attributes": {"metal_symbol": "XAU", "balance": "2.5", "name": "Gold"}, "id": "w-3"},
                                {"type": "wallet", "attributes": {"metal_symbol": "XPD", "balance": "1.25", "name": "Palladium"}, "id": "w-4"}
                            ]
                        }
                    }
                }
            }
        }
    }"#;
}
