//! Sensor projection
//!
//! Turns the latest [`PollResult`] into one published state per wallet type.

use crate::{
    constants::{DOMAIN, INTEGRATION_NAME},
    error::UpdateFailed,
    normalize::round2,
    tracker::PollListener,
    types::{Currency, PollResult, WalletEntry, WalletType},
};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Host-side sink for published sensor values
pub trait SensorSink: Send + Sync {
    /// Publishes a new state for a sensor
    fn publish(&self, state: &SensorState);

    /// The last poll failed; the host keeps showing the previous value as stale
    fn mark_stale(&self, unique_id: &str, reason: &str) {
        let _ = (unique_id, reason);
    }
}

/// Extra attributes of a wallet sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorAttributes {
    /// ISO-8601 local time of the poll that produced the value
    pub last_update: String,
    /// ISO-8601 local time of the next scheduled poll
    pub next_update: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallets: Option<Vec<WalletEntry>>,
}

/// One published sensor value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub name: String,
    pub value: f64,
    pub unit: Currency,
    pub device_class: &'static str,
    pub state_class: &'static str,
    pub attributes: SensorAttributes,
}

/// Balance sensor for one wallet type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSensor {
    wallet_type: WalletType,
    currency: Currency,
    unique_id: String,
    name: String,
}

impl WalletSensor {
    pub fn new(wallet_type: WalletType, currency: Currency) -> Self {
        let cur = currency.code().to_lowercase();
        let (name, unique_id) = match wallet_type {
            WalletType::Fiat => (
                format!("{} Fiat {}", INTEGRATION_NAME, currency),
                format!("{}_fiat_{}", DOMAIN, cur),
            ),
            _ => (
                format!("{} {} {}", INTEGRATION_NAME, wallet_type, currency),
                format!("{}_{}_{}", DOMAIN, wallet_type.sub_key(), cur),
            ),
        };

        Self {
            wallet_type,
            currency,
            unique_id,
            name,
        }
    }

    /// Sensors for the selected types present in the first poll result
    ///
    /// Types missing from the result get no sensor.
    pub fn for_result<'a>(
        selected: impl IntoIterator<Item = &'a WalletType>,
        currency: Currency,
        result: &PollResult,
    ) -> Vec<WalletSensor> {
        selected
            .into_iter()
            .filter(|wallet_type| {
                let present = result.contains(wallet_type);
                if !present {
                    tracing::warn!(wallet_type = %wallet_type, "Wallet not found in Bitpanda API data");
                }
                present
            })
            .map(|wallet_type| WalletSensor::new(wallet_type.clone(), currency))
            .collect()
    }

    pub fn wallet_type(&self) -> &WalletType {
        &self.wallet_type
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Projects the poll result onto this sensor
    pub fn project(&self, result: &PollResult, next_update: DateTime<Utc>) -> SensorState {
        let snapshot = result.get(&self.wallet_type);
        let value = round2(snapshot.map(|s| s.total_balance).unwrap_or(0.0));
        let wallets = self
            .wallet_type
            .has_holdings()
            .then(|| snapshot.map(|s| s.wallets.clone()).unwrap_or_default());

        SensorState {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            value,
            unit: self.currency,
            device_class: "monetary",
            state_class: "total",
            attributes: SensorAttributes {
                last_update: local_iso(result.last_updated),
                next_update: local_iso(next_update),
                wallets,
            },
        }
    }
}

fn local_iso(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).to_rfc3339()
}

/// Pushes every tick outcome to the sink for a fixed set of sensors
pub struct SensorPublisher {
    sensors: Vec<WalletSensor>,
    sink: Arc<dyn SensorSink>,
}

impl SensorPublisher {
    pub fn new(sensors: Vec<WalletSensor>, sink: Arc<dyn SensorSink>) -> Self {
        Self { sensors, sink }
    }

    pub fn publish(&self, result: &PollResult, next_update: DateTime<Utc>) {
        for sensor in &self.sensors {
            self.sink.publish(&sensor.project(result, next_update));
        }
    }

    pub fn mark_stale(&self, failure: &UpdateFailed) {
        for sensor in &self.sensors {
            self.sink.mark_stale(sensor.unique_id(), failure.message());
        }
    }
}

impl PollListener for SensorPublisher {
    fn on_poll(&self, outcome: &Result<Arc<PollResult>, UpdateFailed>, next_update: DateTime<Utc>) {
        match outcome {
            Ok(result) => self.publish(result, next_update),
            Err(failure) => self.mark_stale(failure),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::recording::RecordingSink;
    use super::*;
    use crate::types::WalletTypeSnapshot;
    use std::collections::BTreeMap;

    fn result() -> PollResult {
        let mut snapshots = BTreeMap::new();
        snapshots.insert(WalletType::Fiat, WalletTypeSnapshot::new(100.004, Vec::new()));
        snapshots.insert(
            WalletType::Cryptocoin,
            WalletTypeSnapshot::new(
                500.456,
                vec![WalletEntry {
                    name: "BTC Wallet".to_string(),
                    balance_token: 0.01,
                    balance_fiat: 500.46,
                    fiat: Currency::EUR,
                    currency: "BTC".to_string(),
                }],
            ),
        );
        snapshots.insert(WalletType::from("assets"), WalletTypeSnapshot::empty_degraded());
        PollResult::new(snapshots)
    }

    #[test]
    fn identity_follows_wallet_type() {
        let fiat = WalletSensor::new(WalletType::Fiat, Currency::EUR);
        assert_eq!(fiat.name(), "Bitpanda Wallets Fiat EUR");
        assert_eq!(fiat.unique_id(), "bitpanda_wallets_fiat_eur");

        let etf = WalletSensor::new(WalletType::Etf, Currency::USD);
        assert_eq!(etf.name(), "Bitpanda Wallets ETF USD");
        assert_eq!(etf.unique_id(), "bitpanda_wallets_etf_usd");
    }

    #[test]
    fn fiat_state_has_no_wallets_attribute() {
        let result = result();
        let state = WalletSensor::new(WalletType::Fiat, Currency::EUR).project(&result, Utc::now());

        assert_eq!(state.value, 100.0);
        assert_eq!(state.unit, Currency::EUR);
        assert!(state.attributes.wallets.is_none());
        let json = serde_json::to_value(&state.attributes).unwrap();
        assert!(json.get("wallets").is_none());
    }

    #[test]
    fn asset_state_lists_wallets_and_rounds_value() {
        let result = result();
        let next = result.last_updated + chrono::Duration::minutes(5);
        let state = WalletSensor::new(WalletType::Cryptocoin, Currency::EUR).project(&result, next);

        assert_eq!(state.value, 500.46);
        assert_eq!(state.attributes.wallets.as_ref().map(Vec::len), Some(1));

        let last = DateTime::parse_from_rfc3339(&state.attributes.last_update).unwrap();
        let next_parsed = DateTime::parse_from_rfc3339(&state.attributes.next_update).unwrap();
        assert_eq!(last.with_timezone(&Utc), result.last_updated);
        assert_eq!(next_parsed.with_timezone(&Utc), next);
    }

    #[test]
    fn unknown_type_has_no_wallets_attribute() {
        let result = result();
        let state = WalletSensor::new(WalletType::from("assets"), Currency::EUR)
            .project(&result, Utc::now());

        assert_eq!(state.value, 0.0);
        assert!(state.attributes.wallets.is_none());
    }

    #[test]
    fn sensors_only_for_types_in_result() {
        let selected = [WalletType::Fiat, WalletType::Stock, WalletType::Cryptocoin];
        let sensors = WalletSensor::for_result(&selected, Currency::EUR, &result());

        let types: Vec<_> = sensors.iter().map(|s| s.wallet_type().clone()).collect();
        assert_eq!(types, vec![WalletType::Fiat, WalletType::Cryptocoin]);
    }

    #[test]
    fn publisher_routes_outcomes_to_sink() {
        let sink = Arc::new(RecordingSink::default());
        let sensors = vec![
            WalletSensor::new(WalletType::Fiat, Currency::EUR),
            WalletSensor::new(WalletType::Cryptocoin, Currency::EUR),
        ];
        let publisher = SensorPublisher::new(sensors, sink.clone());

        publisher.on_poll(&Ok(Arc::new(result())), Utc::now());
        publisher.on_poll(&Err(UpdateFailed::new("HTTP 500")), Utc::now());

        assert_eq!(sink.published.lock().unwrap().len(), 2);
        let stale = sink.stale.lock().unwrap();
        assert_eq!(stale.len(), 2);
        assert_eq!(stale[0], ("bitpanda_wallets_fiat_eur".to_string(), "HTTP 500".to_string()));
    }
}
