//! Config entry model
//!
//! The host persists entry data and options as JSON and hands them back on
//! every load. `options.wallet` overrides the wallet selection made at setup.

use crate::{
    constants::INTEGRATION_NAME,
    error::ConfigError,
    types::{Currency, WalletType},
    validator::CredentialValidator,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

fn all_wallet_types() -> Vec<WalletType> {
    WalletType::all().to_vec()
}

/// Data stored when the entry is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryData {
    pub api_key: String,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default = "all_wallet_types")]
    pub wallet: Vec<WalletType>,
}

/// Options that can be changed after setup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Vec<WalletType>>,
}

/// A configured integration instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub title: String,
    pub data: EntryData,
    #[serde(default)]
    pub options: EntryOptions,
}

impl ConfigEntry {
    pub fn new(data: EntryData) -> Self {
        Self {
            entry_id: Uuid::new_v4().to_string(),
            title: entry_title(data.currency),
            data,
            options: EntryOptions::default(),
        }
    }

    /// Effective credentials: entry data with the options applied
    pub fn credentials(&self) -> Credentials {
        let wallet = self.options.wallet.as_ref().unwrap_or(&self.data.wallet);
        Credentials {
            api_key: self.data.api_key.clone(),
            currency: self.data.currency,
            wallet_types: wallet.iter().cloned().collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Title shown for an entry, e.g. `Bitpanda Wallets (EUR)`
pub fn entry_title(currency: Currency) -> String {
    format!("{} ({})", INTEGRATION_NAME, currency)
}

/// Everything the poll engine needs; replaced wholesale on reconfiguration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub currency: Currency,
    pub wallet_types: BTreeSet<WalletType>,
}

/// Values entered in the user step of the configuration UI
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInput {
    pub api_key: String,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default = "all_wallet_types")]
    pub wallet: Vec<WalletType>,
}

impl UserInput {
    /// Shape checks that need no network access
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        validate_selection(&self.wallet)
    }
}

/// Rejects an empty selection and identifiers outside the supported set
pub fn validate_selection(wallet: &[WalletType]) -> Result<(), ConfigError> {
    if wallet.is_empty() {
        return Err(ConfigError::NoWalletTypes);
    }
    if let Some(unknown) = wallet.iter().find(|w| !w.is_known()) {
        return Err(ConfigError::UnsupportedWalletType(unknown.to_string()));
    }
    Ok(())
}

/// Validates the input and the API key, then builds the entry
pub async fn create_entry(
    input: UserInput,
    validator: &CredentialValidator,
) -> Result<ConfigEntry, ConfigError> {
    input.validate()?;

    let api_key = input.api_key.trim().to_string();
    if !validator.validate(&api_key).await {
        return Err(ConfigError::InvalidApiKey);
    }

    let entry = ConfigEntry::new(EntryData {
        api_key,
        currency: input.currency,
        wallet: input.wallet,
    });
    tracing::info!(title = %entry.title, "Created config entry");
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockHttpClient;
    use std::sync::Arc;

    fn input(api_key: &str, wallet: Vec<WalletType>) -> UserInput {
        UserInput {
            api_key: api_key.to_string(),
            currency: Currency::USD,
            wallet,
        }
    }

    #[test]
    fn defaults_select_all_wallet_types_in_eur() {
        let data: EntryData = serde_json::from_str(r#"{"api_key": "k"}"#).unwrap();
        assert_eq!(data.currency, Currency::EUR);
        assert_eq!(data.wallet.len(), 6);
    }

    #[test]
    fn entry_data_uses_config_keys() {
        use crate::constants::{CONF_API_KEY, CONF_CURRENCY, CONF_WALLET};

        let data = EntryData {
            api_key: "k".to_string(),
            currency: Currency::EUR,
            wallet: vec![WalletType::Fiat],
        };
        let value = serde_json::to_value(&data).unwrap();

        assert_eq!(value[CONF_API_KEY], "k");
        assert_eq!(value[CONF_CURRENCY], "EUR");
        assert_eq!(value[CONF_WALLET], serde_json::json!(["FIAT"]));
    }

    #[test]
    fn options_override_wallet_selection() {
        let mut entry = ConfigEntry::new(EntryData {
            api_key: "k".to_string(),
            currency: Currency::CHF,
            wallet: WalletType::all().to_vec(),
        });
        entry.options.wallet = Some(vec![WalletType::Metal, WalletType::Metal]);

        let credentials = entry.credentials();
        assert_eq!(credentials.currency, Currency::CHF);
        assert_eq!(credentials.wallet_types.len(), 1);
        assert!(credentials.wallet_types.contains(&WalletType::Metal));
        assert_eq!(entry.title, "Bitpanda Wallets (CHF)");
    }

    #[test]
    fn entry_round_trips_through_json() {
        let json = r#"{
            "entry_id": "abc",
            "title": "Bitpanda Wallets (EUR)",
            "data": {"api_key": "k", "currency": "EUR", "wallet": ["FIAT", "assets"]}
        }"#;
        let entry = ConfigEntry::from_json(json).unwrap();

        assert_eq!(entry.options, EntryOptions::default());
        assert!(entry
            .credentials()
            .wallet_types
            .contains(&WalletType::Other("assets".to_string())));
        assert_eq!(ConfigEntry::from_json(&entry.to_json().unwrap()).unwrap(), entry);
    }

    #[test]
    fn input_validation() {
        assert_eq!(
            input("  ", vec![WalletType::Fiat]).validate(),
            Err(ConfigError::MissingApiKey)
        );
        assert_eq!(input("k", vec![]).validate(), Err(ConfigError::NoWalletTypes));
        assert_eq!(
            input("k", vec![WalletType::from("bonds")]).validate(),
            Err(ConfigError::UnsupportedWalletType("bonds".to_string()))
        );
        assert!(input("k", vec![WalletType::Etf]).validate().is_ok());
    }

    #[tokio::test]
    async fn create_entry_checks_the_key() {
        let http = MockHttpClient::new();
        http.respond("/asset-wallets", 401, "{}");
        let validator = CredentialValidator::with_base_url(Arc::new(http.clone()), "https://api.test");

        let err = create_entry(input("bad", vec![WalletType::Fiat]), &validator)
            .await
            .unwrap_err();
        assert_eq!(err.form_error_key(), "invalid_api_key");

        http.respond("/asset-wallets", 200, r#"{"data": {}}"#);
        let entry = create_entry(input(" good ", vec![WalletType::Fiat]), &validator)
            .await
            .unwrap();
        assert_eq!(entry.data.api_key, "good");
        assert_eq!(entry.title, "Bitpanda Wallets (USD)");
    }

    #[tokio::test]
    async fn invalid_input_skips_the_network() {
        let http = MockHttpClient::new();
        let validator = CredentialValidator::with_base_url(Arc::new(http.clone()), "https://api.test");

        let err = create_entry(input("k", vec![]), &validator).await.unwrap_err();

        assert_eq!(err, ConfigError::NoWalletTypes);
        assert!(http.requests().is_empty());
    }
}
