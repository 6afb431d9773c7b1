//! Host-facing integration lifecycle
//!
//! `setup` → first refresh → sensors → background polling.
//! Option changes tear everything down and set it up again.

use crate::{
    config::{ConfigEntry, EntryOptions},
    error::SetupError,
    http::HttpClient,
    provider::WalletProvider,
    providers::BitpandaProvider,
    sensor::{SensorPublisher, SensorSink, WalletSensor},
    tracker::{BackgroundTask, WalletTracker},
};
use std::sync::Arc;
use std::time::Duration;

/// A loaded entry with its running poller
struct LoadedEntry {
    tracker: Arc<WalletTracker>,
    sensors: Vec<WalletSensor>,
    task: BackgroundTask,
}

/// One integration instance bound to one config entry
pub struct WalletIntegration {
    http: Arc<dyn HttpClient>,
    sink: Arc<dyn SensorSink>,
    base_url: Option<String>,
    update_interval: Option<Duration>,
    entry: Option<ConfigEntry>,
    loaded: Option<LoadedEntry>,
}

impl WalletIntegration {
    pub fn new(http: Arc<dyn HttpClient>, sink: Arc<dyn SensorSink>) -> Self {
        Self {
            http,
            sink,
            base_url: None,
            update_interval: None,
            entry: None,
            loaded: None,
        }
    }

    /// Points the provider at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[cfg(test)]
    pub(crate) fn with_update_interval(mut self, update_interval: Duration) -> Self {
        self.update_interval = Some(update_interval);
        self
    }

    /// Loads an entry and returns the sensors it exposes
    ///
    /// Fails with [`SetupError::NotReady`] when the first refresh fails; the
    /// host is expected to retry setup later.
    pub async fn setup(&mut self, entry: ConfigEntry) -> Result<Vec<WalletSensor>, SetupError> {
        self.unload().await;

        let credentials = entry.credentials();
        let provider: Arc<dyn WalletProvider> = Arc::new(match &self.base_url {
            Some(base_url) => BitpandaProvider::with_base_url(
                self.http.clone(),
                base_url.clone(),
                credentials.api_key.clone(),
            ),
            None => BitpandaProvider::new(self.http.clone(), credentials.api_key.clone()),
        });
        let tracker = Arc::new(match self.update_interval {
            Some(interval) => WalletTracker::with_update_interval(provider, credentials, interval),
            None => WalletTracker::new(provider, credentials),
        });

        let first = tracker.refresh_now().await?;

        let credentials = tracker.credentials();
        let sensors = WalletSensor::for_result(&credentials.wallet_types, credentials.currency, &first);
        let publisher = SensorPublisher::new(sensors.clone(), self.sink.clone());
        publisher.publish(&first, tracker.next_update());

        let task = tracker.start_background_task(Arc::new(publisher));
        tracing::info!(
            entry_id = %entry.entry_id,
            sensors = sensors.len(),
            "Bitpanda wallets entry loaded"
        );

        self.entry = Some(entry);
        self.loaded = Some(LoadedEntry {
            tracker,
            sensors: sensors.clone(),
            task,
        });
        Ok(sensors)
    }

    /// Stores new options and reloads the entry from scratch
    pub async fn on_options_changed(
        &mut self,
        options: EntryOptions,
    ) -> Result<Vec<WalletSensor>, SetupError> {
        let Some(mut entry) = self.entry.take() else {
            tracing::warn!("Options changed without a loaded entry");
            return Ok(Vec::new());
        };

        entry.options = options;
        tracing::info!(entry_id = %entry.entry_id, "Options changed, reloading entry");
        match self.setup(entry.clone()).await {
            Ok(sensors) => Ok(sensors),
            Err(e) => {
                // Keep the new options so the next reload can retry them
                self.entry = Some(entry);
                Err(e)
            }
        }
    }

    /// Stops polling; an in-flight tick finishes first
    pub async fn unload(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            loaded.task.stop().await;
            tracing::info!(sensors = loaded.sensors.len(), "Bitpanda wallets entry unloaded");
        }
    }

    /// Tracker of the loaded entry
    pub fn tracker(&self) -> Option<&Arc<WalletTracker>> {
        self.loaded.as_ref().map(|loaded| &loaded.tracker)
    }

    pub fn sensors(&self) -> &[WalletSensor] {
        self.loaded
            .as_ref()
            .map(|loaded| loaded.sensors.as_slice())
            .unwrap_or_default()
    }

    pub fn entry(&self) -> Option<&ConfigEntry> {
        self.entry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryData;
    use crate::http::mock::MockHttpClient;
    use crate::normalize::fixtures;
    use crate::sensor::recording::RecordingSink;
    use crate::types::{Currency, WalletType};

    fn entry(wallet: Vec<WalletType>) -> ConfigEntry {
        ConfigEntry::new(EntryData {
            api_key: "secret".to_string(),
            currency: Currency::EUR,
            wallet,
        })
    }

    fn http() -> MockHttpClient {
        let http = MockHttpClient::new();
        http.respond("/ticker", 200, fixtures::TICKER);
        http.respond("/fiatwallets", 200, fixtures::FIAT_WALLETS);
        http.respond("/asset-wallets", 200, fixtures::ASSET_WALLETS);
        http
    }

    fn integration(http: &MockHttpClient, sink: &Arc<RecordingSink>) -> WalletIntegration {
        WalletIntegration::new(Arc::new(http.clone()), sink.clone())
            .with_base_url("https://api.test/v1")
            .with_update_interval(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn setup_creates_and_publishes_sensors() {
        let http = http();
        let sink = Arc::new(RecordingSink::default());
        let mut integration = integration(&http, &sink);

        let sensors = integration
            .setup(entry(vec![WalletType::Fiat, WalletType::Metal]))
            .await
            .unwrap();

        assert_eq!(sensors.len(), 2);
        let published = sink.published.lock().unwrap().clone();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].unique_id, "bitpanda_wallets_fiat_eur");
        assert_eq!(published[0].value, 100.0);
        assert_eq!(published[1].unique_id, "bitpanda_wallets_metal_eur");
        assert_eq!(published[1].value, 150.0);

        integration.unload().await;
    }

    #[tokio::test]
    async fn failing_first_refresh_is_not_ready() {
        let http = http();
        http.respond("/ticker", 500, "");
        let sink = Arc::new(RecordingSink::default());
        let mut integration = integration(&http, &sink);

        let err = integration.setup(entry(vec![WalletType::Fiat])).await.unwrap_err();

        assert!(matches!(err, SetupError::NotReady(_)));
        assert!(integration.tracker().is_none());
        assert!(sink.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn options_change_reloads_with_new_selection() {
        let http = http();
        let sink = Arc::new(RecordingSink::default());
        let mut integration = integration(&http, &sink);
        integration.setup(entry(vec![WalletType::Fiat])).await.unwrap();

        let sensors = integration
            .on_options_changed(EntryOptions {
                wallet: Some(vec![WalletType::Cryptocoin, WalletType::Etf]),
            })
            .await
            .unwrap();

        let ids: Vec<_> = sensors.iter().map(|s| s.unique_id().to_string()).collect();
        assert_eq!(ids, vec!["bitpanda_wallets_cryptocoin_eur", "bitpanda_wallets_etf_eur"]);
        assert_eq!(integration.sensors().len(), 2);
        assert_eq!(
            integration.entry().unwrap().options.wallet,
            Some(vec![WalletType::Cryptocoin, WalletType::Etf])
        );
        assert_eq!(http.call_count("/ticker"), 2);

        integration.unload().await;
    }

    #[tokio::test]
    async fn failed_reload_keeps_entry_for_next_options_change() {
        let http = http();
        let sink = Arc::new(RecordingSink::default());
        let mut integration = integration(&http, &sink);
        integration.setup(entry(vec![WalletType::Fiat])).await.unwrap();

        http.respond("/ticker", 500, "");
        let options = EntryOptions {
            wallet: Some(vec![WalletType::Metal]),
        };
        let err = integration.on_options_changed(options.clone()).await.unwrap_err();

        assert!(matches!(err, SetupError::NotReady(_)));
        assert!(integration.tracker().is_none());
        assert_eq!(integration.entry().unwrap().options, options);

        http.respond("/ticker", 200, fixtures::TICKER);
        let sensors = integration
            .on_options_changed(EntryOptions {
                wallet: Some(vec![WalletType::Fiat, WalletType::Metal]),
            })
            .await
            .unwrap();

        assert_eq!(sensors.len(), 2);
        assert!(integration.tracker().is_some());
        assert_eq!(sensors[1].unique_id(), "bitpanda_wallets_metal_eur");

        integration.unload().await;
    }

    #[tokio::test(start_paused = true)]
    async fn background_failures_mark_sensors_stale() {
        let http = http();
        let sink = Arc::new(RecordingSink::default());
        let mut integration = integration(&http, &sink);
        integration.setup(entry(vec![WalletType::Fiat])).await.unwrap();
        let mut events = integration.tracker().unwrap().subscribe();

        http.respond("/ticker", 503, "");
        events.recv().await.unwrap();
        tokio::task::yield_now().await;
        integration.unload().await;

        let stale = sink.stale.lock().unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].0, "bitpanda_wallets_fiat_eur");
        assert_eq!(sink.published.lock().unwrap().len(), 1);
    }
}
