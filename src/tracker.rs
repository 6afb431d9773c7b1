//! Wallet balance tracker
//!
//! Runs the poll-and-normalize cycle: ticker table first, then every selected
//! wallet type concurrently, published as one [`PollResult`].

use crate::{
    config::Credentials,
    constants::{EVENT_CHANNEL_CAPACITY, UPDATE_INTERVAL},
    error::{ProviderError, UpdateFailed},
    metrics::{MetricsCollector, PollMetrics},
    normalize::{asset_snapshot, fiat_snapshot},
    provider::WalletProvider,
    store::SnapshotStore,
    types::{
        ComponentHealth, HealthStatus, PollResult, TickerTable, WalletEndpoint, WalletEvent,
        WalletType, WalletTypeSnapshot,
    },
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Receives the outcome of every background tick
pub trait PollListener: Send + Sync {
    fn on_poll(&self, outcome: &Result<Arc<PollResult>, UpdateFailed>, next_update: DateTime<Utc>);
}

/// Handle to a running background task
pub struct BackgroundTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Stops the task after the in-flight tick, if any, has finished
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Wallet tracker background task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Sets the next update timestamp on every exit path of a tick
struct NextUpdateGuard<'a> {
    store: &'a SnapshotStore,
    interval: Duration,
}

impl Drop for NextUpdateGuard<'_> {
    fn drop(&mut self) {
        let interval = chrono::Duration::from_std(self.interval).unwrap_or_else(|_| chrono::Duration::zero());
        self.store.set_next_update(Utc::now() + interval);
    }
}

/// Polls one account's wallets on a fixed interval
pub struct WalletTracker {
    provider: Arc<dyn WalletProvider>,
    credentials: Credentials,
    store: Arc<SnapshotStore>,
    metrics: Arc<MetricsCollector>,
    events: broadcast::Sender<WalletEvent>,
    update_interval: Duration,
}

impl WalletTracker {
    /// Creates a tracker polling every [`UPDATE_INTERVAL`]
    pub fn new(provider: Arc<dyn WalletProvider>, credentials: Credentials) -> Self {
        Self::with_update_interval(provider, credentials, UPDATE_INTERVAL)
    }

    pub(crate) fn with_update_interval(
        provider: Arc<dyn WalletProvider>,
        credentials: Credentials,
        update_interval: Duration,
    ) -> Self {
        let next_update = Utc::now()
            + chrono::Duration::from_std(update_interval).unwrap_or_else(|_| chrono::Duration::zero());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            provider,
            credentials,
            store: Arc::new(SnapshotStore::new(next_update)),
            metrics: Arc::new(MetricsCollector::new()),
            events,
            update_interval,
        }
    }

    /// Runs one poll tick
    ///
    /// On success the result replaces the stored one. On failure nothing but
    /// the next update timestamp changes.
    pub async fn refresh_now(&self) -> Result<Arc<PollResult>, UpdateFailed> {
        let _next_update = NextUpdateGuard {
            store: &self.store,
            interval: self.update_interval,
        };
        let start = Instant::now();

        match self.fetch_and_normalize().await {
            Ok(result) => {
                self.metrics.record_poll(start.elapsed(), true).await;
                let result = self.store.replace(result);
                tracing::debug!(
                    wallet_types = result.snapshots.len(),
                    degraded = result.is_degraded(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Wallet data updated"
                );
                let _ = self.events.send(WalletEvent::published(&result));
                Ok(result)
            }
            Err(e) => {
                self.metrics.record_poll(start.elapsed(), false).await;
                let failure = UpdateFailed::from(e);
                tracing::error!(error = %failure, "Failed to fetch wallet data");
                self.store.record_failure(failure.message());
                let _ = self.events.send(WalletEvent::failed(failure.message()));
                Err(failure)
            }
        }
    }

    async fn fetch_and_normalize(&self) -> Result<PollResult, ProviderError> {
        let ticker = self.provider.fetch_ticker().await?;

        let fetches = self
            .credentials
            .wallet_types
            .iter()
            .map(|wallet_type| self.fetch_wallet_type(wallet_type, &ticker));
        let snapshots = try_join_all(fetches).await?;

        Ok(PollResult::new(snapshots.into_iter().collect()))
    }

    async fn fetch_wallet_type(
        &self,
        wallet_type: &WalletType,
        ticker: &TickerTable,
    ) -> Result<(WalletType, WalletTypeSnapshot), ProviderError> {
        let currency = self.credentials.currency;

        let snapshot = match wallet_type.endpoint() {
            None => {
                tracing::warn!(wallet_type = %wallet_type, "Unknown wallet type");
                WalletTypeSnapshot::empty_degraded()
            }
            Some(WalletEndpoint::Fiat) => {
                let response = self.provider.fetch_fiat_wallets().await?;
                fiat_snapshot(&response, currency)
            }
            Some(WalletEndpoint::Asset) => {
                let response = self.provider.fetch_asset_wallets().await?;
                asset_snapshot(&response, wallet_type, currency, ticker)?
            }
        };

        Ok((wallet_type.clone(), snapshot))
    }

    /// Starts ticking every update interval, first tick one interval from now
    ///
    /// Ticks run sequentially; a tick that overruns the interval causes the
    /// missed ticks to be skipped, never to overlap.
    pub fn start_background_task(self: &Arc<Self>, listener: Arc<dyn PollListener>) -> BackgroundTask {
        let tracker = Arc::clone(self);
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let period = tracker.update_interval;
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                update_interval_secs = period.as_secs(),
                provider = tracker.provider.provider_name(),
                "Starting wallet tracker background task"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = interval.tick() => {}
                }

                let outcome = tracker.refresh_now().await;
                listener.on_poll(&outcome, tracker.next_update());
            }

            tracing::info!("Wallet tracker background task stopped");
        });

        BackgroundTask { shutdown, handle }
    }

    /// Subscribes to tick events
    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    /// Latest successful poll result
    pub fn latest(&self) -> Option<Arc<PollResult>> {
        self.store.latest()
    }

    pub fn next_update(&self) -> DateTime<Utc> {
        self.store.next_update()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Gets poll latency percentiles and success rate
    pub async fn get_poll_metrics(&self) -> PollMetrics {
        self.metrics.get_metrics().await
    }

    /// Perform a health check on the wallet tracker
    pub async fn health_check(&self) -> ComponentHealth {
        let mut details = HashMap::new();
        let latest = self.latest();
        let last_error = self.store.last_error();
        let metrics = self.get_poll_metrics().await;

        details.insert(
            "provider_name".to_string(),
            serde_json::json!(self.provider.provider_name()),
        );
        details.insert(
            "wallet_types".to_string(),
            serde_json::json!(latest
                .as_ref()
                .map(|r| r.snapshots.keys().map(WalletType::to_string).collect::<Vec<_>>())
                .unwrap_or_default()),
        );
        details.insert(
            "last_updated".to_string(),
            serde_json::json!(latest.as_ref().map(|r| r.last_updated.to_rfc3339())),
        );
        details.insert(
            "next_update".to_string(),
            serde_json::json!(self.next_update().to_rfc3339()),
        );
        details.insert("success_rate".to_string(), serde_json::json!(metrics.success_rate));

        let (status, message) = match (&latest, &last_error) {
            (None, _) => (
                HealthStatus::Unhealthy,
                "Wallet tracker has no data yet".to_string(),
            ),
            (Some(_), Some(error)) => (
                HealthStatus::Degraded,
                format!("Last poll failed, serving stale data: {}", error),
            ),
            (Some(result), None) if result.is_degraded() => (
                HealthStatus::Degraded,
                "Some wallet values fell back to zero".to_string(),
            ),
            (Some(_), None) => (
                HealthStatus::Healthy,
                "Wallet tracker is operational with fresh data".to_string(),
            ),
        };

        ComponentHealth {
            name: "wallet_tracker".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: Utc::now(),
        }
    }
}
