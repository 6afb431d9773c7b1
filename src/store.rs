//! In-memory snapshot store
//!
//! Holds the latest [`PollResult`] and the next scheduled update. A poll
//! result is always replaced as a whole, never patched.

use crate::types::{PollResult, WalletType, WalletTypeSnapshot};
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// Store for the latest poll result
///
/// Uses std locks so the next-update timestamp can be written from a drop
/// guard.
pub struct SnapshotStore {
    latest: RwLock<Option<Arc<PollResult>>>,
    next_update: RwLock<DateTime<Utc>>,
    last_error: RwLock<Option<String>>,
}

impl SnapshotStore {
    /// Creates an empty store
    pub fn new(next_update: DateTime<Utc>) -> Self {
        Self {
            latest: RwLock::new(None),
            next_update: RwLock::new(next_update),
            last_error: RwLock::new(None),
        }
    }

    /// Replaces the latest result and clears the last error
    pub fn replace(&self, result: PollResult) -> Arc<PollResult> {
        let result = Arc::new(result);
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(result.clone());
        *self.last_error.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::debug!(
            wallet_types = result.snapshots.len(),
            "Stored new poll result"
        );
        result
    }

    /// Records a failed poll; the latest result is kept as stale data
    pub fn record_failure(&self, message: impl Into<String>) {
        *self.last_error.write().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    /// Latest successful poll result, if any
    pub fn latest(&self) -> Option<Arc<PollResult>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of a single wallet type from the latest result
    pub fn snapshot(&self, wallet_type: &WalletType) -> Option<WalletTypeSnapshot> {
        self.latest()
            .and_then(|result| result.get(wallet_type).cloned())
    }

    /// Error message of the most recent poll, `None` if it succeeded
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn next_update(&self) -> DateTime<Utc> {
        *self.next_update.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_next_update(&self, next_update: DateTime<Utc>) {
        *self.next_update.write().unwrap_or_else(PoisonError::into_inner) = next_update;
    }

    pub fn has_data(&self) -> bool {
        self.latest().is_some()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn result_with(wallet_type: WalletType, total: f64) -> PollResult {
        let mut snapshots = BTreeMap::new();
        snapshots.insert(wallet_type, WalletTypeSnapshot::new(total, Vec::new()));
        PollResult::new(snapshots)
    }

    #[test]
    fn replace_discards_previous_result() {
        let store = SnapshotStore::default();
        store.replace(result_with(WalletType::Fiat, 10.0));
        store.replace(result_with(WalletType::Etf, 20.0));

        assert!(store.snapshot(&WalletType::Fiat).is_none());
        assert_eq!(store.snapshot(&WalletType::Etf).unwrap().total_balance, 20.0);
    }

    #[test]
    fn failure_keeps_stale_data() {
        let store = SnapshotStore::default();
        store.replace(result_with(WalletType::Fiat, 10.0));
        store.record_failure("HTTP 500");

        assert!(store.has_data());
        assert_eq!(store.last_error().as_deref(), Some("HTTP 500"));

        store.replace(result_with(WalletType::Fiat, 11.0));
        assert_eq!(store.last_error(), None);
    }
}
