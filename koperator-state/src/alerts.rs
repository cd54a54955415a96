use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::StateConfiguration;
use crate::errors::{Result, StateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Firing,
    Resolved,
}

/// An alert received from the alert manager, keyed by its fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertState {
    pub fingerprint: u64,
    pub status: AlertStatus,
    pub labels: BTreeMap<String, String>,
    /// Set once the owning loop has acted on the alert
    pub processed: bool,
    pub last_seen: Instant,
}

impl AlertState {
    pub fn new(fingerprint: u64, status: AlertStatus, labels: BTreeMap<String, String>) -> Self {
        AlertState {
            fingerprint,
            status,
            labels,
            processed: false,
            last_seen: Instant::now(),
        }
    }
}

/// Alerts currently known to the operator.
///
/// Owned by the loop that consumes alerts and handed to whoever needs it; the
/// owner calls [`AlertCache::collect_garbage`] to bound the lifetime of
/// resolved alerts.
#[derive(Debug, Clone)]
pub struct AlertCache {
    alerts: Arc<DashMap<u64, AlertState>>,
    retention: Duration,
}

impl AlertCache {
    pub fn new(retention: Duration) -> Self {
        AlertCache {
            alerts: Arc::new(DashMap::new()),
            retention,
        }
    }

    /// Cache keeping resolved alerts for the configured retention.
    pub fn from_config(config: &StateConfiguration) -> Self {
        Self::new(config.alert_retention)
    }

    /// Records an alert. A known fingerprint gets its status, labels and
    /// last_seen refreshed; it is processed again if its status changed.
    pub fn add_alert(&self, alert: AlertState) -> AlertState {
        let mut entry = self
            .alerts
            .entry(alert.fingerprint)
            .or_insert_with(|| alert.clone());
        if entry.status != alert.status {
            entry.processed = false;
        }
        entry.status = alert.status;
        entry.labels = alert.labels;
        entry.last_seen = alert.last_seen;
        entry.clone()
    }

    pub fn list_alerts(&self) -> BTreeMap<u64, AlertState> {
        self.alerts
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Marks an alert as processed and returns it.
    pub fn handle_alert(&self, fingerprint: u64) -> Result<AlertState> {
        let mut entry = self
            .alerts
            .get_mut(&fingerprint)
            .ok_or(StateError::AlertNotFound(fingerprint))?;
        entry.processed = true;
        debug!(fingerprint, status = ?entry.status, "alert handled");
        Ok(entry.clone())
    }

    pub fn remove_alert(&self, fingerprint: u64) -> Option<AlertState> {
        self.alerts.remove(&fingerprint).map(|(_, alert)| alert)
    }

    /// Drops resolved alerts not seen for longer than the retention, and
    /// returns their fingerprints.
    pub fn collect_garbage(&self, now: Instant) -> BTreeSet<u64> {
        let mut removed = BTreeSet::new();
        self.alerts.retain(|fingerprint, alert| {
            let expired = alert.status == AlertStatus::Resolved
                && now.saturating_duration_since(alert.last_seen) > self.retention;
            if expired {
                removed.insert(*fingerprint);
            }
            !expired
        });
        if !removed.is_empty() {
            info!(count = removed.len(), "garbage collected resolved alerts");
        }
        removed
    }
}
