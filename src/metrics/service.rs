use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Sliding window for batch rate calculation (milliseconds)
const RATE_WINDOW_MS: i64 = 5000;

/// Counters for the coordination service as a whole
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Decision batches processed (lifetime counter)
    decision_batches: Arc<AtomicU64>,

    /// Metrics batches processed (lifetime counter)
    metrics_batches: Arc<AtomicU64>,

    /// Decisions emitted, error entries included
    decisions: Arc<AtomicU64>,

    /// Entries answered with an error
    rejected_entries: Arc<AtomicU64>,

    /// Deliveries counted across all agents
    deliveries: Arc<AtomicU64>,

    /// Claims released by the missed-snapshot expiry
    expired_claims: Arc<AtomicU64>,

    /// Batch timestamps for rate calculation (sliding 5-second window)
    batch_timestamps: Arc<RwLock<VecDeque<i64>>>,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            decision_batches: Arc::new(AtomicU64::new(0)),
            metrics_batches: Arc::new(AtomicU64::new(0)),
            decisions: Arc::new(AtomicU64::new(0)),
            rejected_entries: Arc::new(AtomicU64::new(0)),
            deliveries: Arc::new(AtomicU64::new(0)),
            expired_claims: Arc::new(AtomicU64::new(0)),
            batch_timestamps: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Record a finished decision batch
    pub fn record_decision_batch(&self, decisions: usize, rejected: usize) {
        self.decision_batches.fetch_add(1, Ordering::Relaxed);
        self.decisions.fetch_add(decisions as u64, Ordering::Relaxed);
        self.rejected_entries.fetch_add(rejected as u64, Ordering::Relaxed);
        self.record_batch_time();
    }

    /// Record a finished metrics batch
    pub fn record_metrics_batch(&self, rejected: usize) {
        self.metrics_batches.fetch_add(1, Ordering::Relaxed);
        self.rejected_entries.fetch_add(rejected as u64, Ordering::Relaxed);
        self.record_batch_time();
    }

    pub fn record_deliveries(&self, count: u64) {
        self.deliveries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_expired_claims(&self, count: usize) {
        self.expired_claims.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_batch_time(&self) {
        let now = Utc::now().timestamp_millis();
        let mut timestamps = self.batch_timestamps.write().unwrap();
        timestamps.push_back(now);

        // Prune timestamps older than the window
        while let Some(&oldest) = timestamps.front() {
            if now - oldest > RATE_WINDOW_MS {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Batches per second over the last 5 seconds
    pub fn get_batch_rate(&self) -> f64 {
        let now = Utc::now().timestamp_millis();
        let timestamps = self.batch_timestamps.read().unwrap();
        let recent = timestamps
            .iter()
            .filter(|&&t| now - t <= RATE_WINDOW_MS)
            .count();
        recent as f64 / (RATE_WINDOW_MS as f64 / 1000.0)
    }

    pub fn get_decision_batches(&self) -> u64 {
        self.decision_batches.load(Ordering::Relaxed)
    }

    pub fn get_deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    /// Get snapshot of all counters
    pub fn get_snapshot(&self) -> ServiceMetricsSnapshot {
        ServiceMetricsSnapshot {
            decision_batches: self.get_decision_batches(),
            metrics_batches: self.metrics_batches.load(Ordering::Relaxed),
            decisions: self.decisions.load(Ordering::Relaxed),
            rejected_entries: self.rejected_entries.load(Ordering::Relaxed),
            deliveries: self.get_deliveries(),
            expired_claims: self.expired_claims.load(Ordering::Relaxed),
            batch_rate: self.get_batch_rate(),
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of service counters at a point in time
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetricsSnapshot {
    pub decision_batches: u64,
    pub metrics_batches: u64,
    pub decisions: u64,
    pub rejected_entries: u64,
    pub deliveries: u64,
    pub expired_claims: u64,
    pub batch_rate: f64,
}
