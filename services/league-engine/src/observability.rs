//! Observability: run metrics and structured league logging

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::Level;

/// Start the fmt subscriber used by every binary
pub fn init_tracing() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

/// Counters and gauges for one process run
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
}

struct MetricsInner {
    counters: HashMap<String, u64>,
    gauges: HashMap<String, f64>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner {
                counters: HashMap::new(),
                gauges: HashMap::new(),
                start_time: Instant::now(),
            })),
        }
    }

    /// Increment a counter
    pub async fn increment(&self, name: &str, value: u64) {
        let mut inner = self.inner.write().await;
        let counter = inner.counters.entry(name.to_string()).or_insert(0);
        *counter += value;
    }

    /// Set a gauge value
    pub async fn gauge(&self, name: &str, value: f64) {
        let mut inner = self.inner.write().await;
        inner.gauges.insert(name.to_string(), value);
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read().await;
        MetricsSnapshot {
            counters: inner.counters.clone(),
            gauges: inner.gauges.clone(),
            uptime_secs: inner.start_time.elapsed().as_secs(),
        }
    }

    pub async fn get_counter(&self, name: &str) -> u64 {
        let inner = self.inner.read().await;
        inner.counters.get(name).copied().unwrap_or(0)
    }

    pub async fn get_gauge(&self, name: &str) -> Option<f64> {
        let inner = self.inner.read().await;
        inner.gauges.get(name).copied()
    }

    /// Log the current snapshot at INFO
    pub async fn log_snapshot(&self) {
        let snapshot = self.snapshot().await;
        let mut counters: Vec<_> = snapshot.counters.iter().collect();
        counters.sort();
        let mut gauges: Vec<_> = snapshot.gauges.iter().collect();
        gauges.sort_by(|a, b| a.0.cmp(b.0));

        tracing::info!(
            counters = ?counters,
            gauges = ?gauges,
            uptime_secs = snapshot.uptime_secs,
            "metrics_snapshot"
        );
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    pub uptime_secs: u64,
}

/// Structured logger for consistent log formatting
pub struct Logger;

impl Logger {
    /// Something happened to a model or proposal during a league day
    pub fn league_event(subject: &str, event_type: &str, details: &str) {
        tracing::info!(
            subject = %subject,
            event_type = %event_type,
            details = %details,
            "league_event"
        );
    }

    /// Credits moved for a user
    pub fn wallet_event(user_id: &str, action: &str, amount: &str) {
        tracing::info!(
            user_id = %user_id,
            action = %action,
            amount = %amount,
            "wallet_event"
        );
    }
}

/// Predefined metric names
pub mod metrics {
    // Daily simulation
    pub const MODELS_PROCESSED: &str = "models_processed_total";
    pub const MODEL_DAY_FAILED: &str = "model_day_failed_total";
    pub const SIMULATED_BETS: &str = "simulated_bets_total";
    pub const SIMULATED_WINS: &str = "simulated_wins_total";
    pub const STAGE_FAILED: &str = "stage_failed_total";
    pub const ROWS_MALFORMED: &str = "rows_malformed_total";
    pub const GOVERNED_ROI: &str = "governed_roi";

    // Options
    pub const OPTIONS_SETTLED: &str = "black_swan_settled_total";
    pub const OPTIONS_EXPIRED: &str = "black_swan_expired_total";

    // Governance
    pub const PROPOSALS_EXECUTED: &str = "proposals_executed_total";
    pub const PROPOSALS_DEFEATED: &str = "proposals_defeated_total";
    pub const XP_AWARDS: &str = "xp_awards_total";

    // Settlement
    pub const BETS_WON: &str = "bets_won_total";
    pub const BETS_LOST: &str = "bets_lost_total";
    pub const BETS_UNSETTLED: &str = "bets_unsettled_total";
}
