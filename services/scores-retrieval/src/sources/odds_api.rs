use crate::types::*;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Success/failure bookkeeping so health() never spends API quota
struct HealthTracker {
    /// Timestamp of last successful request (millis since epoch)
    last_success_ms: AtomicU64,
    /// Timestamp of last failed request (millis since epoch)
    last_failure_ms: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
}

impl HealthTracker {
    fn new() -> Self {
        Self {
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
        }
    }

    fn record_success(&self) {
        let now_ms = Utc::now().timestamp_millis() as u64;
        self.last_success_ms.store(now_ms, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        let now_ms = Utc::now().timestamp_millis() as u64;
        self.last_failure_ms.store(now_ms, Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    fn is_healthy(&self) -> bool {
        let last_success = self.last_success_ms.load(Ordering::Relaxed);
        let last_failure = self.last_failure_ms.load(Ordering::Relaxed);

        last_success > 0 && (last_failure == 0 || last_success >= last_failure)
    }

    fn success_rate(&self) -> f64 {
        let successes = self.success_count.load(Ordering::Relaxed);
        let failures = self.failure_count.load(Ordering::Relaxed);
        let total = successes + failures;
        if total == 0 {
            return 1.0;
        }
        successes as f64 / total as f64
    }
}

/// The-Odds-API scores client
pub struct OddsApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    days_from: u32,
    health_tracker: HealthTracker,
}

impl OddsApiClient {
    pub fn new(api_key: Option<String>, days_from: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: "https://api.the-odds-api.com".to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            days_from,
            health_tracker: HealthTracker::new(),
        })
    }

    /// Point the client at another host (used by tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Scores for fixtures in the last `days_from` days, completed or not
    pub async fn get_scores(&self, sport: &str) -> Result<Vec<MatchScore>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ScoresError::MissingApiKey(self.name().to_string()))?;

        let url = format!("{}/v4/sports/{}/scores/", self.base_url, sport);
        debug!("Fetching scores from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", api_key.to_string()),
                ("daysFrom", self.days_from.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                self.health_tracker.record_failure();
                ScoresError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            self.health_tracker.record_failure();
            let body = response.text().await.unwrap_or_default();
            warn!("Odds API returned {} for {}", status, sport);
            return Err(ScoresError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let scores = response.json::<Vec<MatchScore>>().await.map_err(|e| {
            self.health_tracker.record_failure();
            ScoresError::InvalidResponse(e.to_string())
        })?;

        self.health_tracker.record_success();
        debug!("Received {} score lines for {}", scores.len(), sport);
        Ok(scores)
    }

    /// Health from recorded request outcomes (no API call)
    pub async fn health(&self) -> SourceHealth {
        let last_success_ms = self.health_tracker.last_success_ms.load(Ordering::Relaxed);
        let last_success = if last_success_ms > 0 {
            DateTime::from_timestamp_millis(last_success_ms as i64)
        } else {
            None
        };

        let is_healthy = self.health_tracker.is_healthy();

        SourceHealth {
            source: self.name().to_string(),
            is_healthy,
            last_success,
            last_error: if is_healthy {
                None
            } else {
                Some("Recent failures detected".to_string())
            },
            success_rate: self.health_tracker.success_rate(),
        }
    }

    pub fn name(&self) -> &str {
        "the-odds-api"
    }
}

#[async_trait::async_trait]
impl ScoreSource for OddsApiClient {
    async fn scores(&self, sport: &str) -> Result<Vec<MatchScore>> {
        OddsApiClient::get_scores(self, sport).await
    }

    async fn health(&self) -> SourceHealth {
        OddsApiClient::health(self).await
    }

    fn name(&self) -> &str {
        OddsApiClient::name(self)
    }
}
