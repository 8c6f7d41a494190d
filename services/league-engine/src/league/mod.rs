//! Daily league simulation
//!
//! One run walks every model through the day's signals, then settles
//! black swan options, hands out badges, closes governance proposals,
//! refreshes guild returns and writes the day's headline. Each stage after
//! the model loop is best-effort: a failure is logged and the next stage
//! still runs.

pub mod achievements;
pub mod day;
pub mod governance;
pub mod guilds;
pub mod news;
pub mod options;
pub mod roster;

pub use day::{Loss, Performer, Win};
pub use governance::GovernanceOutcome;
pub use options::OptionOutcome;

use anyhow::Context;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::LeagueSettings;
use crate::models::{AiModel, MatchSignal};
use crate::observability::{metrics, MetricsCollector};
use crate::store::{tables, Datastore, Query, StoreExt};

/// Everything one simulated day produced
#[derive(Debug, Clone, Default)]
pub struct DayReport {
    pub date: Option<NaiveDate>,
    pub performers: Vec<Performer>,
    pub options: OptionOutcome,
    pub governance: GovernanceOutcome,
    pub guilds_updated: usize,
    pub headline: Option<String>,
    pub governed_roi: Option<f64>,
    pub policy_active: bool,
}

/// Round to cents for persisted money columns
pub(crate) fn money(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct LeagueEngine<R = StdRng> {
    store: Arc<dyn Datastore>,
    settings: LeagueSettings,
    rng: R,
    metrics: MetricsCollector,
}

impl LeagueEngine<StdRng> {
    pub fn new(store: Arc<dyn Datastore>, settings: LeagueSettings) -> Self {
        Self::with_rng(store, settings, StdRng::from_entropy())
    }
}

impl<R: Rng + Send> LeagueEngine<R> {
    /// Engine drawing from a caller-supplied generator
    pub fn with_rng(store: Arc<dyn Datastore>, settings: LeagueSettings, rng: R) -> Self {
        Self {
            store,
            settings,
            rng,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn settings(&self) -> &LeagueSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Seed the default roster when the league has no models yet
    pub async fn bootstrap(&self) -> anyhow::Result<bool> {
        roster::ensure_models_seeded(self.store.as_ref())
            .await
            .context("seeding default models")
    }

    pub async fn run_daily_simulation(&mut self, date: NaiveDate) -> anyhow::Result<DayReport> {
        info!("[LEAGUE] Running simulation for {}", date);
        let mut report = DayReport {
            date: Some(date),
            ..DayReport::default()
        };

        let models = self
            .store
            .fetch_each::<AiModel>(tables::AI_MODELS, &Query::new())
            .await
            .context("fetching models")?;
        self.count_malformed(models.malformed).await;
        let models = models.rows;
        if models.is_empty() {
            warn!("No models found in {}", tables::AI_MODELS);
            return Ok(report);
        }

        let signals = self
            .store
            .fetch_each::<MatchSignal>(
                tables::MATCHES,
                &Query::new().limit(self.settings.signal_limit),
            )
            .await
            .context("fetching signals")?;
        self.count_malformed(signals.malformed).await;
        let signals = signals.rows;
        if signals.is_empty() {
            warn!("No signal data found, skipping simulation");
            return Ok(report);
        }

        for model in &models {
            match self.process_model_day(model, &signals, date).await {
                Ok(performer) => {
                    self.metrics.increment(metrics::MODELS_PROCESSED, 1).await;
                    report.performers.push(performer);
                }
                Err(e) => {
                    self.metrics.increment(metrics::MODEL_DAY_FAILED, 1).await;
                    error!("Model {} day failed: {:#}", model.model_id, e);
                }
            }
        }

        match self.settle_black_swan_options(&signals).await {
            Ok(outcome) => report.options = outcome,
            Err(e) => self.stage_failed("black swan settlement", e).await,
        }

        self.award_achievements(&report.performers, date).await;

        match self.process_governance(date).await {
            Ok(outcome) => report.governance = outcome,
            Err(e) => self.stage_failed("governance", e).await,
        }

        match self.update_guild_stats(&report.performers).await {
            Ok(count) => report.guilds_updated = count,
            Err(e) => self.stage_failed("guild stats", e).await,
        }

        match self.generate_daily_news(&report.performers, date).await {
            Ok(Some(news)) => {
                self.metrics.gauge(metrics::GOVERNED_ROI, news.governed_roi).await;
                report.headline = Some(news.entry.headline);
                report.governed_roi = Some(news.governed_roi);
                report.policy_active = news.policy_active;
            }
            Ok(None) => {}
            Err(e) => self.stage_failed("daily news", e).await,
        }

        info!("[LEAGUE] Simulation complete for {}", date);
        self.metrics.log_snapshot().await;
        Ok(report)
    }

    async fn count_malformed(&self, malformed: usize) {
        if malformed > 0 {
            self.metrics
                .increment(metrics::ROWS_MALFORMED, malformed as u64)
                .await;
        }
    }

    async fn stage_failed(&self, stage: &str, err: anyhow::Error) {
        self.metrics.increment(metrics::STAGE_FAILED, 1).await;
        error!("{} error: {:#}", stage, err);
    }
}
