//! One model's trading day

use anyhow::Context;
use chrono::NaiveDate;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::{money, round2, LeagueEngine};
use crate::config::LeagueSettings;
use crate::models::{AiModel, DailyStat, MatchSignal};
use crate::observability::metrics;
use crate::store::{tables, Query, StoreExt};

#[derive(Debug, Clone, PartialEq)]
pub struct Win {
    pub match_id: String,
    pub probability: f64,
    pub odds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loss {
    pub match_id: String,
    pub probability: f64,
}

/// A model's unrounded day result, used by the later stages
#[derive(Debug, Clone, PartialEq)]
pub struct Performer {
    pub model_id: String,
    pub name: String,
    pub pnl: f64,
    pub roi: f64,
    pub wins: Vec<Win>,
    pub losses: Vec<Loss>,
}

/// Outcome of the flat-stake bet on one signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedBet {
    pub won: bool,
    pub probability: f64,
    pub odds: f64,
    pub pnl: f64,
}

/// Bet on a signal's best bet, or `None` when the signal has no usable one
pub fn simulate_bet<R: Rng>(
    signal: &MatchSignal,
    settings: &LeagueSettings,
    rng: &mut R,
) -> Option<SimulatedBet> {
    signal.best_bet()?;

    let probability = signal.win_probability();
    let won = rng.gen::<f64>() < probability;
    let odds = signal.market_odds(settings.default_odds);
    let pnl = if won {
        settings.stake * (odds - 1.0)
    } else {
        -settings.stake
    };

    Some(SimulatedBet {
        won,
        probability,
        odds,
        pnl,
    })
}

/// ROI in percent against the league's starting capital
pub fn roi(balance: f64, starting_capital: f64) -> f64 {
    (balance - starting_capital) / starting_capital * 100.0
}

#[derive(Debug, Deserialize)]
struct BalanceRow {
    wallet_balance: Option<Decimal>,
}

impl<R: Rng + Send> LeagueEngine<R> {
    /// Latest recorded wallet balance, or the starting capital
    pub async fn starting_balance(&self, model_id: &str) -> anyhow::Result<f64> {
        let latest: Option<BalanceRow> = self
            .store
            .fetch_first(
                tables::AI_LEAGUE_STATS,
                &Query::new()
                    .columns("wallet_balance")
                    .eq("model_id", model_id)
                    .order_desc("date"),
            )
            .await
            .with_context(|| format!("latest balance for {}", model_id))?;

        Ok(latest
            .and_then(|row| row.wallet_balance)
            .and_then(|b| b.to_f64())
            .unwrap_or(self.settings.starting_capital))
    }

    pub async fn process_model_day(
        &mut self,
        model: &AiModel,
        signals: &[MatchSignal],
        date: NaiveDate,
    ) -> anyhow::Result<Performer> {
        let opening = self.starting_balance(&model.model_id).await?;

        let mut core_pnl = 0.0;
        let mut bets_count = 0u32;
        let mut wins = Vec::new();
        let mut losses = Vec::new();

        for signal in signals {
            let Some(bet) = simulate_bet(signal, &self.settings, &mut self.rng) else {
                continue;
            };
            core_pnl += bet.pnl;
            bets_count += 1;

            if bet.won {
                wins.push(Win {
                    match_id: signal.id.clone(),
                    probability: bet.probability,
                    odds: bet.odds,
                });
            } else {
                losses.push(Loss {
                    match_id: signal.id.clone(),
                    probability: bet.probability,
                });
            }
        }

        let (lo, hi) = self.settings.challenge_pnl;
        let challenge_pnl = self.rng.gen_range(lo..hi);
        let (lo, hi) = self.settings.high_yield_pnl;
        let high_yield_pnl = self.rng.gen_range(lo..hi);

        let total_day_pnl = core_pnl + challenge_pnl + high_yield_pnl;
        let balance = opening + total_day_pnl;
        let roi = roi(balance, self.settings.starting_capital);

        let stat = DailyStat {
            model_id: model.model_id.clone(),
            date,
            core_pnl: money(core_pnl),
            challenge_pnl: money(challenge_pnl),
            high_yield_pnl: money(high_yield_pnl),
            total_day_pnl: money(total_day_pnl),
            wallet_balance: money(balance),
            roi: round2(roi),
            bets_count,
        };
        self.store
            .upsert(
                tables::AI_LEAGUE_STATS,
                vec![serde_json::to_value(&stat)?],
                &["model_id", "date"],
            )
            .await
            .with_context(|| format!("saving stats for {}", model.model_id))?;

        self.metrics
            .increment(metrics::SIMULATED_BETS, u64::from(bets_count))
            .await;
        self.metrics
            .increment(metrics::SIMULATED_WINS, wins.len() as u64)
            .await;
        info!(
            "{} closed {} at {:.2} ({} bets, ROI {:.2}%)",
            model.name, date, balance, bets_count, roi
        );

        Ok(Performer {
            model_id: model.model_id.clone(),
            name: model.name.clone(),
            pnl: total_day_pnl,
            roi,
            wins,
            losses,
        })
    }
}
