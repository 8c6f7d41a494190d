//! Black swan option settlement

use anyhow::Context;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{error, info};

use super::LeagueEngine;
use crate::models::{BlackSwanOption, MatchSignal, OptionStatus};
use crate::observability::{metrics, Logger};
use crate::store::{procedures, tables, Datastore, Query, StoreExt, StoreResult};

/// XP granted alongside a black swan payout
pub const BLACK_SWAN_XP: i64 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionOutcome {
    pub settled: usize,
    pub expired: usize,
    pub untouched: usize,
}

/// What today's draw means for one option
#[derive(Debug, Clone, PartialEq)]
pub enum OptionVerdict {
    /// The match is not in today's signals or confidence is under the strike
    Untouched,
    /// The AI was right; the option is worthless
    Expired,
    /// The AI failed; pay out this amount
    Payout(Decimal),
}

pub fn evaluate_option<R: Rng>(
    option: &BlackSwanOption,
    signals: &[MatchSignal],
    rng: &mut R,
) -> OptionVerdict {
    let Some(signal) = signals.iter().find(|s| s.id == option.match_id) else {
        return OptionVerdict::Untouched;
    };

    let probability = signal.win_probability();
    if probability < option.strike() {
        return OptionVerdict::Untouched;
    }

    let ai_won = rng.gen::<f64>() < probability;
    if ai_won {
        OptionVerdict::Expired
    } else {
        OptionVerdict::Payout(option.premium * option.multiplier())
    }
}

/// Move credits through the ledger procedure; negative amounts debit
pub async fn increment_balance(store: &dyn Datastore, user_id: &str, amount: Decimal) -> StoreResult<()> {
    store
        .rpc(
            procedures::INCREMENT_PROFILE_BALANCE,
            json!({
                "p_user_id": user_id,
                "p_amount": amount.to_f64().unwrap_or_default(),
            }),
        )
        .await?;
    Ok(())
}

pub async fn award_xp(store: &dyn Datastore, user_id: &str, amount: i64) -> StoreResult<()> {
    store
        .rpc(
            procedures::AWARD_USER_XP,
            json!({ "p_user_id": user_id, "p_xp_amount": amount }),
        )
        .await?;
    Ok(())
}

impl<R: Rng + Send> LeagueEngine<R> {
    pub async fn settle_black_swan_options(
        &mut self,
        signals: &[MatchSignal],
    ) -> anyhow::Result<OptionOutcome> {
        let pending = self
            .store
            .fetch_each::<BlackSwanOption>(
                tables::BLACK_SWAN_OPTIONS,
                &Query::new().eq("status", "PENDING"),
            )
            .await
            .context("fetching pending options")?;
        self.count_malformed(pending.malformed).await;

        let mut outcome = OptionOutcome::default();
        for option in pending.rows {
            match evaluate_option(&option, signals, &mut self.rng) {
                OptionVerdict::Untouched => outcome.untouched += 1,
                OptionVerdict::Expired => {
                    self.store
                        .update_by_id(
                            tables::BLACK_SWAN_OPTIONS,
                            &option.id,
                            json!({ "status": OptionStatus::Expired, "result": "LOST" }),
                        )
                        .await
                        .with_context(|| format!("expiring option {}", option.id))?;
                    outcome.expired += 1;
                    self.metrics.increment(metrics::OPTIONS_EXPIRED, 1).await;
                }
                // A zero payout leaves the option pending
                OptionVerdict::Payout(payout) if payout <= Decimal::ZERO => outcome.untouched += 1,
                OptionVerdict::Payout(payout) => {
                    let payout = payout.round_dp(2);
                    info!(
                        "[BLACK SWAN] Payout triggered for user {} on match {}",
                        option.user_id, option.match_id
                    );
                    self.store
                        .update_by_id(
                            tables::BLACK_SWAN_OPTIONS,
                            &option.id,
                            json!({ "status": OptionStatus::Settled, "payout": payout }),
                        )
                        .await
                        .with_context(|| format!("settling option {}", option.id))?;
                    outcome.settled += 1;
                    self.metrics.increment(metrics::OPTIONS_SETTLED, 1).await;

                    if let Err(e) = increment_balance(self.store.as_ref(), &option.user_id, payout).await {
                        error!("Payout error for {}: {}", option.user_id, e);
                        continue;
                    }
                    Logger::wallet_event(&option.user_id, "black_swan_payout", &payout.to_string());

                    if let Err(e) = award_xp(self.store.as_ref(), &option.user_id, BLACK_SWAN_XP).await {
                        error!("XP error for {}: {}", option.user_id, e);
                    }
                }
            }
        }

        Ok(outcome)
    }
}
