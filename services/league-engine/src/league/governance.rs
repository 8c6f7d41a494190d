//! Proposal lifecycle and the modifiers passed proposals apply

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{error, info, warn};

use super::options::award_xp;
use super::LeagueEngine;
use crate::models::{lenient, Proposal, ProposalStatus, Vote};
use crate::observability::{metrics, Logger};
use crate::store::{tables, Datastore, Query, StoreExt};

/// Base XP for taking part in a vote
pub const VOTER_BASE_XP: i64 = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GovernanceOutcome {
    pub executed: usize,
    pub defeated: usize,
    pub xp_awards: usize,
}

/// Passed when yes beats no and reaches the threshold
pub fn tally(proposal: &Proposal) -> ProposalStatus {
    if proposal.yes() > proposal.no() && proposal.yes() >= proposal.threshold() {
        ProposalStatus::Executed
    } else {
        ProposalStatus::Defeated
    }
}

/// Base XP plus one per hundred voting power
pub fn voter_xp(power: f64) -> i64 {
    VOTER_BASE_XP + (power / 100.0).trunc() as i64
}

#[derive(Debug, Deserialize)]
struct ModifierRow {
    #[serde(default)]
    target_model_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    adjustment_value: Option<f64>,
}

/// Summed adjustments of proposals in force on `today`, by model.
/// Lookup failures are logged and yield no modifiers.
pub async fn active_modifiers(store: &dyn Datastore, today: NaiveDate) -> HashMap<String, f64> {
    let day = today.to_string();
    let rows: Vec<ModifierRow> = match store
        .fetch(
            tables::GOVERNANCE_PROPOSALS,
            &Query::new()
                .columns("target_model_id, adjustment_value")
                .eq("status", ProposalStatus::Executed.as_str())
                .lte("active_from", day.as_str())
                .gte("active_until", day.as_str()),
        )
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Could not load governance modifiers: {}", e);
            return HashMap::new();
        }
    };

    let mut modifiers = HashMap::new();
    for row in rows {
        if let Some(model_id) = row.target_model_id {
            *modifiers.entry(model_id).or_insert(0.0) += row.adjustment_value.unwrap_or(0.0);
        }
    }
    modifiers
}

impl<R: Rng + Send> LeagueEngine<R> {
    /// Close proposals whose voting window has ended and reward their voters
    pub async fn process_governance(&self, today: NaiveDate) -> anyhow::Result<GovernanceOutcome> {
        let day = today.to_string();
        let expired: Vec<Proposal> = self
            .store
            .fetch(
                tables::GOVERNANCE_PROPOSALS,
                &Query::new()
                    .eq("status", ProposalStatus::Active.as_str())
                    .lte("expires_at", day.as_str()),
            )
            .await
            .context("fetching expired proposals")?;

        let mut outcome = GovernanceOutcome::default();
        for proposal in &expired {
            let status = tally(proposal);
            let patch = match status {
                ProposalStatus::Executed => {
                    let until = today + Duration::days(self.settings.modifier_window_days);
                    json!({
                        "status": status.as_str(),
                        "active_from": day,
                        "active_until": until.to_string(),
                    })
                }
                _ => json!({ "status": status.as_str() }),
            };

            self.store
                .update_by_id(tables::GOVERNANCE_PROPOSALS, &proposal.id, patch)
                .await
                .with_context(|| format!("closing proposal {}", proposal.id))?;

            if status == ProposalStatus::Executed {
                outcome.executed += 1;
                self.metrics.increment(metrics::PROPOSALS_EXECUTED, 1).await;
                info!("[GOVERNANCE] Proposal '{}' PASSED and EXECUTED", proposal.title());
            } else {
                outcome.defeated += 1;
                self.metrics.increment(metrics::PROPOSALS_DEFEATED, 1).await;
                info!("[GOVERNANCE] Proposal '{}' DEFEATED", proposal.title());
            }
            Logger::league_event(&proposal.id, "proposal_closed", status.as_str());

            outcome.xp_awards += self.reward_voters(&proposal.id).await?;
        }

        Ok(outcome)
    }

    async fn reward_voters(&self, proposal_id: &str) -> anyhow::Result<usize> {
        let votes: Vec<Vote> = self
            .store
            .fetch(
                tables::GOVERNANCE_VOTES,
                &Query::new()
                    .columns("user_id, power")
                    .eq("proposal_id", proposal_id),
            )
            .await
            .with_context(|| format!("fetching votes for {}", proposal_id))?;

        let mut awarded = 0;
        for vote in votes {
            let xp = voter_xp(vote.power.unwrap_or(0.0));
            match award_xp(self.store.as_ref(), &vote.user_id, xp).await {
                Ok(()) => {
                    awarded += 1;
                    self.metrics.increment(metrics::XP_AWARDS, 1).await;
                    info!("[GOVERNANCE] Awarded {} XP to user {} for voting", xp, vote.user_id);
                }
                Err(e) => error!("XP award failed for {}: {}", vote.user_id, e),
            }
        }
        Ok(awarded)
    }
}
