//! Governed consensus and the daily headline

use anyhow::Context;
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use tracing::info;

use super::governance::active_modifiers;
use super::{money, LeagueEngine, Performer};
use crate::models::NewsEntry;
use crate::store::tables;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyNews {
    pub entry: NewsEntry,
    pub governed_roi: f64,
    /// Whether any passed proposal was in force
    pub policy_active: bool,
}

/// Modifier-weighted mean ROI; each weight is floored at `min_weight`
pub fn governed_roi(performers: &[Performer], modifiers: &HashMap<String, f64>, min_weight: f64) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for performer in performers {
        let modifier = modifiers.get(&performer.model_id).copied().unwrap_or(0.0);
        let weight = (1.0 + modifier).max(min_weight);
        weighted += performer.roi * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        weighted / total_weight
    } else {
        0.0
    }
}

/// Candidate headlines for the day
pub fn headlines(winner: &Performer, loser: &Performer, governed_roi: f64, policy_active: bool) -> Vec<String> {
    let mut candidates = vec![
        format!("{} dominates the day with ${:.2} profit!", winner.name, winner.pnl),
        format!(
            "Market Update: {} surges ahead while {} struggles.",
            winner.name, loser.name
        ),
        format!(
            "Central Bank Report: Governed Consensus achieved {:.2}% ROI today.",
            governed_roi
        ),
        format!(
            "Alpha Alert: {} captures significant edge in today's volatility.",
            winner.name
        ),
    ];

    if policy_active {
        candidates.push(format!(
            "Policy Impact: Public voice active. Governed ROI at {:.2}%.",
            governed_roi
        ));
    }
    candidates
}

/// Performers ordered by day PnL, best first
pub fn rank_by_pnl(performers: &[Performer]) -> Vec<&Performer> {
    let mut ranked: Vec<&Performer> = performers.iter().collect();
    ranked.sort_by(|a, b| b.pnl.partial_cmp(&a.pnl).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

impl<R: Rng + Send> LeagueEngine<R> {
    pub async fn generate_daily_news(
        &mut self,
        performers: &[Performer],
        date: NaiveDate,
    ) -> anyhow::Result<Option<DailyNews>> {
        let ranked = rank_by_pnl(performers);
        let (Some(winner), Some(loser)) = (ranked.first(), ranked.last()) else {
            return Ok(None);
        };

        let modifiers = active_modifiers(self.store.as_ref(), date).await;
        let governed = governed_roi(performers, &modifiers, self.settings.min_weight);

        let policy_active = !modifiers.is_empty();
        let candidates = headlines(winner, loser, governed, policy_active);
        let headline = candidates
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default();

        let entry = NewsEntry {
            date,
            headline,
            top_performer: winner.model_id.clone(),
            top_pnl: money(winner.pnl),
        };
        self.store
            .upsert(
                tables::AI_LEAGUE_NEWS,
                vec![serde_json::to_value(&entry)?],
                &["date"],
            )
            .await
            .context("saving daily news")?;

        info!(
            "[LEAGUE] News Generated: {} (Governed ROI: {:.2}%)",
            entry.headline, governed
        );
        Ok(Some(DailyNews {
            entry,
            governed_roi: governed,
            policy_active,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn performer(id: &str, pnl: f64, roi: f64) -> Performer {
        Performer {
            model_id: id.to_string(),
            name: format!("Model {}", id),
            pnl,
            roi,
            wins: Vec::new(),
            losses: Vec::new(),
        }
    }

    #[test]
    fn test_unmodified_consensus_is_plain_mean() {
        let performers = [performer("a", 0.0, 4.0), performer("b", 0.0, -2.0)];
        assert_eq!(governed_roi(&performers, &HashMap::new(), 0.1), 1.0);
        assert_eq!(governed_roi(&[], &HashMap::new(), 0.1), 0.0);
    }

    #[test]
    fn test_modifiers_reweight_and_floor() {
        let performers = [performer("a", 0.0, 4.0), performer("b", 0.0, -2.0)];

        let mut modifiers = HashMap::new();
        modifiers.insert("a".to_string(), 1.0);
        // weights 2.0 and 1.0
        assert_eq!(governed_roi(&performers, &modifiers, 0.1), 2.0);

        modifiers.insert("b".to_string(), -5.0);
        // b floored to 0.1
        let roi = governed_roi(&performers, &modifiers, 0.1);
        assert!((roi - (8.0 - 0.2) / 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_ranking_and_headlines() {
        let performers = [
            performer("a", -40.0, -0.4),
            performer("b", 212.346, 2.1),
            performer("c", 15.0, 0.2),
        ];
        let ranked = rank_by_pnl(&performers);
        assert_eq!(ranked[0].model_id, "b");
        assert_eq!(ranked[2].model_id, "a");

        let plain = headlines(ranked[0], ranked[2], 1.234, false);
        assert_eq!(plain.len(), 4);
        assert_eq!(plain[0], "Model b dominates the day with $212.35 profit!");
        assert_eq!(plain[1], "Market Update: Model b surges ahead while Model a struggles.");

        let with_policy = headlines(ranked[0], ranked[2], 1.234, true);
        assert_eq!(
            with_policy[4],
            "Policy Impact: Public voice active. Governed ROI at 1.23%."
        );
    }
}
