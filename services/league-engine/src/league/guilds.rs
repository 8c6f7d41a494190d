//! Guild return refresh

use anyhow::Context;
use rand::Rng;
use serde_json::json;
use tracing::{error, info};

use super::{round2, LeagueEngine, Performer};
use crate::models::{Guild, RiskLevel};
use crate::store::{tables, Query, StoreExt};

/// Mean ROI of the day's performers; zero when nobody traded
pub fn baseline_roi(performers: &[Performer]) -> f64 {
    if performers.is_empty() {
        return 0.0;
    }
    performers.iter().map(|p| p.roi).sum::<f64>() / performers.len() as f64
}

/// Half-open range the guild's noise is drawn from
pub fn variance_range(risk: RiskLevel) -> (f64, f64) {
    match risk {
        RiskLevel::High => (-5.0, 8.0),
        RiskLevel::Low => (-1.0, 2.0),
        RiskLevel::Medium => (-2.0, 4.0),
    }
}

impl<R: Rng + Send> LeagueEngine<R> {
    /// Give every guild baseline ROI plus risk-scaled noise; returns guilds updated
    pub async fn update_guild_stats(&mut self, performers: &[Performer]) -> anyhow::Result<usize> {
        let guilds: Vec<Guild> = self
            .store
            .fetch(tables::GUILDS, &Query::new())
            .await
            .context("fetching guilds")?;
        if guilds.is_empty() {
            return Ok(0);
        }

        let baseline = baseline_roi(performers);
        let mut updated = 0;
        for guild in &guilds {
            let (lo, hi) = variance_range(guild.risk());
            let roi_7d = round2(baseline + self.rng.gen_range(lo..hi));

            match self
                .store
                .update_by_id(tables::GUILDS, &guild.id, json!({ "roi_7d": roi_7d }))
                .await
            {
                Ok(_) => updated += 1,
                Err(e) => error!("Failed to update guild {}: {}", guild.id, e),
            }
        }

        info!(
            "[GUILDS] Updated {} syndicates against a {:.2}% baseline",
            updated, baseline
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn performer(roi: f64) -> Performer {
        Performer {
            model_id: "m".to_string(),
            name: "M".to_string(),
            pnl: 0.0,
            roi,
            wins: Vec::new(),
            losses: Vec::new(),
        }
    }

    #[test]
    fn test_baseline_is_mean_roi() {
        assert_eq!(baseline_roi(&[]), 0.0);
        assert_eq!(baseline_roi(&[performer(2.0), performer(-1.0), performer(5.0)]), 2.0);
    }

    #[test]
    fn test_variance_by_risk() {
        assert_eq!(variance_range(RiskLevel::High), (-5.0, 8.0));
        assert_eq!(variance_range(RiskLevel::Low), (-1.0, 2.0));
        assert_eq!(variance_range(RiskLevel::default()), (-2.0, 4.0));
    }
}
