//! Badges earned from a day's results

use chrono::NaiveDate;
use rand::Rng;
use tracing::{error, info};

use super::{LeagueEngine, Performer};
use crate::models::{Achievement, AchievementKind};
use crate::store::{tables, StoreExt};

/// A win below this confidence is an upset
pub const UNDERDOG_CONFIDENCE: f64 = 0.4;
/// Wins in one day that earn the consistency badge
pub const IRON_SHIELD_WINS: usize = 5;

/// Badges for the day, Alpha King first
pub fn achievements_for(performers: &[Performer], date: NaiveDate) -> Vec<Achievement> {
    let mut earned = Vec::new();

    // Ties go to the earlier model
    let top = performers
        .iter()
        .reduce(|best, p| if p.roi > best.roi { p } else { best });
    if let Some(top) = top {
        earned.push(badge(
            &top.model_id,
            AchievementKind::AlphaKing,
            format!("Achieved highest ROI of {:.2}% on {}", top.roi, date),
        ));
    }

    for performer in performers {
        if performer
            .wins
            .iter()
            .any(|w| w.probability < UNDERDOG_CONFIDENCE)
        {
            earned.push(badge(
                &performer.model_id,
                AchievementKind::GodSlayer,
                format!("Successfully predicted an underdog victory on {}", date),
            ));
        }

        if performer.wins.len() >= IRON_SHIELD_WINS {
            earned.push(badge(
                &performer.model_id,
                AchievementKind::IronShield,
                format!(
                    "Maintained superior consistency with {} wins in one day",
                    performer.wins.len()
                ),
            ));
        }
    }

    earned
}

fn badge(model_id: &str, kind: AchievementKind, description: String) -> Achievement {
    Achievement {
        model_id: model_id.to_string(),
        achievement_type: kind,
        description,
        earned_at: None,
    }
}

impl<R: Rng + Send> LeagueEngine<R> {
    /// Insert every badge earned today; each insert stands alone
    pub async fn award_achievements(&self, performers: &[Performer], date: NaiveDate) -> usize {
        let mut saved = 0;
        for achievement in achievements_for(performers, date) {
            match self
                .store
                .insert_one(tables::AI_ACHIEVEMENTS, &achievement)
                .await
            {
                Ok(_) => {
                    info!(
                        "[ACHIEVEMENT] {} earned {}",
                        achievement.model_id, achievement.achievement_type
                    );
                    saved += 1;
                }
                Err(e) => error!(
                    "Failed to save {} for {}: {}",
                    achievement.achievement_type, achievement.model_id, e
                ),
            }
        }
        saved
    }
}
