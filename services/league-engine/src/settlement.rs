//! Settlement of pending tickets and user bets against final scores

use anyhow::Context;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use scores_retrieval::{find_match, MatchScore, ScoreSource};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::models::{BetLeg, BetStatus, WagerRow};
use crate::observability::{metrics, Logger, MetricsCollector};
use crate::store::{tables, Datastore, Query, StoreExt};

/// Recent scores, or nothing when the source is unavailable
pub async fn fetch_scores(source: &dyn ScoreSource, sport: &str) -> Vec<MatchScore> {
    let scores = match source.scores(sport).await {
        Ok(scores) => {
            info!("Fetched {} score lines from {}", scores.len(), source.name());
            scores
        }
        Err(scores_retrieval::ScoresError::MissingApiKey(_)) => {
            warn!("ODDS_API_KEY not set; settling without scores");
            return Vec::new();
        }
        Err(e) => {
            error!("Error fetching scores: {}", e);
            Vec::new()
        }
    };

    let health = source.health().await;
    if health.is_healthy {
        debug!("{} healthy (success rate {:.2})", health.source, health.success_rate);
    } else {
        warn!(
            "{} unhealthy (success rate {:.2}): {}",
            health.source,
            health.success_rate,
            health.last_error.as_deref().unwrap_or("no successful request")
        );
    }
    scores
}

/// Whether `selection` won. `None` until the match is final.
pub fn check_win(score: Option<&MatchScore>, selection: &str, home: &str, away: &str) -> Option<bool> {
    let score = score.filter(|s| s.is_final())?;
    let (home_goals, away_goals) = (score.goals_for(home), score.goals_for(away));
    let total = f64::from(home_goals) + f64::from(away_goals);

    let line = || {
        selection
            .split_whitespace()
            .last()
            .and_then(|l| l.parse::<f64>().ok())
    };

    let won = if selection == home || selection == "Home Win" {
        home_goals > away_goals
    } else if selection == away || selection == "Away Win" {
        away_goals > home_goals
    } else if selection == "Draw" {
        home_goals == away_goals
    } else if selection.contains("Over") {
        line().map(|l| total > l).unwrap_or(false)
    } else if selection.contains("Under") {
        line().map(|l| total < l).unwrap_or(false)
    } else {
        false
    };
    Some(won)
}

/// "Home vs Away" (optionally prefixed "Combo: ") into trimmed team names
pub fn parse_fixture(label: &str) -> Option<(String, String)> {
    let cleaned = label.replace("Combo: ", "");
    let mut teams = cleaned.split(" vs ");
    let home = teams.next()?.trim().to_string();
    let away = teams.next()?.trim().to_string();
    Some((home, away))
}

#[derive(Debug, Clone, PartialEq)]
pub enum WagerVerdict {
    Won { odds: f64, pnl: Decimal },
    Lost { pnl: Decimal },
    Unsettled,
}

/// Combined odds: the stored total, else the product of leg odds
fn combined_odds(wager: &WagerRow, legs: &[BetLeg]) -> f64 {
    match wager.total_odds {
        Some(odds) if odds != 0.0 => odds,
        _ => legs.iter().map(|l| l.odds.unwrap_or(1.0)).product(),
    }
}

pub fn evaluate_wager(wager: &WagerRow, scores: &[MatchScore]) -> WagerVerdict {
    let legs = wager.legs();
    let mut any_lost = false;
    let mut all_settled = true;

    for leg in legs {
        let Some((home, away)) = leg.fixture_label().and_then(parse_fixture) else {
            all_settled = false;
            continue;
        };
        let Some(selection) = leg.pick() else {
            all_settled = false;
            continue;
        };

        match check_win(find_match(scores, &home, &away), selection, &home, &away) {
            // Match not finished; nothing more to learn from this bet
            None => {
                all_settled = false;
                break;
            }
            Some(false) => any_lost = true,
            Some(true) => {}
        }
    }

    let stake = wager.stake();
    if any_lost {
        WagerVerdict::Lost { pnl: -stake }
    } else if all_settled {
        let odds = combined_odds(wager, legs);
        let payout = stake * Decimal::from_f64(odds).unwrap_or(Decimal::ONE);
        WagerVerdict::Won {
            odds,
            pnl: (payout - stake).round_dp(2),
        }
    } else {
        WagerVerdict::Unsettled
    }
}

/// The two tables holding settleable bets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WagerTable {
    /// Desk and dashboard tickets
    ParlayTickets,
    /// Stakes that move user balances
    UserBets,
}

impl WagerTable {
    pub fn name(&self) -> &'static str {
        match self {
            WagerTable::ParlayTickets => tables::PARLAY_TICKETS,
            WagerTable::UserBets => tables::USER_BETS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementSummary {
    pub won: usize,
    pub lost: usize,
    pub unsettled: usize,
    /// Rows without legs
    pub skipped: usize,
    /// Rows that could not be read
    pub malformed: usize,
}

#[derive(Debug, Deserialize)]
struct BalanceRow {
    #[serde(default)]
    balance: Option<Decimal>,
}

/// Add `amount` to a profile balance (read, add, write).
/// Returns false when the profile does not exist.
pub async fn credit_profile(store: &dyn Datastore, user_id: &str, amount: Decimal) -> anyhow::Result<bool> {
    let profile: Option<BalanceRow> = store
        .fetch_first(
            tables::PROFILES,
            &Query::new().columns("balance").eq("id", user_id),
        )
        .await
        .with_context(|| format!("reading balance for {}", user_id))?;

    let Some(profile) = profile else {
        return Ok(false);
    };

    let balance = profile.balance.unwrap_or(Decimal::ZERO) + amount;
    store
        .update_by_id(tables::PROFILES, user_id, json!({ "balance": balance }))
        .await
        .with_context(|| format!("writing balance for {}", user_id))?;

    Logger::wallet_event(user_id, "credit", &amount.to_string());
    Ok(true)
}

/// Settle every pending row of `table` that the scores decide
pub async fn settle_bets(
    store: &dyn Datastore,
    table: WagerTable,
    scores: &[MatchScore],
    collector: &MetricsCollector,
) -> anyhow::Result<SettlementSummary> {
    info!("Checking {}...", table.name());
    let pending = store
        .fetch_each::<WagerRow>(
            table.name(),
            &Query::new().eq("status", BetStatus::Pending.as_str()),
        )
        .await
        .with_context(|| format!("fetching pending {}", table.name()))?;

    let mut summary = SettlementSummary {
        malformed: pending.malformed,
        ..SettlementSummary::default()
    };
    if pending.malformed > 0 {
        collector
            .increment(metrics::ROWS_MALFORMED, pending.malformed as u64)
            .await;
    }
    let pending = pending.rows;
    if pending.is_empty() {
        info!("No pending bets in {}", table.name());
        return Ok(summary);
    }

    for wager in &pending {
        if wager.legs().is_empty() {
            summary.skipped += 1;
            continue;
        }

        let (status, pnl) = match evaluate_wager(wager, scores) {
            WagerVerdict::Unsettled => {
                summary.unsettled += 1;
                collector.increment(metrics::BETS_UNSETTLED, 1).await;
                continue;
            }
            WagerVerdict::Lost { pnl } => (BetStatus::Lost, pnl),
            WagerVerdict::Won { pnl, .. } => (BetStatus::Won, pnl),
        };

        info!("Settling {} as {} (PnL: {})", wager.id, status.as_str(), pnl);
        if let Err(e) = store
            .update_by_id(table.name(), &wager.id, json!({ "status": status, "pnl": pnl }))
            .await
        {
            error!("Failed to settle {} {}: {}", table.name(), wager.id, e);
            continue;
        }

        match status {
            BetStatus::Won => {
                summary.won += 1;
                collector.increment(metrics::BETS_WON, 1).await;
            }
            _ => {
                summary.lost += 1;
                collector.increment(metrics::BETS_LOST, 1).await;
            }
        }

        if table == WagerTable::UserBets && status == BetStatus::Won {
            if let Some(user_id) = wager.user_id.as_deref() {
                let payout = wager.stake() + pnl;
                match credit_profile(store, user_id, payout).await {
                    Ok(true) => info!("Credited user {}: +{}", user_id, payout),
                    Ok(false) => warn!("No profile for user {}; payout not credited", user_id),
                    Err(e) => error!("Failed to update balance for {}: {:#}", user_id, e),
                }
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn final_score(home: &str, away: &str, home_goals: u32, away_goals: u32) -> MatchScore {
        serde_json::from_value(json!({
            "id": format!("{}-{}", home, away),
            "completed": true,
            "home_team": home,
            "away_team": away,
            "scores": [
                { "name": home, "score": home_goals.to_string() },
                { "name": away, "score": away_goals.to_string() }
            ]
        }))
        .unwrap()
    }

    fn wager(value: serde_json::Value) -> WagerRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_check_win_markets() {
        let score = final_score("Arsenal", "Chelsea", 2, 1);
        let s = Some(&score);

        assert_eq!(check_win(s, "Arsenal", "Arsenal", "Chelsea"), Some(true));
        assert_eq!(check_win(s, "Home Win", "Arsenal", "Chelsea"), Some(true));
        assert_eq!(check_win(s, "Chelsea", "Arsenal", "Chelsea"), Some(false));
        assert_eq!(check_win(s, "Away Win", "Arsenal", "Chelsea"), Some(false));
        assert_eq!(check_win(s, "Draw", "Arsenal", "Chelsea"), Some(false));
        assert_eq!(check_win(s, "Over 2.5", "Arsenal", "Chelsea"), Some(true));
        assert_eq!(check_win(s, "Under 2.5", "Arsenal", "Chelsea"), Some(false));
        assert_eq!(check_win(s, "Over lots", "Arsenal", "Chelsea"), Some(false));
        assert_eq!(check_win(s, "BTTS", "Arsenal", "Chelsea"), Some(false));
    }

    #[test]
    fn test_check_win_with_huge_scores() {
        let score = final_score("A", "B", u32::MAX, u32::MAX);
        assert_eq!(check_win(Some(&score), "Over 2.5", "A", "B"), Some(true));
        assert_eq!(check_win(Some(&score), "Draw", "A", "B"), Some(true));
    }

    #[test]
    fn test_check_win_unknown_until_final() {
        assert_eq!(check_win(None, "Draw", "A", "B"), None);

        let mut live = final_score("A", "B", 0, 0);
        live.completed = false;
        assert_eq!(check_win(Some(&live), "Draw", "A", "B"), None);

        let mut blank = final_score("A", "B", 0, 0);
        blank.scores = Some(Vec::new());
        assert_eq!(check_win(Some(&blank), "Draw", "A", "B"), None);
    }

    #[test]
    fn test_parse_fixture() {
        assert_eq!(
            parse_fixture("Combo: Arsenal vs Chelsea"),
            Some(("Arsenal".to_string(), "Chelsea".to_string()))
        );
        assert_eq!(
            parse_fixture(" Spurs  vs Fulham "),
            Some(("Spurs".to_string(), "Fulham".to_string()))
        );
        assert_eq!(parse_fixture("Arsenal v Chelsea"), None);
    }

    #[test]
    fn test_any_lost_leg_loses_the_bet() {
        let scores = vec![final_score("A", "B", 1, 0), final_score("C", "D", 0, 0)];
        let bet = wager(json!({
            "id": 1,
            "stake": "40",
            "legs": [
                { "match": "A vs B", "selection": "Away Win" },
                { "match": "C vs D", "selection": "Draw" }
            ]
        }));
        assert_eq!(evaluate_wager(&bet, &scores), WagerVerdict::Lost { pnl: Decimal::from(-40) });
    }

    #[test]
    fn test_all_won_uses_total_or_leg_odds() {
        let scores = vec![final_score("A", "B", 3, 1)];
        let stored = wager(json!({
            "id": 1,
            "stake": 100,
            "total_odds": 2.5,
            "legs": [{ "fullMatch": "A vs B", "team": "A", "odds": 9.0 }]
        }));
        assert_eq!(
            evaluate_wager(&stored, &scores),
            WagerVerdict::Won { odds: 2.5, pnl: Decimal::from(150) }
        );

        let derived = wager(json!({
            "id": 2,
            "stake": 10,
            "total_odds": 0,
            "legs": [
                { "match": "A vs B", "selection": "Over 3.5", "odds": 2.0 },
                { "match": "A vs B", "selection": "Home Win" }
            ]
        }));
        assert_eq!(
            evaluate_wager(&derived, &scores),
            WagerVerdict::Won { odds: 2.0, pnl: Decimal::from(10) }
        );
    }

    #[test]
    fn test_unfinished_or_unparseable_legs_leave_bet_open() {
        let scores = vec![final_score("A", "B", 1, 0)];

        let pending_match = wager(json!({
            "id": 1,
            "stake": 10,
            "legs": [
                { "match": "X vs Y", "selection": "Draw" },
                { "match": "A vs B", "selection": "Away Win" }
            ]
        }));
        // scanning stops at the unknown leg, so the later loss is not seen
        assert_eq!(evaluate_wager(&pending_match, &scores), WagerVerdict::Unsettled);

        let bad_label = wager(json!({
            "id": 2,
            "stake": 10,
            "legs": [
                { "match": "A v B", "selection": "Home Win" },
                { "match": "A vs B", "selection": "Home Win" }
            ]
        }));
        assert_eq!(evaluate_wager(&bad_label, &scores), WagerVerdict::Unsettled);

        let bad_label_then_loss = wager(json!({
            "id": 3,
            "stake": 10,
            "legs": [
                { "match": "nonsense", "selection": "Home Win" },
                { "match": "A vs B", "selection": "Draw" }
            ]
        }));
        assert_eq!(
            evaluate_wager(&bad_label_then_loss, &scores),
            WagerVerdict::Lost { pnl: Decimal::from(-10) }
        );
    }
}
