//! Read-only checks operators run after a deploy or a manual settle

use anyhow::Context;
use tracing::info;

use crate::models::{BetLeg, ParlayTicket, UserBet};
use crate::store::{tables, Datastore, Query, StoreExt};

#[derive(Debug, Clone)]
pub struct LatestBetReport {
    pub bet: UserBet,
    /// Legs of the linked ticket; `None` for an orphaned bet
    pub ticket_legs: Option<Vec<BetLeg>>,
}

/// The newest user bet and what its ticket holds
pub async fn latest_bet_report(store: &dyn Datastore) -> anyhow::Result<Option<LatestBetReport>> {
    let bet: Option<UserBet> = store
        .fetch_first(tables::USER_BETS, &Query::new().order_desc("created_at"))
        .await
        .context("fetching latest bet")?;
    let Some(bet) = bet else {
        info!("No bets found");
        return Ok(None);
    };

    info!("Bet ID: {}", bet.id);
    info!("Status: {}", bet.status.as_str());
    info!("Ticket ID: {}", bet.ticket_id.as_deref().unwrap_or("-"));

    let ticket: Option<ParlayTicket> = match bet.ticket_id.as_deref() {
        Some(ticket_id) => store
            .fetch_first(tables::PARLAY_TICKETS, &Query::new().eq("id", ticket_id))
            .await
            .context("fetching linked ticket")?,
        None => None,
    };

    let ticket_legs = ticket.map(|t| t.legs);
    match &ticket_legs {
        Some(legs) => info!("Details: {}", serde_json::to_string(legs)?),
        None => info!("No linked ticket found (orphaned bet?)"),
    }

    Ok(Some(LatestBetReport { bet, ticket_legs }))
}

/// Stat rows recorded per model id
pub async fn model_stats_report(
    store: &dyn Datastore,
    model_ids: &[&str],
) -> anyhow::Result<Vec<(String, usize)>> {
    let mut counts = Vec::with_capacity(model_ids.len());
    for model_id in model_ids {
        let rows = store
            .select(
                tables::AI_LEAGUE_STATS,
                &Query::new().columns("model_id").eq("model_id", *model_id),
            )
            .await
            .with_context(|| format!("counting stats for {}", model_id))?;

        if rows.is_empty() {
            info!("No stats found for {}", model_id);
        } else {
            info!("Stats found for {}: {} rows", model_id, rows.len());
        }
        counts.push((model_id.to_string(), rows.len()));
    }
    Ok(counts)
}
