//! Operator wallet maintenance: promotional credits and the demo settle

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::models::{BetStatus, ParlayTicket, Profile};
use crate::observability::Logger;
use crate::store::{tables, Datastore, Filter, Query, StoreExt};

/// Balance every account is topped up to by the promotional credit scripts
pub fn promotional_balance() -> Decimal {
    Decimal::new(155_400, 2)
}

/// Balance a profile created by the demo settle starts with
pub fn demo_opening_balance() -> Decimal {
    Decimal::from(1000)
}

pub const DEMO_USERNAME: &str = "DemoUser";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditReport {
    pub updated: usize,
    pub failed: usize,
    /// Balances read back after the update
    pub balances: Vec<(String, Option<Decimal>)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub updated: usize,
    pub created: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoSettlement {
    pub ticket_id: String,
    pub user_id: String,
    pub linked_new_bet: bool,
    pub payout: Decimal,
    pub profit: Decimal,
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct BalanceCheck {
    id: String,
    #[serde(default)]
    balance: Option<Decimal>,
}

/// Set every existing profile's balance to the promotional amount
pub async fn credit_all_users(store: &dyn Datastore) -> anyhow::Result<CreditReport> {
    let profiles: Vec<Profile> = store
        .fetch(tables::PROFILES, &Query::new())
        .await
        .context("fetching profiles")?;

    let mut report = CreditReport::default();
    if profiles.is_empty() {
        info!("No profiles found");
        return Ok(report);
    }

    let amount = promotional_balance();
    info!("Found {} profiles. Updating balance to ${}...", profiles.len(), amount);
    for profile in &profiles {
        match store
            .update_by_id(tables::PROFILES, &profile.id, json!({ "balance": amount }))
            .await
        {
            Ok(_) => {
                report.updated += 1;
                Logger::wallet_event(&profile.id, "promotional_reset", &amount.to_string());
            }
            Err(e) => {
                report.failed += 1;
                error!("Failed to update {}: {}", profile.id, e);
            }
        }
    }

    let verify: Vec<BalanceCheck> = store
        .fetch(tables::PROFILES, &Query::new().columns("id, balance"))
        .await
        .context("verifying balances")?;
    for row in verify {
        info!(
            "User {} Balance: {}",
            row.id,
            row.balance.map(|b| b.to_string()).unwrap_or_else(|| "null".to_string())
        );
        report.balances.push((row.id, row.balance));
    }

    Ok(report)
}

/// Display name for a profile created from an auth account
pub fn display_name(email: Option<&str>) -> String {
    email
        .and_then(|e| e.split('@').next())
        .filter(|local| !local.is_empty())
        .unwrap_or("Trader")
        .to_string()
}

/// Give every auth account a profile holding the promotional balance
pub async fn sync_and_credit_users(store: &dyn Datastore) -> anyhow::Result<SyncReport> {
    let users = store
        .list_auth_users()
        .await
        .context("listing auth users")?;

    let mut report = SyncReport::default();
    if users.is_empty() {
        warn!("No users returned from the auth admin listing");
        return Ok(report);
    }

    let amount = promotional_balance();
    info!("Found {} Auth Users. Checking profiles...", users.len());
    for user in &users {
        let email = user.email.as_deref().unwrap_or("(no email)");
        let existing = match store
            .select(tables::PROFILES, &Query::new().columns("id").eq("id", user.id.as_str()))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                report.failed += 1;
                error!("Profile lookup failed for {}: {}", user.id, e);
                continue;
            }
        };

        if existing.is_empty() {
            info!("[MISSING PROFILE] User {} ({}) has no profile. Creating...", email, user.id);
            let row = json!({
                "id": user.id,
                "full_name": display_name(user.email.as_deref()),
                "avatar_url": "",
                "balance": amount,
                "updated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            });
            match store.insert(tables::PROFILES, vec![row]).await {
                Ok(_) => {
                    report.created += 1;
                    Logger::wallet_event(&user.id, "profile_created", &amount.to_string());
                }
                Err(e) => {
                    report.failed += 1;
                    error!("FAILED to create profile for {}: {}", user.id, e);
                }
            }
        } else {
            info!("[EXISTING] User {} ({}). Updating balance...", email, user.id);
            match store
                .update_by_id(tables::PROFILES, &user.id, json!({ "balance": amount }))
                .await
            {
                Ok(_) => {
                    report.updated += 1;
                    Logger::wallet_event(&user.id, "promotional_reset", &amount.to_string());
                }
                Err(e) => {
                    report.failed += 1;
                    error!("FAILED to update {}: {}", user.id, e);
                }
            }
        }
    }

    Ok(report)
}

/// Link the newest ticket to the first account and force it to a win.
/// `None` when there is no ticket or no account to use.
pub async fn force_settle_demo(store: &dyn Datastore) -> anyhow::Result<Option<DemoSettlement>> {
    let ticket: Option<ParlayTicket> = store
        .fetch_first(tables::PARLAY_TICKETS, &Query::new().order_desc("created_at"))
        .await
        .context("fetching latest ticket")?;
    let Some(ticket) = ticket else {
        info!("No tickets found");
        return Ok(None);
    };
    info!(
        "Found Ticket: {} (Status: {})",
        ticket.ticket_id.as_deref().unwrap_or(ticket.id.as_str()),
        ticket.status.as_str()
    );

    let users = store.list_auth_users().await.context("listing auth users")?;
    let Some(user) = users.into_iter().next() else {
        info!("No users found in Auth");
        return Ok(None);
    };
    info!("Linking to User ID: {}", user.id);

    let stake = ticket.stake.unwrap_or(Decimal::ZERO);
    let linked = store
        .select(
            tables::USER_BETS,
            &Query::new().columns("id").eq("ticket_id", ticket.id.as_str()),
        )
        .await
        .context("checking linked bets")?;
    let linked_new_bet = linked.is_empty();
    if linked_new_bet {
        store
            .insert(
                tables::USER_BETS,
                vec![json!({
                    "user_id": user.id,
                    "ticket_id": ticket.id,
                    "stake": stake,
                    "status": BetStatus::Pending,
                    "pnl": 0,
                    "selection_details": ticket.legs,
                })],
            )
            .await
            .context("linking bet")?;
        info!("Bet Linked Successfully");
    } else {
        info!("Bet already linked (skipping insert)");
    }

    let odds = ticket
        .total_odds
        .unwrap_or_else(|| ticket.legs.iter().map(|l| l.odds.unwrap_or(1.0)).product());
    let payout = (stake * Decimal::from_f64(odds).unwrap_or(Decimal::ONE)).round_dp(2);
    let profit = payout - stake;
    info!("Simulating Win: payout=${:.2}, profit=${:.2}", payout, profit);

    store
        .update_by_id(
            tables::PARLAY_TICKETS,
            &ticket.id,
            json!({ "status": BetStatus::Won, "pnl": profit, "verified_on": "Simulated Settle" }),
        )
        .await
        .context("settling ticket")?;
    store
        .update(
            tables::USER_BETS,
            &[Filter::eq("ticket_id", ticket.id.as_str())],
            json!({ "status": BetStatus::Won, "pnl": profit }),
        )
        .await
        .context("settling linked bet")?;

    let profile: Option<Profile> = store
        .fetch_first(tables::PROFILES, &Query::new().eq("id", user.id.as_str()))
        .await
        .context("reading profile")?;
    let previous_balance = match profile {
        Some(profile) => profile.balance(),
        None => {
            info!("Profile not found. Creating profile...");
            store
                .insert(
                    tables::PROFILES,
                    vec![json!({
                        "id": user.id,
                        "balance": demo_opening_balance(),
                        "username": DEMO_USERNAME,
                    })],
                )
                .await
                .context("creating demo profile")?;
            demo_opening_balance()
        }
    };

    let new_balance = previous_balance + payout;
    store
        .update_by_id(tables::PROFILES, &user.id, json!({ "balance": new_balance }))
        .await
        .context("crediting payout")?;
    Logger::wallet_event(&user.id, "demo_payout", &payout.to_string());
    info!("User Balance Updated: ${} -> ${}", previous_balance, new_balance);

    Ok(Some(DemoSettlement {
        ticket_id: ticket.id,
        user_id: user.id,
        linked_new_bet,
        payout,
        profit,
        previous_balance,
        new_balance,
    }))
}
