//! Operations a signed-in player performs from the dashboard
//!
//! Callers resolve the session first and pass the user id, or `None` when
//! nobody is signed in.

use chrono::{Duration, NaiveDate, SecondsFormat, Utc};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::league::options::increment_balance;
use crate::models::{
    default_payout_multiplier, Achievement, BetLeg, BetStatus, BlackSwanOption, Guild,
    Membership, Notification, OptionStatus, ParlayTicket, Proposal,
};
use crate::observability::Logger;
use crate::store::{procedures, tables, Datastore, Query, StoreError, StoreExt};

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Invalid package: {0}")]
    UnknownPackage(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

fn signed_in(user_id: Option<&str>) -> ActionResult<&str> {
    user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(ActionError::Unauthorized)
}

/// A credit bundle sold at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditPackage {
    pub id: &'static str,
    pub credits: u32,
    pub subscription: bool,
}

pub static PACKAGES: [CreditPackage; 4] = [
    CreditPackage { id: "starter", credits: 1000, subscription: false },
    CreditPackage { id: "governor", credits: 5000, subscription: false },
    CreditPackage { id: "institutional", credits: 15000, subscription: false },
    CreditPackage { id: "subscription_pro", credits: 2000, subscription: true },
];

/// Days of pro status a subscription buys
pub const PRO_PERIOD_DAYS: i64 = 30;

pub fn find_package(id: &str) -> Option<&'static CreditPackage> {
    PACKAGES.iter().find(|p| p.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub package: CreditPackage,
    pub reference: String,
}

/// Request body for buying a black swan option
#[derive(Debug, Clone, Deserialize)]
pub struct OptionPurchase {
    #[serde(default)]
    pub model_id: Option<String>,
    pub match_id: String,
    pub premium: Decimal,
    pub strike_confidence: f64,
    #[serde(default)]
    pub payout_multiplier: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteSide {
    Yes,
    No,
}

/// One dashboard history bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub bets_placed: usize,
    pub total_pnl: Decimal,
}

/// A slip as built in the parlay lab
#[derive(Debug, Clone, Deserialize)]
pub struct ParlaySlip {
    pub legs: Vec<SlipLeg>,
    #[serde(default)]
    pub odds: Option<f64>,
    #[serde(default)]
    pub stake: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlipLeg {
    #[serde(rename = "fullMatch", default, skip_serializing_if = "Option::is_none")]
    pub full_match: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds: Option<f64>,
}

/// Stake used when a slip does not carry one
pub fn default_slip_stake() -> Decimal {
    Decimal::from(100)
}

/// The ticket leg recorded for a slip leg
pub fn ticket_leg(leg: &SlipLeg) -> BetLeg {
    let selection = if leg.market.as_deref() == Some("Moneyline") {
        leg.team.clone()
    } else {
        leg.selection.clone().or_else(|| leg.market.clone())
    };

    BetLeg {
        fixture: leg.full_match.clone().or_else(|| leg.team.clone()),
        selection,
        result: Some("Pending".to_string()),
        ..BetLeg::default()
    }
}

/// `tx_usr_` followed by six hex digits
pub fn user_ticket_id<R: Rng>(rng: &mut R) -> String {
    format!("tx_usr_{:06x}", rng.gen_range(0..0x100_0000u32))
}

/// Group tickets by day, newest day first. Undated tickets are left out.
pub fn aggregate_history(tickets: &[ParlayTicket]) -> Vec<HistoryDay> {
    let mut days: BTreeMap<NaiveDate, HistoryDay> = BTreeMap::new();
    for ticket in tickets {
        let Some(date) = ticket.date else { continue };
        let day = days.entry(date).or_insert(HistoryDay {
            date,
            bets_placed: 0,
            total_pnl: Decimal::ZERO,
        });
        day.bets_placed += 1;
        day.total_pnl += ticket.pnl.unwrap_or(Decimal::ZERO);
    }
    days.into_values().rev().collect()
}

#[derive(Debug, Deserialize)]
struct BalanceRow {
    #[serde(default)]
    balance: Option<Decimal>,
}

pub struct PlayerActions {
    store: Arc<dyn Datastore>,
}

impl PlayerActions {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------
    // Guilds
    // ------------------------------------------------------------------

    /// All guilds, best 7-day return first
    pub async fn list_guilds(&self) -> ActionResult<Vec<Guild>> {
        Ok(self
            .store
            .fetch(tables::GUILDS, &Query::new().order_desc("roi_7d"))
            .await?)
    }

    pub async fn memberships(&self, user_id: Option<&str>) -> ActionResult<Vec<Membership>> {
        let user_id = signed_in(user_id)?;
        Ok(self
            .store
            .fetch(
                tables::GUILD_MEMBERSHIPS,
                &Query::new()
                    .columns("guild_id, staked_capital")
                    .eq("user_id", user_id),
            )
            .await?)
    }

    /// Stake capital in a guild
    pub async fn join_guild(
        &self,
        user_id: Option<&str>,
        guild_id: &str,
        amount: Decimal,
    ) -> ActionResult<()> {
        let user_id = signed_in(user_id)?;
        if guild_id.trim().is_empty() || amount <= Decimal::ZERO {
            return Err(ActionError::InvalidRequest(
                "Missing guildId or amount".to_string(),
            ));
        }

        self.store
            .rpc(
                procedures::JOIN_GUILD,
                json!({
                    "p_user_id": user_id,
                    "p_guild_id": guild_id,
                    "p_amount": amount.to_f64().unwrap_or_default(),
                }),
            )
            .await?;
        info!("User {} joined guild {} with {}", user_id, guild_id, amount);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Black swan options
    // ------------------------------------------------------------------

    pub async fn list_options(&self, user_id: Option<&str>) -> ActionResult<Vec<BlackSwanOption>> {
        let user_id = signed_in(user_id)?;
        Ok(self
            .store
            .fetch(
                tables::BLACK_SWAN_OPTIONS,
                &Query::new().eq("user_id", user_id).order_desc("created_at"),
            )
            .await?)
    }

    /// Buy a hedge: check funds, record the option, then debit the premium
    pub async fn purchase_option(
        &self,
        user_id: Option<&str>,
        request: OptionPurchase,
    ) -> ActionResult<BlackSwanOption> {
        let user_id = signed_in(user_id)?;
        if request.premium <= Decimal::ZERO {
            return Err(ActionError::InvalidRequest(
                "premium must be positive".to_string(),
            ));
        }

        let profile: Option<BalanceRow> = self
            .store
            .fetch_first(
                tables::PROFILES,
                &Query::new().columns("balance").eq("id", user_id),
            )
            .await?;
        let balance = profile.and_then(|p| p.balance).unwrap_or(Decimal::ZERO);
        if balance < request.premium {
            return Err(ActionError::InsufficientBalance);
        }

        let row = json!({
            "user_id": user_id,
            "model_id": request.model_id,
            "match_id": request.match_id,
            "premium": request.premium,
            "strike_confidence": request.strike_confidence,
            "payout_multiplier": request.payout_multiplier.unwrap_or_else(default_payout_multiplier),
            "status": OptionStatus::Pending,
        });
        let stored = self.store.insert_one(tables::BLACK_SWAN_OPTIONS, &row).await?;
        let option: BlackSwanOption = serde_json::from_value(stored).map_err(StoreError::from)?;

        increment_balance(self.store.as_ref(), user_id, -request.premium).await?;
        Logger::wallet_event(user_id, "option_premium", &(-request.premium).to_string());
        Ok(option)
    }

    // ------------------------------------------------------------------
    // Governance
    // ------------------------------------------------------------------

    /// Proposals, newest first
    pub async fn list_proposals(&self) -> ActionResult<Vec<Proposal>> {
        Ok(self
            .store
            .fetch(
                tables::GOVERNANCE_PROPOSALS,
                &Query::new().order_desc("created_at"),
            )
            .await?)
    }

    pub async fn cast_vote(
        &self,
        user_id: Option<&str>,
        proposal_id: &str,
        side: VoteSide,
        power: f64,
    ) -> ActionResult<()> {
        let user_id = signed_in(user_id)?;
        self.store
            .rpc(
                procedures::CAST_GOVERNANCE_VOTE,
                json!({
                    "p_user_id": user_id,
                    "p_proposal_id": proposal_id,
                    "p_vote_type": side,
                    "p_power": power,
                }),
            )
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Wallet and feed
    // ------------------------------------------------------------------

    pub async fn balance(&self, user_id: Option<&str>) -> ActionResult<Decimal> {
        let user_id = signed_in(user_id)?;
        let profile: Option<BalanceRow> = self
            .store
            .fetch_first(
                tables::PROFILES,
                &Query::new().columns("balance").eq("id", user_id),
            )
            .await?;
        let profile = profile.ok_or_else(|| StoreError::NotFound(tables::PROFILES.to_string()))?;
        Ok(profile.balance.unwrap_or(Decimal::ZERO))
    }

    /// The 20 newest notifications
    pub async fn notifications(&self, user_id: Option<&str>) -> ActionResult<Vec<Notification>> {
        let user_id = signed_in(user_id)?;
        Ok(self
            .store
            .fetch(
                tables::USER_NOTIFICATIONS,
                &Query::new()
                    .eq("user_id", user_id)
                    .order_desc("created_at")
                    .limit(20),
            )
            .await?)
    }

    pub async fn list_achievements(&self) -> ActionResult<Vec<Achievement>> {
        Ok(self
            .store
            .fetch(tables::AI_ACHIEVEMENTS, &Query::new().order_desc("earned_at"))
            .await?)
    }

    /// Simulated purchase of a credit package
    pub async fn checkout(&self, user_id: Option<&str>, package_id: &str) -> ActionResult<CheckoutReceipt> {
        let user_id = signed_in(user_id)?;
        let package =
            find_package(package_id).ok_or_else(|| ActionError::UnknownPackage(package_id.to_string()))?;

        let now = Utc::now();
        let reference = format!("MOCK_TX_{}", now.timestamp_millis());
        let kind = if package.subscription { "SUBSCRIPTION" } else { "PURCHASE" };
        self.store
            .rpc(
                procedures::TOPUP_USER_CREDITS,
                json!({
                    "p_user_id": user_id,
                    "p_amount": package.credits,
                    "p_type": kind,
                    "p_desc": format!("Acquired {} package", package.id),
                    "p_ref": reference,
                }),
            )
            .await?;

        if package.subscription {
            let expires = now + Duration::days(PRO_PERIOD_DAYS);
            self.store
                .update_by_id(
                    tables::PROFILES,
                    user_id,
                    json!({
                        "is_pro": true,
                        "pro_expires_at": expires.to_rfc3339_opts(SecondsFormat::Millis, true),
                    }),
                )
                .await?;
        }

        Logger::wallet_event(user_id, "checkout", &package.credits.to_string());
        Ok(CheckoutReceipt {
            package: *package,
            reference,
        })
    }

    // ------------------------------------------------------------------
    // Parlay tickets
    // ------------------------------------------------------------------

    /// Ticket results grouped by day, newest day first
    pub async fn betting_history(&self) -> ActionResult<Vec<HistoryDay>> {
        let tickets: Vec<ParlayTicket> = self
            .store
            .fetch(tables::PARLAY_TICKETS, &Query::new().order_desc("created_at"))
            .await?;
        Ok(aggregate_history(&tickets))
    }

    /// Save a slip as a ticket, linking a user bet when someone is signed in
    pub async fn record_parlay<R: Rng>(
        &self,
        user_id: Option<&str>,
        slip: &ParlaySlip,
        rng: &mut R,
    ) -> ActionResult<ParlayTicket> {
        if slip.legs.is_empty() {
            return Err(ActionError::InvalidRequest("slip has no legs".to_string()));
        }

        let stake = slip.stake.unwrap_or_else(default_slip_stake);
        let legs: Vec<BetLeg> = slip.legs.iter().map(ticket_leg).collect();
        let entry = json!({
            "ticket_id": user_ticket_id(rng),
            "date": Utc::now().date_naive().to_string(),
            "type": format!("{}-Fold Parlay", slip.legs.len()),
            "legs": legs,
            "total_odds": slip.odds,
            "stake": stake,
            "status": BetStatus::Pending,
            "pnl": 0,
            "roi": "0%",
            "verified_on": "User Action",
        });

        let stored = self.store.insert_one(tables::PARLAY_TICKETS, &entry).await?;
        let ticket: ParlayTicket = serde_json::from_value(stored).map_err(StoreError::from)?;

        if let Some(user_id) = user_id.filter(|id| !id.trim().is_empty()) {
            let bet = json!({
                "user_id": user_id,
                "ticket_id": ticket.id,
                "stake": stake,
                "status": BetStatus::Pending,
                "pnl": 0,
                "selection_details": slip.legs,
            });
            // The ticket stands even if the link fails
            if let Err(e) = self.store.insert(tables::USER_BETS, vec![bet]).await {
                error!("Failed to link user bet for ticket {}: {}", ticket.id, e);
            }
        }

        Ok(ticket)
    }
}
