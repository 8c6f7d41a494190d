//! Row types for the hosted league tables

pub(crate) mod lenient;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// League
// ---------------------------------------------------------------------------

/// A fictitious AI trader (`ai_models`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiModel {
    pub model_id: String,
    pub name: String,
    #[serde(default)]
    pub style: Option<String>,
    /// JSON object encoded as text, rendered by the dashboard radar chart
    #[serde(default)]
    pub capability_radar: Option<String>,
}

/// Per-model per-day ledger row (`ai_league_stats`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStat {
    pub model_id: String,
    pub date: NaiveDate,
    pub core_pnl: Decimal,
    pub challenge_pnl: Decimal,
    pub high_yield_pnl: Decimal,
    pub total_day_pnl: Decimal,
    pub wallet_balance: Decimal,
    pub roi: f64,
    pub bets_count: u32,
}

/// A match carrying the quant desk's analysis (`matches`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSignal {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub quant_analysis: Option<QuantAnalysis>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuantAnalysis {
    #[serde(default)]
    pub best_bet: Option<BestBet>,
    #[serde(default)]
    pub recommendations: HashMap<String, Recommendation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BestBet {
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub win_rate: Option<f64>,
    /// Keys the engine does not read; they still make the bet non-empty
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BestBet {
    /// True only for `{}`
    pub fn is_empty(&self) -> bool {
        self.market.is_none() && self.win_rate.is_none() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub market_odds: Option<f64>,
}

/// Win rate assumed when the analysis does not carry one
pub const DEFAULT_WIN_RATE: f64 = 0.5;

impl MatchSignal {
    /// The best bet, if the analysis has a usable one
    pub fn best_bet(&self) -> Option<&BestBet> {
        self.quant_analysis
            .as_ref()?
            .best_bet
            .as_ref()
            .filter(|b| !b.is_empty())
    }

    /// Model confidence in the best bet
    pub fn win_probability(&self) -> f64 {
        self.quant_analysis
            .as_ref()
            .and_then(|a| a.best_bet.as_ref())
            .and_then(|b| b.win_rate)
            .unwrap_or(DEFAULT_WIN_RATE)
    }

    /// Market odds quoted for the best bet's market, or `fallback`
    pub fn market_odds(&self, fallback: f64) -> f64 {
        let Some(analysis) = self.quant_analysis.as_ref() else {
            return fallback;
        };
        analysis
            .best_bet
            .as_ref()
            .and_then(|b| b.market.as_ref())
            .and_then(|m| analysis.recommendations.get(m))
            .and_then(|r| r.market_odds)
            .unwrap_or(fallback)
    }
}

/// Badge kinds (`ai_achievements.achievement_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AchievementKind {
    #[serde(rename = "Alpha King")]
    AlphaKing,
    #[serde(rename = "God Slayer")]
    GodSlayer,
    #[serde(rename = "Iron Shield")]
    IronShield,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AchievementKind::AlphaKing => write!(f, "Alpha King"),
            AchievementKind::GodSlayer => write!(f, "God Slayer"),
            AchievementKind::IronShield => write!(f, "Iron Shield"),
            AchievementKind::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub model_id: String,
    pub achievement_type: AchievementKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<DateTime<Utc>>,
}

/// One day's league headline (`ai_league_news`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEntry {
    pub date: NaiveDate,
    pub headline: String,
    pub top_performer: String,
    pub top_pnl: Decimal,
}

// ---------------------------------------------------------------------------
// Governance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Active,
    Executed,
    Defeated,
    #[serde(other)]
    Unknown,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Active => "ACTIVE",
            ProposalStatus::Executed => "EXECUTED",
            ProposalStatus::Defeated => "DEFEATED",
            ProposalStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Votes needed to pass when a proposal does not set its own threshold
pub const DEFAULT_PROPOSAL_THRESHOLD: f64 = 1000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub status: ProposalStatus,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub yes_votes: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub no_votes: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub target_model_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub adjustment_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub expires_at: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub active_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub active_until: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Proposal {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    pub fn yes(&self) -> f64 {
        self.yes_votes.unwrap_or(0.0)
    }

    pub fn no(&self) -> f64 {
        self.no_votes.unwrap_or(0.0)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(DEFAULT_PROPOSAL_THRESHOLD)
    }
}

/// A ballot (`governance_votes`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: String,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub power: Option<f64>,
}

// ---------------------------------------------------------------------------
// Guilds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Low Risk")]
    Low,
    #[default]
    #[serde(rename = "Medium Risk", other)]
    Medium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guild {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub roi_7d: Option<f64>,
}

impl Guild {
    pub fn risk(&self) -> RiskLevel {
        self.risk_level.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    #[serde(deserialize_with = "lenient::id")]
    pub guild_id: String,
    #[serde(default)]
    pub staked_capital: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Options, bets, profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionStatus {
    Pending,
    Settled,
    Expired,
}

/// Multiplier applied to a black swan premium when none was chosen
pub fn default_payout_multiplier() -> Decimal {
    Decimal::TWO
}

/// A hedge that pays when a high-confidence call fails (`black_swan_options`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackSwanOption {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(deserialize_with = "lenient::id")]
    pub match_id: String,
    pub premium: Decimal,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub strike_confidence: Option<f64>,
    #[serde(default)]
    pub payout_multiplier: Option<Decimal>,
    pub status: OptionStatus,
    #[serde(default)]
    pub payout: Option<Decimal>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl BlackSwanOption {
    pub fn multiplier(&self) -> Decimal {
        self.payout_multiplier
            .unwrap_or_else(default_payout_multiplier)
    }

    /// Confidence the AI must meet for the option to be live; a missing
    /// strike never triggers
    pub fn strike(&self) -> f64 {
        self.strike_confidence.unwrap_or(f64::INFINITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    #[serde(other)]
    Void,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "PENDING",
            BetStatus::Won => "WON",
            BetStatus::Lost => "LOST",
            BetStatus::Void => "VOID",
        }
    }
}

/// One selection on a ticket. Tickets written by the dashboard and by the
/// desk use different keys for the fixture and the pick, so all are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetLeg {
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
    #[serde(rename = "fullMatch", default, skip_serializing_if = "Option::is_none")]
    pub full_match: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub odds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl BetLeg {
    /// "Home vs Away" label, whichever key carried it
    pub fn fixture_label(&self) -> Option<&str> {
        non_empty(&self.fixture).or_else(|| non_empty(&self.full_match))
    }

    /// The side or market picked
    pub fn pick(&self) -> Option<&str> {
        non_empty(&self.selection).or_else(|| non_empty(&self.team))
    }
}

/// Columns shared by `parlay_tickets` and `user_bets` that settlement needs
#[derive(Debug, Clone, Deserialize)]
pub struct WagerRow {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub stake: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub total_odds: Option<f64>,
    #[serde(default)]
    pub selection_details: Option<Vec<BetLeg>>,
    #[serde(default)]
    pub legs: Option<Vec<BetLeg>>,
}

impl WagerRow {
    pub fn legs(&self) -> &[BetLeg] {
        match (&self.selection_details, &self.legs) {
            (Some(details), _) if !details.is_empty() => details.as_slice(),
            (_, Some(legs)) => legs.as_slice(),
            _ => &[],
        }
    }

    pub fn stake(&self) -> Decimal {
        self.stake.unwrap_or(Decimal::ZERO)
    }
}

/// A bet slip record (`parlay_tickets`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayTicket {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub ticket_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub legs: Vec<BetLeg>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub total_odds: Option<f64>,
    #[serde(default)]
    pub stake: Option<Decimal>,
    pub status: BetStatus,
    #[serde(default)]
    pub pnl: Option<Decimal>,
    #[serde(default)]
    pub verified_on: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A user's stake on a ticket (`user_bets`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBet {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub ticket_id: Option<String>,
    #[serde(default)]
    pub stake: Option<Decimal>,
    pub status: BetStatus,
    #[serde(default)]
    pub pnl: Option<Decimal>,
    #[serde(default)]
    pub selection_details: Option<Vec<BetLeg>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Credit wallet and cosmetic profile fields (`profiles`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_pro: Option<bool>,
}

impl Profile {
    pub fn balance(&self) -> Decimal {
        self.balance.unwrap_or(Decimal::ZERO)
    }
}

/// Account from the hosted auth admin listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
