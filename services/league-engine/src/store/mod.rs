//! Datastore access
//!
//! Every piece of league state lives in the hosted backend. The engine only
//! ever talks to it through [`Datastore`]: table reads and writes plus named
//! stored procedures.

mod error;
pub mod memory;
pub mod postgrest;
mod query;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, RpcCall};
pub use postgrest::PostgrestStore;
pub use query::{render_value, Filter, FilterOp, Order, Query};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use tracing::warn;

use crate::models::AuthUser;

/// Table names
pub mod tables {
    pub const AI_MODELS: &str = "ai_models";
    pub const AI_LEAGUE_STATS: &str = "ai_league_stats";
    pub const AI_ACHIEVEMENTS: &str = "ai_achievements";
    pub const AI_LEAGUE_NEWS: &str = "ai_league_news";
    pub const MATCHES: &str = "matches";
    pub const BLACK_SWAN_OPTIONS: &str = "black_swan_options";
    pub const GOVERNANCE_PROPOSALS: &str = "governance_proposals";
    pub const GOVERNANCE_VOTES: &str = "governance_votes";
    pub const GUILDS: &str = "guilds";
    pub const GUILD_MEMBERSHIPS: &str = "guild_memberships";
    pub const PARLAY_TICKETS: &str = "parlay_tickets";
    pub const USER_BETS: &str = "user_bets";
    pub const PROFILES: &str = "profiles";
    pub const USER_NOTIFICATIONS: &str = "user_notifications";
}

/// Stored procedure names
pub mod procedures {
    pub const AWARD_USER_XP: &str = "award_user_xp";
    pub const INCREMENT_PROFILE_BALANCE: &str = "increment_profile_balance";
    pub const JOIN_GUILD: &str = "join_guild";
    pub const CAST_GOVERNANCE_VOTE: &str = "cast_governance_vote";
    pub const TOPUP_USER_CREDITS: &str = "topup_user_credits";
}

/// Generic remote table client
#[async_trait::async_trait]
pub trait Datastore: Send + Sync {
    /// Rows matching `query`
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Value>>;

    /// Insert rows, returning them as stored (ids assigned)
    async fn insert(&self, table: &str, rows: Vec<Value>) -> StoreResult<Vec<Value>>;

    /// Insert or merge rows keyed on the `on_conflict` columns
    async fn upsert(&self, table: &str, rows: Vec<Value>, on_conflict: &[&str]) -> StoreResult<()>;

    /// Patch every row matching all `filters`; returns rows touched
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> StoreResult<usize>;

    /// Invoke a stored procedure
    async fn rpc(&self, function: &str, args: Value) -> StoreResult<Value>;

    /// Accounts known to the hosted auth service
    async fn list_auth_users(&self) -> StoreResult<Vec<AuthUser>>;
}

/// Rows decoded one at a time by [`StoreExt::fetch_each`]
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub rows: Vec<T>,
    /// Rows that did not decode and were left out
    pub malformed: usize,
}

/// Typed helpers over [`Datastore`]
#[async_trait::async_trait]
pub trait StoreExt: Datastore {
    async fn fetch<T>(&self, table: &str, query: &Query) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let rows = self.select(table, query).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .collect()
    }

    /// Like [`StoreExt::fetch`], but a row that does not decode is logged and
    /// skipped instead of failing the whole read
    async fn fetch_each<T>(&self, table: &str, query: &Query) -> StoreResult<Decoded<T>>
    where
        T: DeserializeOwned + Send,
    {
        let rows = self.select(table, query).await?;
        let mut decoded = Decoded {
            rows: Vec::with_capacity(rows.len()),
            malformed: 0,
        };
        for row in rows {
            let id = row.get("id").map(render_value).unwrap_or_default();
            match serde_json::from_value::<T>(row) {
                Ok(value) => decoded.rows.push(value),
                Err(e) => {
                    warn!("Skipping malformed {} row {}: {}", table, id, e);
                    decoded.malformed += 1;
                }
            }
        }
        Ok(decoded)
    }

    async fn fetch_first<T>(&self, table: &str, query: &Query) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        let query = query.clone().limit(1);
        Ok(self.fetch::<T>(table, &query).await?.into_iter().next())
    }

    async fn insert_one<T>(&self, table: &str, row: &T) -> StoreResult<Value>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(row)?;
        self.insert(table, vec![value])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(table.to_string()))
    }

    async fn update_by_id(&self, table: &str, id: &str, patch: Value) -> StoreResult<usize> {
        self.update(table, &[Filter::eq("id", id)], patch).await
    }
}

impl<D: Datastore + ?Sized> StoreExt for D {}
