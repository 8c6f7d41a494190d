//! League engine: the daily AI trading league simulation, bet settlement,
//! operator wallet tooling and the player-facing operations, all backed by
//! the hosted Postgres REST datastore.

pub mod actions;
pub mod config;
pub mod inspect;
pub mod league;
pub mod models;
pub mod observability;
pub mod settlement;
pub mod store;
pub mod wallet;

pub use actions::{ActionError, ActionResult, PlayerActions};
pub use config::{load_dotenv, EngineConfig, LeagueSettings, OddsConfig};
pub use league::{DayReport, LeagueEngine};
pub use observability::{init_tracing, MetricsCollector};
pub use settlement::{settle_bets, SettlementSummary, WagerTable};
pub use store::{Datastore, MemoryStore, PostgrestStore, StoreError, StoreExt};
