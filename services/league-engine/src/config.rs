//! Engine configuration
//!
//! Everything comes from the environment. `load_dotenv` pulls in
//! `backend/.env` and then `.env` when present; variables already set in
//! the process win.

use anyhow::anyhow;
use scores_retrieval::{OddsApiClient, DEFAULT_DAYS_FROM, DEFAULT_SPORT};
use tracing::debug;

use crate::store::{PostgrestStore, StoreResult};

/// Environment variable names
pub mod keys {
    pub const SUPABASE_URL: &str = "NEXT_PUBLIC_SUPABASE_URL";
    pub const SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
    pub const ODDS_API_KEY: &str = "ODDS_API_KEY";
    pub const ODDS_SPORT: &str = "ODDS_SPORT";
    pub const ODDS_DAYS_FROM: &str = "ODDS_DAYS_FROM";
    pub const SIGNAL_LIMIT: &str = "LEAGUE_SIGNAL_LIMIT";
}

/// Read `backend/.env` then `.env`; both are optional
pub fn load_dotenv() {
    for path in ["backend/.env", ".env"] {
        match dotenvy::from_filename(path) {
            Ok(loaded) => debug!("Loaded environment from {}", loaded.display()),
            Err(e) => debug!("No {} loaded: {}", path, e),
        }
    }
}

/// Fixed rules of the league
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueSettings {
    pub starting_capital: f64,
    /// Flat stake on every simulated bet
    pub stake: f64,
    /// Odds used when the analysis quotes none for the best bet's market
    pub default_odds: f64,
    /// Days a passed proposal's modifier stays active
    pub modifier_window_days: i64,
    pub challenge_pnl: (f64, f64),
    pub high_yield_pnl: (f64, f64),
    /// Lower bound on a model's weight in the governed consensus
    pub min_weight: f64,
    pub signal_limit: usize,
}

impl Default for LeagueSettings {
    fn default() -> Self {
        Self {
            starting_capital: 10_000.0,
            stake: 100.0,
            default_odds: 1.95,
            modifier_window_days: 7,
            challenge_pnl: (-50.0, 80.0),
            high_yield_pnl: (-100.0, 150.0),
            min_weight: 0.1,
            signal_limit: 20,
        }
    }
}

/// Scores API settings
#[derive(Debug, Clone, PartialEq)]
pub struct OddsConfig {
    pub api_key: Option<String>,
    pub sport: String,
    pub days_from: u32,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            sport: DEFAULT_SPORT.to_string(),
            days_from: DEFAULT_DAYS_FROM,
        }
    }
}

impl OddsConfig {
    pub fn client(&self) -> scores_retrieval::Result<OddsApiClient> {
        OddsApiClient::new(self.api_key.clone(), self.days_from)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub supabase_url: String,
    pub service_key: String,
    pub odds: OddsConfig,
    pub league: LeagueSettings,
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (supabase_url, service_key) =
            match (non_empty(keys::SUPABASE_URL), non_empty(keys::SERVICE_ROLE_KEY)) {
                (Some(url), Some(key)) => (url, key),
                _ => return Err(anyhow!("Supabase keys missing")),
            };

        let mut odds = OddsConfig {
            api_key: non_empty(keys::ODDS_API_KEY),
            ..OddsConfig::default()
        };
        if let Some(sport) = non_empty(keys::ODDS_SPORT) {
            odds.sport = sport;
        }
        if let Some(days) = non_empty(keys::ODDS_DAYS_FROM) {
            odds.days_from = days
                .parse()
                .map_err(|e| anyhow!("Invalid {}: {}", keys::ODDS_DAYS_FROM, e))?;
        }

        let mut league = LeagueSettings::default();
        if let Some(limit) = non_empty(keys::SIGNAL_LIMIT) {
            league.signal_limit = limit
                .parse()
                .map_err(|e| anyhow!("Invalid {}: {}", keys::SIGNAL_LIMIT, e))?;
        }

        Ok(Self {
            supabase_url,
            service_key,
            odds,
            league,
        })
    }

    pub fn store(&self) -> StoreResult<PostgrestStore> {
        PostgrestStore::new(&self.supabase_url, &self.service_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_requires_datastore_credentials() {
        let err = EngineConfig::from_lookup(lookup(&[(keys::SUPABASE_URL, "https://x.supabase.co")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Supabase keys missing");
    }

    #[test]
    fn test_defaults_applied() {
        let config = EngineConfig::from_lookup(lookup(&[
            (keys::SUPABASE_URL, "https://x.supabase.co"),
            (keys::SERVICE_ROLE_KEY, "service"),
            (keys::ODDS_API_KEY, ""),
        ]))
        .unwrap();

        assert_eq!(config.odds, OddsConfig::default());
        assert_eq!(config.odds.sport, "soccer_epl");
        assert_eq!(config.league.signal_limit, 20);
        assert_eq!(config.league.starting_capital, 10_000.0);
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let config = EngineConfig::from_lookup(lookup(&[
            (keys::SUPABASE_URL, "https://x.supabase.co"),
            (keys::SERVICE_ROLE_KEY, "service"),
            (keys::ODDS_API_KEY, "odds"),
            (keys::ODDS_SPORT, "basketball_nba"),
            (keys::SIGNAL_LIMIT, "5"),
        ]))
        .unwrap();
        assert_eq!(config.odds.api_key.as_deref(), Some("odds"));
        assert_eq!(config.odds.sport, "basketball_nba");
        assert_eq!(config.league.signal_limit, 5);

        let err = EngineConfig::from_lookup(lookup(&[
            (keys::SUPABASE_URL, "https://x.supabase.co"),
            (keys::SERVICE_ROLE_KEY, "service"),
            (keys::ODDS_DAYS_FROM, "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(keys::ODDS_DAYS_FROM));
    }
}
