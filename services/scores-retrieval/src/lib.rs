pub mod types;
pub mod sources {
    pub mod odds_api;
}

pub use types::*;
pub use sources::odds_api::OddsApiClient;

/// Sport key used when none is configured
pub const DEFAULT_SPORT: &str = "soccer_epl";

/// How many days back the scores endpoint is asked to look
pub const DEFAULT_DAYS_FROM: u32 = 3;

/// Find the score line for an exact home/away pairing.
pub fn find_match<'a>(
    scores: &'a [MatchScore],
    home_team: &str,
    away_team: &str,
) -> Option<&'a MatchScore> {
    scores
        .iter()
        .find(|s| s.home_team == home_team && s.away_team == away_team)
}
