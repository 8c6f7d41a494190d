use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final (or in-progress) score line for one fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchScore {
    pub id: String,
    #[serde(default)]
    pub sport_key: Option<String>,
    #[serde(default)]
    pub commence_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    pub home_team: String,
    pub away_team: String,
    /// Absent until the fixture has started
    #[serde(default)]
    pub scores: Option<Vec<TeamScore>>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

/// Goals for one side. The API reports them as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamScore {
    pub name: String,
    pub score: String,
}

impl MatchScore {
    /// Whether the fixture is finished and carries a score line
    pub fn is_final(&self) -> bool {
        self.completed && self.scores.as_ref().map(|s| !s.is_empty()).unwrap_or(false)
    }

    /// Goals scored by `team`; a side missing from the score line counts as 0
    pub fn goals_for(&self, team: &str) -> u32 {
        self.scores
            .as_ref()
            .and_then(|scores| scores.iter().find(|s| s.name == team))
            .and_then(|s| s.score.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Scores source health snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub source: String,
    pub is_healthy: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub success_rate: f64,
}

/// Error types for score retrieval
#[derive(Debug, thiserror::Error)]
pub enum ScoresError {
    #[error("No API key configured for {0}")]
    MissingApiKey(String),

    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Result type for score retrieval operations
pub type Result<T> = std::result::Result<T, ScoresError>;

/// Trait for final-score sources
#[async_trait::async_trait]
pub trait ScoreSource: Send + Sync {
    /// Recent scores for a sport key
    async fn scores(&self, sport: &str) -> Result<Vec<MatchScore>>;

    /// Source health status
    async fn health(&self) -> SourceHealth;

    /// Source name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goals_from_api_payload() {
        let score: MatchScore = serde_json::from_value(serde_json::json!({
            "id": "e912304de2b2ce35b473ce2ecd3d1502",
            "sport_key": "soccer_epl",
            "commence_time": "2026-10-18T14:00:00Z",
            "completed": true,
            "home_team": "Arsenal",
            "away_team": "Chelsea",
            "scores": [
                { "name": "Arsenal", "score": "2" },
                { "name": "Chelsea", "score": "1" }
            ],
            "last_update": "2026-10-18T16:02:11Z"
        }))
        .unwrap();

        assert!(score.is_final());
        assert_eq!(score.goals_for("Arsenal"), 2);
        assert_eq!(score.goals_for("Chelsea"), 1);
        assert_eq!(score.goals_for("Spurs"), 0);
    }

    #[test]
    fn test_upcoming_fixture_is_not_final() {
        let score: MatchScore = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "completed": false,
            "home_team": "Arsenal",
            "away_team": "Chelsea",
            "scores": null
        }))
        .unwrap();

        assert!(!score.is_final());
        assert_eq!(score.goals_for("Arsenal"), 0);
    }
}
