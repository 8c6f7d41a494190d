//! Fixtures shared by the integration harnesses
#![allow(dead_code)]

use serde_json::{json, Value};

/// A match signal whose best bet is "Home Win" at `win_rate` and `odds`
pub fn signal(id: &str, win_rate: f64, odds: f64) -> Value {
    json!({
        "id": id,
        "home_team": "Home",
        "away_team": "Away",
        "quant_analysis": {
            "best_bet": { "market": "Home Win", "win_rate": win_rate },
            "recommendations": { "Home Win": { "market_odds": odds } }
        }
    })
}

pub fn model(model_id: &str, name: &str) -> Value {
    json!({
        "model_id": model_id,
        "name": name,
        "style": "Test",
        "capability_radar": "{}"
    })
}

pub fn final_score(home: &str, away: &str, home_goals: u32, away_goals: u32) -> Value {
    json!({
        "id": format!("{}-{}", home, away),
        "sport_key": "soccer_epl",
        "completed": true,
        "home_team": home,
        "away_team": away,
        "scores": [
            { "name": home, "score": home_goals.to_string() },
            { "name": away, "score": away_goals.to_string() }
        ]
    })
}

pub fn leg(fixture: &str, selection: &str, odds: f64) -> Value {
    json!({ "match": fixture, "selection": selection, "odds": odds })
}

pub fn field<'a>(row: &'a Value, key: &str) -> &'a Value {
    row.get(key).unwrap_or(&Value::Null)
}

/// Read a money column that may come back as a string or a number
pub fn number(row: &Value, key: &str) -> f64 {
    match field(row, key) {
        Value::Number(n) => n.as_f64().unwrap(),
        Value::String(s) => s.parse().unwrap(),
        other => panic!("{} is not numeric: {}", key, other),
    }
}
