//! The league's model roster

use serde_json::Value;
use tracing::{error, info};

use crate::models::AiModel;
use crate::store::{tables, Datastore, Query, StoreResult};

fn model(model_id: &str, name: &str, style: &str, radar: &str) -> AiModel {
    AiModel {
        model_id: model_id.to_string(),
        name: name.to_string(),
        style: Some(style.to_string()),
        capability_radar: Some(radar.to_string()),
    }
}

/// Models a fresh league starts with
pub fn default_models() -> Vec<AiModel> {
    vec![
        model(
            "deepseek_v3",
            "DeepSeek V3",
            "Balanced Quant",
            r#"{"Tactics": 9, "Underdogs": 8, "High-Value": 9, "Consistency": 6, "Speed": 7}"#,
        ),
        model(
            "claude_opus_4_5",
            "Claude Opus 4.5",
            "Risk Averse",
            r#"{"Stability": 8, "Accuracy": 9, "Logic": 9, "Speed": 5, "Value": 7}"#,
        ),
        model(
            "gpt_5_preview",
            "GPT-5 Preview",
            "Aggressive Growth",
            r#"{"Power": 9, "Vision": 8, "Risk": 9, "Scale": 7, "Alpha": 8}"#,
        ),
        model(
            "qwen_3_max",
            "Qwen 3 Max",
            "Momentum Algo",
            r#"{"Momentum": 9, "Flow": 8, "Trend": 7, "Pattern": 8, "Execution": 6}"#,
        ),
    ]
}

/// Models added after launch
pub fn late_entrants() -> Vec<AiModel> {
    vec![
        model(
            "grok_3_beta",
            "Grok 3 Beta",
            "Contrarian Tech",
            r#"{"Rebellion": 10, "Speed": 9, "Logic": 7, "Chaos": 8, "Meme": 9}"#,
        ),
        model(
            "gemini_2_flash",
            "Gemini 2.0 Flash",
            "Speed Trader",
            r#"{"Speed": 10, "Volume": 9, "Latency": 10, "Data": 8, "Alpha": 7}"#,
        ),
    ]
}

/// Insert the default roster if `ai_models` is empty; returns whether it seeded
pub async fn ensure_models_seeded(store: &dyn Datastore) -> StoreResult<bool> {
    let existing = store
        .select(tables::AI_MODELS, &Query::new().columns("model_id").limit(1))
        .await?;
    if !existing.is_empty() {
        return Ok(false);
    }

    info!("[LEAGUE] Seeding default AI models...");
    let rows = default_models()
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()?;
    store.insert(tables::AI_MODELS, rows).await?;
    Ok(true)
}

/// Upsert the late entrants one by one; returns how many were written
pub async fn inject_models(store: &dyn Datastore) -> usize {
    let mut written = 0;
    for model in late_entrants() {
        let row = match serde_json::to_value(&model) {
            Ok(row) => row,
            Err(e) => {
                error!("Error encoding {}: {}", model.name, e);
                continue;
            }
        };

        match store.upsert(tables::AI_MODELS, vec![row], &["model_id"]).await {
            Ok(()) => {
                info!("Inserted/Updated: {}", model.name);
                written += 1;
            }
            Err(e) => error!("Error inserting {}: {}", model.name, e),
        }
    }
    written
}
