//! Confirm the late-entry models have recorded stats

use tracing::error;

use league_engine::inspect::model_stats_report;
use league_engine::league::roster::late_entrants;
use league_engine::{init_tracing, load_dotenv, EngineConfig};

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let store = EngineConfig::from_env()?.store()?;
    let ids: Vec<String> = late_entrants().into_iter().map(|m| m.model_id).collect();
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    model_stats_report(&store, &ids).await?;
    Ok(())
}
