//! League engine - runs one simulated day of the AI trading league
//!
//! 1. Seeds the default model roster on first run
//! 2. Simulates every model against today's match signals
//! 3. Settles black swan options, awards badges, closes proposals
//! 4. Refreshes guild returns and writes the day's headline

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use league_engine::{init_tracing, load_dotenv, EngineConfig, LeagueEngine};

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();

    info!("Starting league engine...");
    if let Err(e) = run().await {
        error!("Simulation failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = EngineConfig::from_env()?;
    let store = config.store()?;
    let mut engine = LeagueEngine::new(Arc::new(store), config.league);

    if engine.bootstrap().await? {
        info!("Seeded default model roster");
    }

    let report = engine.run_daily_simulation(Utc::now().date_naive()).await?;
    info!(
        "Day complete: {} models, {} options settled, {} proposals executed, {} guilds updated",
        report.performers.len(),
        report.options.settled,
        report.governance.executed,
        report.guilds_updated
    );
    if let Some(headline) = report.headline {
        info!("Headline: {}", headline);
    }
    Ok(())
}
