//! Settle pending tickets and user bets against final scores

use tracing::{error, info};

use league_engine::settlement::fetch_scores;
use league_engine::{init_tracing, load_dotenv, settle_bets, EngineConfig, MetricsCollector, WagerTable};

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();

    if let Err(e) = run().await {
        error!("Settlement failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = EngineConfig::from_env()?;
    let store = config.store()?;
    let source = config.odds.client()?;
    let collector = MetricsCollector::new();

    info!("Starting settlement...");
    let scores = fetch_scores(&source, &config.odds.sport).await;

    for table in [WagerTable::ParlayTickets, WagerTable::UserBets] {
        match settle_bets(&store, table, &scores, &collector).await {
            Ok(summary) => info!(
                "{}: {} won, {} lost, {} still pending, {} unreadable",
                table.name(),
                summary.won,
                summary.lost,
                summary.unsettled,
                summary.malformed
            ),
            Err(e) => error!("Failed to settle {}: {:#}", table.name(), e),
        }
    }

    collector.log_snapshot().await;
    info!("Settlement complete");
    Ok(())
}
