//! Force the newest ticket to a win for the first account (demo only)

use tracing::{error, info};

use league_engine::wallet::force_settle_demo;
use league_engine::{init_tracing, load_dotenv, EngineConfig};

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();

    if let Err(e) = run().await {
        error!("Force settle failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let store = EngineConfig::from_env()?.store()?;
    info!("Starting force settle...");
    match force_settle_demo(&store).await? {
        Some(settled) => info!(
            "Ticket {} settled for {}: {} -> {}",
            settled.ticket_id, settled.user_id, settled.previous_balance, settled.new_balance
        ),
        None => info!("Nothing to settle"),
    }
    Ok(())
}
