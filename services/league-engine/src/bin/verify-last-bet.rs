//! Print the newest user bet and its linked ticket

use tracing::error;

use league_engine::inspect::latest_bet_report;
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
    latest_bet_report(&store).await?;
    Ok(())
}
