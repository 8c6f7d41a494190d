//! Reset every profile to the promotional balance

use tracing::{error, info};

use league_engine::wallet::credit_all_users;
use league_engine::{init_tracing, load_dotenv, EngineConfig};

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();

    if let Err(e) = run().await {
        error!("Credit run failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let store = EngineConfig::from_env()?.store()?;
    let report = credit_all_users(&store).await?;
    info!("Updated {} profiles ({} failed)", report.updated, report.failed);
    Ok(())
}
