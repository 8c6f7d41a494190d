//! Create missing profiles for auth accounts and top everyone up

use tracing::{error, info};

use league_engine::wallet::sync_and_credit_users;
use league_engine::{init_tracing, load_dotenv, EngineConfig};

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();

    if let Err(e) = run().await {
        error!("Sync failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let store = EngineConfig::from_env()?.store()?;
    let report = sync_and_credit_users(&store).await?;
    info!(
        "Sync complete: {} updated, {} created, {} failed",
        report.updated, report.created, report.failed
    );
    Ok(())
}
