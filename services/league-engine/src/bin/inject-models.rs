//! Add the late-entry models to the league roster

use tracing::{error, info};

use league_engine::league::roster::inject_models;
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
    info!("Injecting models...");
    let injected = inject_models(&store).await;
    info!("Injected {} models", injected);
    Ok(())
}
