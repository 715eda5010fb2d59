mod runner;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use behaviour_engine::config::Config;
use behaviour_engine::feed::ReplayFeed;

use crate::runner::Runner;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    cfg.settings.validate().context("Invalid settings")?;

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| cfg.candles_file.clone());
    let feed = ReplayFeed::from_file(&path).await?;

    let mut runner = Runner::new(&cfg, Box::new(feed));
    runner.run().await?;

    Ok(())
}
