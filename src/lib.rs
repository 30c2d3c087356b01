pub mod cli;
pub mod converter;
pub mod core;
pub mod providers;

use anyhow::{Context, Result};
use tracing::{debug, info};

pub use converter::CurrencyConverter;

pub enum AppCommand {
    Demo,
    Convert { amount: f64, from: String, to: String },
    Currencies { base: String },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Currency converter starting...");

    let config = match config_path {
        Some(path) => crate::core::config::AppConfig::load_from_path(path)?,
        None => crate::core::config::AppConfig::load()?,
    };
    debug!(
        base_url = %config.provider.base_url,
        has_api_key = config.provider.api_key.is_some(),
        ttl_secs = config.cache.ttl_secs,
        "Loaded config"
    );

    let converter =
        CurrencyConverter::from_config(&config).context("Failed to create rate provider")?;

    match command {
        AppCommand::Demo => cli::convert::run_demo(&converter).await,
        AppCommand::Convert { amount, from, to } => {
            cli::convert::run(&converter, amount, &from, &to).await
        }
        AppCommand::Currencies { base } => cli::currencies::run(&converter, &base).await,
    }
}
