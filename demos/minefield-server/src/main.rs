use std::path::Path;

use minefield::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Path to an optional JSON config file (see `ServerConfig`).
const CONFIG_ENV: &str = "MINEFIELD_CONFIG";
/// Overrides `bind_addr` from the config file.
const BIND_ENV: &str = "MINEFIELD_BIND";

fn load_config(
    path: Option<&Path>,
    bind: Option<String>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        }
        None => ServerConfig::default(),
    };
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var_os(CONFIG_ENV).map(std::path::PathBuf::from);
    let config = load_config(config_path.as_deref(), std::env::var(BIND_ENV).ok())?;
    tracing::info!(
        bind = %config.bind_addr,
        starting_balance = %config.ledger.starting_balance,
        house_edge = config.engine.curve.house_edge,
        "starting minefield server"
    );

    let server = MinefieldServerBuilder::new()
        .config(config)
        .build(MemoryStore::new(), UsernameAuthenticator)
        .await?;

    server.run().await?;
    Ok(())
}
