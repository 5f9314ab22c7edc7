//! Server configuration.

use minefield_ledger::LedgerConfig;
use minefield_round::EngineConfig;
use serde::{Deserialize, Serialize};

/// Everything needed to stand up a server. Every field has a default, so a
/// config file only needs the keys it overrides.
///
/// ```json
/// {
///   "bind_addr": "0.0.0.0:8080",
///   "engine": { "curve": { "house_edge": 0.02 } },
///   "ledger": { "starting_balance": 50000 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub engine: EngineConfig,
    pub ledger: LedgerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            engine: EngineConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}
