//! `MinefieldServer` builder and server loop.
//!
//! This is the entry point for running a Minefield server. It ties the
//! layers together: transport → protocol → service (rounds + ledger).

use std::sync::Arc;

use minefield_ledger::{LedgerConfig, LedgerService, LedgerStore};
use minefield_protocol::{Codec, JsonCodec};
use minefield_round::{EngineConfig, RoundEngine};

use crate::handler::handle_connection;
use crate::transport::{Transport, WebSocketTransport};
use crate::{Authenticator, MinefieldError, MinefieldService, ServerConfig};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S, A, C> {
    pub(crate) service: Arc<MinefieldService<S>>,
    pub(crate) auth: A,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Minefield server.
///
/// # Example
///
/// ```rust,no_run
/// use minefield::prelude::*;
///
/// # async fn run() -> Result<(), MinefieldError> {
/// let server = MinefieldServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(MemoryStore::new(), UsernameAuthenticator)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct MinefieldServerBuilder {
    config: ServerConfig,
    seed: Option<u64>,
}

impl MinefieldServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            seed: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn engine_config(mut self, engine: EngineConfig) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn ledger_config(mut self, ledger: LedgerConfig) -> Self {
        self.config.ledger = ledger;
        self
    }

    /// Deals boards from a fixed seed. Only useful for tests and replays.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Binds the listener and assembles the service.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build<S, A>(
        self,
        store: S,
        auth: A,
    ) -> Result<MinefieldServer<S, A, JsonCodec>, MinefieldError>
    where
        S: LedgerStore,
        A: Authenticator,
    {
        let engine = match self.seed {
            Some(seed) => RoundEngine::with_seed(self.config.engine.clone(), seed)?,
            None => RoundEngine::new(self.config.engine.clone())?,
        };
        let ledger = LedgerService::new(store, self.config.ledger.clone());
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            service: Arc::new(MinefieldService::new(engine, ledger)),
            auth,
            codec: JsonCodec,
        });

        Ok(MinefieldServer { transport, state })
    }
}

impl Default for MinefieldServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Minefield server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct MinefieldServer<S, A, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, A, C>>,
}

impl MinefieldServer<(), (), ()> {
    /// Creates a new builder.
    pub fn builder() -> MinefieldServerBuilder {
        MinefieldServerBuilder::new()
    }
}

impl<S, A, C> MinefieldServer<S, A, C>
where
    S: LedgerStore,
    A: Authenticator,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The service behind the wire, for in-process inspection.
    pub fn service(&self) -> Arc<MinefieldService<S>> {
        Arc::clone(&self.state.service)
    }

    /// Runs the accept loop, spawning a handler task per connection. The
    /// WebSocket upgrade runs in that task, so a stalled peer only holds
    /// up itself.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), MinefieldError> {
        tracing::info!(version = PROTOCOL_VERSION, "Minefield server running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(incoming, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
