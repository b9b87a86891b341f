//! `CodeduelServer` builder and server loop.
//!
//! This is the entry point for running a duel server. It ties together
//! all the layers: transport → protocol → gateway → rooms.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use codeduel_protocol::{Codec, JsonCodec};
use codeduel_room::{RoomConfig, RoomStore};
use codeduel_transport::{Transport, WebSocketTransport};

use crate::CodeduelError;
use crate::handler::handle_connection;

/// Address the server binds to unless told otherwise.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Nothing in
/// here takes a server-wide lock: the room store is sharded and every room
/// serializes its own commands.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: RoomStore,
    pub(crate) codec: C,
    /// Origin of every envelope timestamp.
    pub(crate) start: Instant,
}

impl<C: Codec> ServerState<C> {
    /// Milliseconds since the server started.
    pub(crate) fn timestamp(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Builder for configuring and starting a Codeduel server.
///
/// # Example
///
/// ```rust,no_run
/// use codeduel::prelude::*;
///
/// # async fn run() -> Result<(), CodeduelError> {
/// let server = CodeduelServer::builder()
///     .bind("0.0.0.0:3001")
///     .room_config(RoomConfig::duel())
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CodeduelServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl CodeduelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`, which is what the
    /// browser client speaks.
    pub async fn build(self) -> Result<CodeduelServer<JsonCodec>, CodeduelError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Like [`build`](Self::build), with a custom wire codec.
    pub async fn build_with_codec<C: Codec>(
        self,
        codec: C,
    ) -> Result<CodeduelServer<C>, CodeduelError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: RoomStore::with_config(self.room_config),
            codec,
            start: Instant::now(),
        });

        Ok(CodeduelServer { transport, state })
    }
}

impl Default for CodeduelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Codeduel server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CodeduelServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl CodeduelServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CodeduelServerBuilder {
        CodeduelServerBuilder::new()
    }
}

impl<C: Codec> CodeduelServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the number of live rooms.
    pub fn room_count(&self) -> usize {
        self.state.rooms.room_count()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), CodeduelError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), CodeduelError> {
        let addr = self.local_addr().map_err(|e| {
            CodeduelError::Transport(
                codeduel_transport::TransportError::AcceptFailed(e),
            )
        })?;
        tracing::info!(%addr, "Codeduel server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(
                        rooms = self.state.rooms.room_count(),
                        "shutting down"
                    );
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
    }
}
