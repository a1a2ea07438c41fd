//! `HubchatServer` builder and server loop.
//!
//! This is the entry point for running a hubchat server. It ties together
//! all the layers: transport → protocol → session → hub.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hubchat_hub::{Clock, HubHandle, spawn_hub};
use hubchat_protocol::{FrameLimits, LineCodec};
use hubchat_transport::{Connection, TcpTransport, Transport};
use tokio::select;

use crate::handler::{ServerState, handle_connection};
use crate::{HubchatError, ServerConfig};

/// Builder for configuring and starting a hubchat server.
///
/// # Example
///
/// ```rust,no_run
/// use hubchat::prelude::*;
///
/// # async fn run() -> Result<(), HubchatError> {
/// let server = HubchatServer::builder()
///     .bind("0.0.0.0:8081")
///     .build()
///     .await?;
/// server.run_until_ctrl_c().await
/// # }
/// ```
pub struct HubchatServerBuilder {
    config: ServerConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl HubchatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            clock: None,
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

    /// Sets the command line and body size limits.
    pub fn limits(mut self, limits: FrameLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Overrides the clock derived from the configuration.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Binds the listener and starts the hub.
    pub async fn build(self) -> Result<HubchatServer, HubchatError> {
        let transport = TcpTransport::bind(&self.config.bind_addr).await?;

        let clock = self.clock.unwrap_or_else(|| self.config.clock());
        let hub = spawn_hub(self.config.hub, clock);

        let state = Arc::new(ServerState {
            hub,
            codec: LineCodec::new(self.config.limits),
            outbound_capacity: self.config.hub.outbound_capacity.max(1),
        });

        Ok(HubchatServer { transport, state })
    }
}

impl Default for HubchatServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound hubchat server.
///
/// Call [`run()`](Self::run) or one of its variants to start accepting
/// connections.
pub struct HubchatServer {
    transport: TcpTransport,
    state: Arc<ServerState>,
}

impl HubchatServer {
    /// Creates a new builder.
    pub fn builder() -> HubchatServerBuilder {
        HubchatServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, HubchatError> {
        Ok(self.transport.local_addr()?)
    }

    /// Returns a handle to the server's hub.
    pub fn hub(&self) -> HubHandle {
        self.state.hub.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), HubchatError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then stops the hub.
    ///
    /// Each accepted connection gets its own handler task. Accept errors
    /// are logged and the loop keeps going.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), HubchatError>
    where
        F: Future<Output = ()> + Send,
    {
        let HubchatServer {
            mut transport,
            state,
        } = self;
        tokio::pin!(shutdown);

        tracing::info!("hubchat server running");

        loop {
            select! {
                _ = &mut shutdown => {
                    tracing::info!("server shutting down");
                    break;
                }
                accepted = transport.accept() => match accepted {
                    Ok(conn) => {
                        tracing::info!(conn_id = %conn.id(), "client connected");
                        let state = Arc::clone(&state);
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
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        if let Err(e) = state.hub.shutdown().await {
            tracing::debug!(error = %e, "hub already stopped");
        }
        Ok(())
    }

    /// Runs until Ctrl-C is received.
    pub async fn run_until_ctrl_c(self) -> Result<(), HubchatError> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}
