//! # hubchat
//!
//! A multi-client text chat server. Clients connect over TCP, register a
//! `@handle`, join `#channels`, and exchange channel broadcasts or direct
//! messages using a small line protocol:
//!
//! ```text
//! REG @alice
//! JOIN #general
//! MSG #general 5
//! hello
//! CHNS
//! USRS
//! LEAVE #general
//! ```
//!
//! All shared state lives in a single hub actor (see `hubchat-hub`); each
//! connection runs a handler task that parses lines and posts commands to
//! it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hubchat::prelude::*;
//!
//! # async fn run() -> Result<(), HubchatError> {
//! let server = HubchatServer::builder()
//!     .bind("127.0.0.1:8081")
//!     .build()
//!     .await?;
//! server.run_until_ctrl_c().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_BIND_ADDR, ServerConfig};
pub use error::HubchatError;
pub use server::{HubchatServer, HubchatServerBuilder};

/// Everything needed to embed or test a server.
pub mod prelude {
    pub use crate::{HubchatError, HubchatServer, HubchatServerBuilder, ServerConfig};
    pub use hubchat_hub::{Clock, FixedClock, HubConfig, HubHandle, HubSnapshot, SystemClock};
    pub use hubchat_protocol::{ChannelName, FrameLimits, Handle};
}
