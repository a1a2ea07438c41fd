//! The hub: the single owner of hubchat's shared state.
//!
//! Every registered user and every channel lives inside one [`Hub`], which
//! runs as an isolated Tokio task (actor model). Connection handlers talk
//! to it only through a [`HubHandle`].
//!
//! # Key types
//!
//! - [`spawn_hub`] / [`HubHandle`] — start the hub and post events to it
//! - [`Hub`] — the state and the rules for each operation
//! - [`Channel`] — one chat room's member set and fan-out
//! - [`Command`] / [`HubEvent`] — what the inbox carries
//! - [`Clock`] — where confirmation and chat timestamps come from
//! - [`HubConfig`] — queue sizes

mod actor;
mod channel;
mod clock;
mod command;
mod config;
mod error;
mod hub;

pub use actor::{HubHandle, spawn_hub};
pub use channel::Channel;
pub use clock::{Clock, FixedClock, SystemClock, TIMESTAMP_FORMAT};
pub use command::{Command, HubEvent, HubSnapshot};
pub use config::HubConfig;
pub use error::HubError;
pub use hub::{Hub, NOT_REGISTERED, SHUTDOWN_NOTICE};
