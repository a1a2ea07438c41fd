//! The hub actor: one Tokio task that owns the [`Hub`].
//!
//! Connection handlers never touch hub state. They hold a [`HubHandle`],
//! which wraps the sending side of a bounded inbox, and post
//! [`HubEvent`]s through it. The actor drains the inbox one event at a
//! time, so every operation sees the state left by the previous one and
//! no locks are involved.

use std::ops::ControlFlow;
use std::sync::Arc;

use hubchat_protocol::Handle;
use hubchat_session::ClientRef;
use tokio::sync::{mpsc, oneshot};

use crate::{Clock, Command, Hub, HubConfig, HubError, HubEvent, HubSnapshot};

/// Handle to a running hub actor.
///
/// Cheap to clone: it is an `mpsc::Sender` wrapper. The hub stops once
/// every handle is dropped or [`shutdown`](HubHandle::shutdown) is called.
#[derive(Clone, Debug)]
pub struct HubHandle {
    sender: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    /// Asks the hub to register `handle` for `client` and waits for the
    /// outcome.
    ///
    /// The client has already been sent its confirmation or error line by
    /// the time this returns.
    ///
    /// # Errors
    /// - [`HubError::Rejected`] — the hub refused the handle
    /// - [`HubError::Unavailable`] — the hub has stopped
    pub async fn register(
        &self,
        client: ClientRef,
        handle: Handle,
    ) -> Result<(), HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(HubEvent::Register {
            client,
            handle,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| HubError::Unavailable)??;
        Ok(())
    }

    /// Tells the hub the client's connection is gone (fire-and-forget).
    pub async fn deregister(&self, client: ClientRef) -> Result<(), HubError> {
        self.post(HubEvent::Deregister { client }).await
    }

    /// Posts any non-registration command (fire-and-forget).
    pub async fn submit(&self, command: Command) -> Result<(), HubError> {
        self.post(HubEvent::Command(command)).await
    }

    /// Requests a snapshot of users and channel membership.
    pub async fn snapshot(&self) -> Result<HubSnapshot, HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(HubEvent::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Tells the hub to notify every registered client and stop.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.post(HubEvent::Shutdown).await
    }

    /// Returns `true` once the hub has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Waits for inbox capacity, then enqueues the event.
    async fn post(&self, event: HubEvent) -> Result<(), HubError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| HubError::Unavailable)
    }
}

/// The task-side state: the hub and its inbox.
struct HubActor {
    hub: Hub,
    receiver: mpsc::Receiver<HubEvent>,
}

impl HubActor {
    /// Runs the actor loop, processing events until shutdown or until
    /// every handle has been dropped.
    async fn run(mut self) {
        tracing::info!("hub started");

        while let Some(event) = self.receiver.recv().await {
            if let ControlFlow::Break(()) = self.hub.handle_event(event) {
                break;
            }
        }

        tracing::info!("hub stopped");
    }
}

/// Spawns the hub actor task and returns a handle to it.
///
/// `config.inbox_capacity` bounds the inbox; posters wait when it is full.
pub fn spawn_hub(config: HubConfig, clock: Arc<dyn Clock>) -> HubHandle {
    let (tx, rx) = mpsc::channel(config.inbox_capacity.max(1));

    let actor = HubActor {
        hub: Hub::new(clock),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    HubHandle { sender: tx }
}
