//! Call client implementation
//!
//! [`CallClient`] is the public face of the crate. It owns nothing but a
//! handle to the engine task spawned at build time; every operation is a
//! message to that task, so callers on any number of tasks see one
//! consistent ordering of state changes and signaling.
//!
//! A client connects to one room at a time. Connecting joins the room and
//! discovers relay servers concurrently, negotiates with the peer once
//! both finish, and reports progress through the handler given to the
//! builder and through [`subscribe_events`](CallClient::subscribe_events).

pub mod builder;
pub mod config;

mod engine;
mod gate;
mod session;

pub use builder::CallClientBuilder;
pub use config::{CallConfig, DEFAULT_STUN_SERVER, DEFAULT_VIDEO_CODEC};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::call::{CallId, CallState, ConnectOptions};
use crate::client::engine::{Command, EngineEvent};
use crate::error::{ClientError, ClientResult};
use crate::events::{EventEmitter, EventIterator, EventStream};

/// Handle to a running call engine
///
/// Dropping the client shuts the engine down, tearing down any active
/// call. Use [`shutdown`](Self::shutdown) to wait for that teardown to
/// finish.
#[derive(Debug)]
pub struct CallClient {
    pub(crate) command_tx: mpsc::UnboundedSender<EngineEvent>,
    pub(crate) state_rx: watch::Receiver<CallState>,
    pub(crate) emitter: EventEmitter,
    pub(crate) engine_task: Option<JoinHandle<()>>,
}

impl CallClient {
    /// Start building a call client
    pub fn builder() -> CallClientBuilder {
        CallClientBuilder::new()
    }

    /// Connect to a room.
    ///
    /// Returns the id of the new call attempt once startup work has been
    /// kicked off; progress past that point is reported through events.
    /// Fails with [`ClientError::InvalidState`] if a call is already in
    /// progress or `room_id` is empty.
    pub async fn connect(
        &self,
        room_id: impl Into<String>,
        options: ConnectOptions,
    ) -> ClientResult<CallId> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(EngineEvent::Command(Command::Connect {
                room_id: room_id.into(),
                options,
                reply: reply_tx,
            }))
            .map_err(|_| ClientError::internal("call engine is not running"))?;
        reply_rx
            .await
            .map_err(|_| ClientError::internal("call engine stopped before replying"))?
    }

    /// End the current call, if any.
    ///
    /// Notifies the room and the peer, releases the peer connection, and
    /// returns once the client is Disconnected. Calling this with no call
    /// in progress does nothing.
    pub async fn disconnect(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self
            .command_tx
            .send(EngineEvent::Command(Command::Disconnect { reply: reply_tx }))
            .is_ok();
        if sent {
            let _ = reply_rx.await;
        }
    }

    /// Current call state
    pub fn state(&self) -> CallState {
        *self.state_rx.borrow()
    }

    /// Watch call state changes
    pub fn watch_state(&self) -> watch::Receiver<CallState> {
        self.state_rx.clone()
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> EventStream {
        self.emitter.subscribe()
    }

    /// Subscribe to events with a simple iterator
    pub fn subscribe_events_simple(&self) -> EventIterator {
        self.emitter.subscribe_simple()
    }

    /// Stop the engine and wait for it to finish tearing down.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.engine_task.take() {
            let _ = self
                .command_tx
                .send(EngineEvent::Command(Command::Shutdown));
            let _ = task.await;
        }
    }
}

impl Drop for CallClient {
    fn drop(&mut self) {
        if self.engine_task.is_some() {
            let _ = self
                .command_tx
                .send(EngineEvent::Command(Command::Shutdown));
        }
    }
}
