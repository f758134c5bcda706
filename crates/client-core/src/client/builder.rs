//! Builder for assembling call clients
//!
//! A call client is pure coordination: every side effect goes through a
//! collaborator supplied here. The builder collects the room server
//! client, relay discovery client, channel factory, peer connection
//! factory, and event handler, then spawns the engine task that drives
//! them.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use rtcall_client_core::{CallClientBuilder, CallConfig};
//!
//! let builder = CallClientBuilder::new()
//!     .config(
//!         CallConfig::new()
//!             .with_preferred_video_codec("H264")
//!             .with_stats_interval(Duration::from_secs(1)),
//!     )
//!     .event_capacity(128);
//! // wire in collaborators with .room_client(...), .turn_client(...),
//! // .channel_factory(...), .peer_factory(...), .handler(...),
//! // then call .build().await
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use rtcall_signaling_core::{RoomServerClient, SignalingChannelFactory, TurnClient};

use crate::call::CallState;
use crate::client::config::CallConfig;
use crate::client::engine::Engine;
use crate::client::session::Session;
use crate::client::CallClient;
use crate::error::{ClientError, ClientResult};
use crate::events::{CallEventHandler, EventEmitter};
use crate::peer::PeerConnectionFactory;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Fluent builder for creating call clients
///
/// All five collaborators are required; [`build`](Self::build) rejects a
/// partially wired client with
/// [`ClientError::InvalidConfiguration`](crate::ClientError::InvalidConfiguration).
pub struct CallClientBuilder {
    config: CallConfig,
    room_client: Option<Arc<dyn RoomServerClient>>,
    turn_client: Option<Arc<dyn TurnClient>>,
    channel_factory: Option<Arc<dyn SignalingChannelFactory>>,
    peer_factory: Option<Arc<dyn PeerConnectionFactory>>,
    handler: Option<Arc<dyn CallEventHandler>>,
    event_capacity: usize,
}

impl Default for CallClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CallClientBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CallConfig::default(),
            room_client: None,
            turn_client: None,
            channel_factory: None,
            peer_factory: None,
            handler: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: CallConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the room server client used to join, post to, and leave rooms
    pub fn room_client(mut self, client: Arc<dyn RoomServerClient>) -> Self {
        self.room_client = Some(client);
        self
    }

    /// Set the relay discovery client queried for TURN servers
    pub fn turn_client(mut self, client: Arc<dyn TurnClient>) -> Self {
        self.turn_client = Some(client);
        self
    }

    /// Set the factory that opens bidirectional signaling channels
    pub fn channel_factory(mut self, factory: Arc<dyn SignalingChannelFactory>) -> Self {
        self.channel_factory = Some(factory);
        self
    }

    /// Set the factory that builds peer connections
    pub fn peer_factory(mut self, factory: Arc<dyn PeerConnectionFactory>) -> Self {
        self.peer_factory = Some(factory);
        self
    }

    /// Set the event handler notified of state changes, media, and errors
    pub fn handler(mut self, handler: Arc<dyn CallEventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Set the broadcast capacity of the event stream
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validate the wiring and spawn the call engine.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// ```rust
    /// use rtcall_client_core::{CallClientBuilder, ClientError};
    ///
    /// # tokio_test::block_on(async {
    /// // a client without collaborators is rejected, not half-built
    /// let error = CallClientBuilder::new().build().await.unwrap_err();
    /// assert!(matches!(error, ClientError::InvalidConfiguration { .. }));
    /// # })
    /// ```
    pub async fn build(self) -> ClientResult<CallClient> {
        let room_client = self
            .room_client
            .ok_or_else(|| ClientError::invalid_configuration("a room server client is required"))?;
        let turn_client = self.turn_client.ok_or_else(|| {
            ClientError::invalid_configuration("a relay discovery client is required")
        })?;
        let channel_factory = self.channel_factory.ok_or_else(|| {
            ClientError::invalid_configuration("a signaling channel factory is required")
        })?;
        let peer_factory = self.peer_factory.ok_or_else(|| {
            ClientError::invalid_configuration("a peer connection factory is required")
        })?;
        let handler = self
            .handler
            .ok_or_else(|| ClientError::invalid_configuration("an event handler is required"))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(CallState::Disconnected);
        let emitter = EventEmitter::new(self.event_capacity);

        let engine = Engine {
            config: self.config,
            room_client,
            turn_client,
            channel_factory,
            peer_factory,
            handler,
            events: event_rx,
            self_tx: event_tx.clone(),
            emitter: emitter.clone(),
            state_tx,
            session: Session::new(),
            stats_task: None,
        };
        let engine_task = tokio::spawn(engine.run());

        Ok(CallClient {
            command_tx: event_tx,
            state_rx,
            emitter,
            engine_task: Some(engine_task),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_rejects_missing_collaborators() {
        let result = CallClientBuilder::new().build().await;

        match result {
            Err(ClientError::InvalidConfiguration { message }) => {
                assert!(message.contains("room server client"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected configuration error"),
        }
    }
}
