//! Signaling channel contract and lifecycle events
//!
//! The channel is the live push path between the two parties once both are
//! in the room. Implementations own their transport (typically a
//! websocket) and report inbound traffic and lifecycle changes through an
//! event sender handed to the factory.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

use crate::error::SignalingResult;
use crate::message::SignalingMessage;

/// Lifecycle of a signaling channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    /// Not connected, or shut down normally
    Closed,
    /// Connected to the relay but not yet bound to a room
    Open,
    /// Bound to a room and client; messages flow both ways
    Registered,
    /// Failed; the owner must tear the call down
    Error,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelState::Closed => "closed",
            ChannelState::Open => "open",
            ChannelState::Registered => "registered",
            ChannelState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Push notifications from a signaling channel
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The channel moved to a new lifecycle state
    StateChanged(ChannelState),
    /// The remote party sent a message
    MessageReceived(SignalingMessage),
}

/// A live signaling channel
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Bind the channel to a room and client.
    ///
    /// Messages sent before registration completes may be buffered or
    /// rejected by the implementation.
    async fn register(&self, room_id: &str, client_id: &str) -> SignalingResult<()>;

    /// Send a message to the remote party
    async fn send(&self, message: &SignalingMessage) -> SignalingResult<()>;

    /// Current lifecycle state
    fn state(&self) -> ChannelState;
}

/// Builds channels once a room join has supplied the endpoints
#[async_trait]
pub trait SignalingChannelFactory: Send + Sync {
    /// Open a channel to `url`, delivering inbound events through `events`
    async fn create(
        &self,
        url: &Url,
        rest_url: &Url,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> SignalingResult<Box<dyn SignalingChannel>>;

    /// Open the extra channel used when a client calls itself in loopback
    /// mode. Factories without loopback support return `Ok(None)`.
    async fn create_loopback(
        &self,
        url: &Url,
        rest_url: &Url,
    ) -> SignalingResult<Option<Box<dyn SignalingChannel>>> {
        let _ = (url, rest_url);
        Ok(None)
    }
}
