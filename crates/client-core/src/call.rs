//! Call types and state definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a call attempt
///
/// A fresh id is minted for every `connect`, so completions of background
/// work started by an earlier attempt can be told apart from the current
/// one and dropped.
pub type CallId = Uuid;

/// Connection state of the call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallState {
    /// No session. The initial state, and the terminal state of every call.
    #[default]
    Disconnected,
    /// Room join and relay discovery are in flight
    Connecting,
    /// Joined the room and negotiating (or negotiated) with the peer
    Connected,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Disconnected => f.write_str("Disconnected"),
            CallState::Connecting => f.write_str("Connecting"),
            CallState::Connected => f.write_str("Connected"),
        }
    }
}

/// Which side of the call this client is on
///
/// The first client in a room initiates; the second responds. The role
/// decides who creates the offer and which transport outgoing signaling
/// takes: initiators post through the room server, responders send over
/// the signaling channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallRole {
    /// First client in the room; creates the offer
    Initiator,
    /// Second client in the room; answers the offer
    Responder,
}

impl fmt::Display for CallRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallRole::Initiator => f.write_str("initiator"),
            CallRole::Responder => f.write_str("responder"),
        }
    }
}

/// Per-call options supplied to `connect`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Loop media back to this client instead of calling a peer
    pub loopback: bool,
    /// Skip video capture and negotiate audio only
    pub audio_only: bool,
    /// Enable automatic audio level control
    pub use_level_control: bool,
}

impl ConnectOptions {
    /// Create options with all flags off
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a loopback call
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// Request an audio-only call
    pub fn with_audio_only(mut self, audio_only: bool) -> Self {
        self.audio_only = audio_only;
        self
    }

    /// Enable automatic audio level control
    pub fn with_level_control(mut self, use_level_control: bool) -> Self {
        self.use_level_control = use_level_control;
        self
    }
}
