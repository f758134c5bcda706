//! # rtcall-client-core
//!
//! Call coordination layer for rtcall. This crate turns the signaling
//! vocabulary of [`rtcall_signaling_core`] into a working call: it joins
//! a room, discovers relay servers, keeps signaling messages in a legal
//! order, and drives an offer/answer exchange through a pluggable peer
//! connection.
//!
//! The crate performs no I/O of its own. Five collaborators are supplied
//! at build time and everything else is orchestration:
//!
//! - [`RoomServerClient`] - joins rooms and posts initiator messages
//! - [`TurnClient`] - fetches relay (TURN) servers
//! - [`SignalingChannelFactory`] - opens the bidirectional channel
//! - [`PeerConnectionFactory`] - builds the negotiation engine
//! - [`CallEventHandler`] - receives state changes, media, and errors
//!
//! All call state lives in a single engine task. Commands, signaling
//! traffic, and completions of background work are processed one at a
//! time in arrival order, which is what guarantees the ordering rules
//! around session descriptions and candidates.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use rtcall_client_core::{
//!     CallClientBuilder, CallConfig, CallEventHandler, ErrorInfo, StateChangeInfo,
//! };
//!
//! struct LoggingHandler;
//!
//! #[async_trait]
//! impl CallEventHandler for LoggingHandler {
//!     async fn on_state_changed(&self, info: StateChangeInfo) {
//!         println!("call {} is now {}", info.call_id, info.new_state);
//!     }
//!
//!     async fn on_error(&self, info: ErrorInfo) {
//!         eprintln!("call {} failed: {}", info.call_id, info.error);
//!     }
//! }
//!
//! let builder = CallClientBuilder::new()
//!     .config(CallConfig::new())
//!     .handler(Arc::new(LoggingHandler));
//! // wire in the room, relay, channel, and peer collaborators, then
//! // `builder.build().await` spawns the engine and returns a CallClient
//! ```
//!
//! Connecting returns as soon as startup work is underway; progress is
//! observable through the handler, [`CallClient::subscribe_events`], and
//! [`CallClient::watch_state`].

#![warn(missing_docs)]

pub mod call;
pub mod client;
pub mod error;
pub mod events;
pub mod peer;

pub use call::{CallId, CallRole, CallState, ConnectOptions};
pub use client::{
    CallClient, CallClientBuilder, CallConfig, DEFAULT_STUN_SERVER, DEFAULT_VIDEO_CODEC,
};
pub use error::{ClientError, ClientResult, JoinFailureReason};
pub use events::{
    CallEvent, CallEventHandler, ErrorInfo, EventEmitter, EventIterator, EventStream,
    IceConnectionInfo, StateChangeInfo, StatsInfo, TrackInfo,
};
pub use peer::{
    IceConnectionState, IceGatheringState, MediaConstraints, MediaTrack, PeerConnection,
    PeerConnectionConfig, PeerConnectionFactory, PeerError, PeerEvent, PeerSignalingState,
    StatsEntry, StatsReport, TrackKind,
};

// signaling vocabulary needed to implement the collaborator traits
pub use rtcall_signaling_core::{
    ChannelEvent, ChannelState, IceCandidate, IceServer, JoinResponse, JoinResultCode,
    MessageQueue, MessageResponse, MessageResultCode, RoomServerClient, SdpType,
    SessionDescription, SignalingChannel, SignalingChannelFactory, SignalingError,
    SignalingMessage, SignalingResult, TurnClient,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
