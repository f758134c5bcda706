//! # Signaling Core - Protocol Model for Room-Based Calling
//!
//! This crate is the protocol layer under the rtcall client: the signaling
//! message model and its JSON wire form, the ordering queue that keeps the
//! offer/answer exchange ahead of candidate application, the SDP
//! codec-preference rewrite, and the contracts the call orchestrator
//! requires from its transport collaborators (room server, signaling
//! channel, relay discovery).
//!
//! It carries no transport of its own. HTTP and websocket bindings live
//! with embedders; everything here is pure data plus `async_trait`
//! contracts.
//!
//! ## Quick Start
//!
//! ```rust
//! use rtcall_signaling_core::{
//!     prefer_video_codec, MessageQueue, SessionDescription, SignalingMessage,
//! };
//!
//! // Wire form round trip
//! let offer = SignalingMessage::Offer(SessionDescription::offer(
//!     "v=0\nm=video 9 UDP/TLS/RTP/SAVPF 100 96\na=rtpmap:96 H264/90000",
//! ));
//! let json = offer.to_json().unwrap();
//! let decoded = SignalingMessage::from_json(&json).unwrap();
//!
//! // Descriptions jump ahead of buffered candidates
//! let mut queue = MessageQueue::new();
//! queue.push(decoded);
//! assert!(queue.has_session_description());
//!
//! // Codec preference
//! let preferred = prefer_video_codec(offer.description().unwrap(), "H264");
//! assert!(preferred.sdp.contains("SAVPF 96 100"));
//! ```

#![warn(missing_docs)]

pub mod channel;
pub mod error;
pub mod ice;
pub mod message;
pub mod queue;
pub mod room;
pub mod sdp;
pub mod turn;

// Re-export the protocol surface
pub use channel::{ChannelEvent, ChannelState, SignalingChannel, SignalingChannelFactory};
pub use error::{SignalingError, SignalingResult};
pub use ice::{IceCandidate, IceServer};
pub use message::SignalingMessage;
pub use queue::MessageQueue;
pub use room::{
    JoinResponse, JoinResultCode, MessageResponse, MessageResultCode, RoomServerClient,
};
pub use sdp::{prefer_video_codec, SdpType, SessionDescription};
pub use turn::TurnClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
