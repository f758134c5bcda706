//! Peer connection abstraction
//!
//! The call client drives negotiation through these traits instead of a
//! concrete WebRTC stack. An implementation wraps a real peer connection;
//! tests wire in scripted fakes. Asynchronous peer activity (trickled
//! candidates, connectivity changes, tracks) flows back through an event
//! channel handed to the factory at creation time.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use rtcall_signaling_core::{IceCandidate, IceServer, SessionDescription};

/// Mandatory constraint requesting inbound audio in an offer
pub const OFFER_TO_RECEIVE_AUDIO: &str = "OfferToReceiveAudio";
/// Mandatory constraint requesting inbound video in an offer
pub const OFFER_TO_RECEIVE_VIDEO: &str = "OfferToReceiveVideo";
/// Optional constraint controlling DTLS-SRTP key agreement
pub const DTLS_SRTP_KEY_AGREEMENT: &str = "DtlsSrtpKeyAgreement";
/// Optional constraint enabling automatic audio level control
pub const LEVEL_CONTROL: &str = "levelControl";

/// Key-value constraints passed to the negotiation engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    /// Constraints the engine must honor
    pub mandatory: HashMap<String, String>,
    /// Constraints the engine may honor
    pub optional: HashMap<String, String>,
}

impl MediaConstraints {
    /// Create an empty constraint set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mandatory constraint
    pub fn with_mandatory(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.mandatory.insert(key.into(), value.into());
        self
    }

    /// Add an optional constraint
    pub fn with_optional(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.optional.insert(key.into(), value.into());
        self
    }
}

/// Everything a factory needs to build a peer connection for one call
#[derive(Debug, Clone)]
pub struct PeerConnectionConfig {
    /// ICE servers gathered from defaults, the relay service, and the room
    pub ice_servers: Vec<IceServer>,
    /// Connection-level constraints
    pub constraints: MediaConstraints,
    /// Skip local video capture
    pub audio_only: bool,
    /// Constraints for the local audio source
    pub audio_constraints: MediaConstraints,
}

/// ICE connection state reported by the peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IceConnectionState {
    /// No checks have run yet
    New,
    /// Candidate pairs are being checked
    Checking,
    /// A usable pair was found
    Connected,
    /// Checking finished with a usable pair
    Completed,
    /// No usable pair could be found
    Failed,
    /// Connectivity was lost
    Disconnected,
    /// The connection was shut down
    Closed,
}

impl fmt::Display for IceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IceConnectionState::New => "new",
            IceConnectionState::Checking => "checking",
            IceConnectionState::Connected => "connected",
            IceConnectionState::Completed => "completed",
            IceConnectionState::Failed => "failed",
            IceConnectionState::Disconnected => "disconnected",
            IceConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// ICE gathering state reported by the peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IceGatheringState {
    /// Gathering has not started
    New,
    /// Candidates are being gathered
    Gathering,
    /// All candidates have been gathered
    Complete,
}

impl fmt::Display for IceGatheringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IceGatheringState::New => "new",
            IceGatheringState::Gathering => "gathering",
            IceGatheringState::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Negotiation signaling state of the peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerSignalingState {
    /// No offer or answer outstanding
    Stable,
    /// A local offer has been applied
    HaveLocalOffer,
    /// A provisional local answer has been applied
    HaveLocalPrAnswer,
    /// A remote offer has been applied
    HaveRemoteOffer,
    /// A provisional remote answer has been applied
    HaveRemotePrAnswer,
    /// The connection was shut down
    Closed,
}

impl fmt::Display for PeerSignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeerSignalingState::Stable => "stable",
            PeerSignalingState::HaveLocalOffer => "have-local-offer",
            PeerSignalingState::HaveLocalPrAnswer => "have-local-pranswer",
            PeerSignalingState::HaveRemoteOffer => "have-remote-offer",
            PeerSignalingState::HaveRemotePrAnswer => "have-remote-pranswer",
            PeerSignalingState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// A local or remote media track surfaced by the peer connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTrack {
    /// Track identifier assigned by the engine
    pub id: String,
    /// Audio or video
    pub kind: TrackKind,
}

impl MediaTrack {
    /// Create a track descriptor
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// One record in a stats snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsEntry {
    /// Report identifier
    pub id: String,
    /// Report type, e.g. `ssrc` or `googCandidatePair`
    pub kind: String,
    /// Engine timestamp in milliseconds
    pub timestamp: f64,
    /// Raw stat values
    pub values: HashMap<String, String>,
}

/// A point-in-time statistics snapshot from the peer connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// All records in the snapshot
    pub entries: Vec<StatsEntry>,
}

/// Asynchronous notifications from the peer connection
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// The engine gathered a local candidate to trickle to the peer
    IceCandidate(IceCandidate),
    /// Previously trickled candidates are no longer usable
    IceCandidatesRemoved(Vec<IceCandidate>),
    /// Connectivity state changed
    IceConnectionStateChanged(IceConnectionState),
    /// Gathering state changed
    IceGatheringStateChanged(IceGatheringState),
    /// Negotiation state changed
    SignalingStateChanged(PeerSignalingState),
    /// A local capture track was attached
    LocalTrack(MediaTrack),
    /// The remote side added a track
    RemoteTrack(MediaTrack),
    /// The engine wants a new offer/answer round
    RenegotiationNeeded,
}

/// Failure reported by the negotiation engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PeerError {
    /// Engine-provided failure detail
    pub message: String,
}

impl PeerError {
    /// Create a peer error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One peer connection driving media negotiation for a single call
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Create an offer describing local media
    async fn create_offer(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<SessionDescription, PeerError>;

    /// Create an answer to a previously applied remote offer
    async fn create_answer(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<SessionDescription, PeerError>;

    /// Apply a local description produced by this connection
    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError>;

    /// Apply a description received from the peer
    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError>;

    /// Feed a remote candidate into connectivity checks
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError>;

    /// Withdraw remote candidates the peer revoked
    async fn remove_ice_candidates(&self, candidates: Vec<IceCandidate>)
        -> Result<(), PeerError>;

    /// Currently applied local description, if any
    fn local_description(&self) -> Option<SessionDescription>;

    /// Collect a statistics snapshot
    async fn get_stats(&self) -> Result<StatsReport, PeerError>;

    /// Shut the connection down and release media resources
    async fn close(&self);
}

/// Builds peer connections for the call client
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    /// Create a peer connection. Asynchronous peer activity must be
    /// delivered through `events` for the lifetime of the connection.
    async fn create(
        &self,
        config: PeerConnectionConfig,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Box<dyn PeerConnection>, PeerError>;
}
