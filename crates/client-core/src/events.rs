//! Event handling for call client operations
//!
//! Everything observable about a call is reported twice: through the
//! [`CallEventHandler`] registered at build time, and through a broadcast
//! stream any number of listeners can subscribe to. Both carry the same
//! [`CallEvent`] payloads.
//!
//! # Usage Examples
//!
//! ## Basic Event Handler
//!
//! ```rust
//! use rtcall_client_core::events::{CallEventHandler, StateChangeInfo, ErrorInfo};
//! use async_trait::async_trait;
//!
//! struct MyEventHandler;
//!
//! #[async_trait]
//! impl CallEventHandler for MyEventHandler {
//!     async fn on_state_changed(&self, info: StateChangeInfo) {
//!         println!("Call {} is now {}", info.call_id, info.new_state);
//!     }
//!
//!     async fn on_error(&self, info: ErrorInfo) {
//!         eprintln!("Call {} failed: {}", info.call_id, info.error);
//!     }
//! }
//! ```

use chrono::{DateTime, Utc};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::call::{CallId, CallState};
use crate::error::ClientError;
use crate::peer::{IceConnectionState, MediaTrack, StatsReport};

/// Information about a call state transition
#[derive(Debug, Clone)]
pub struct StateChangeInfo {
    /// Call that changed state
    pub call_id: CallId,
    /// State before the transition
    pub previous_state: CallState,
    /// State after the transition
    pub new_state: CallState,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
}

/// Information about an ICE connectivity change
#[derive(Debug, Clone)]
pub struct IceConnectionInfo {
    /// Call whose connectivity changed
    pub call_id: CallId,
    /// New ICE connection state
    pub state: IceConnectionState,
    /// When the change occurred
    pub timestamp: DateTime<Utc>,
}

/// Information about a media track the peer connection surfaced
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Call the track belongs to
    pub call_id: CallId,
    /// The track
    pub track: MediaTrack,
    /// When the track appeared
    pub timestamp: DateTime<Utc>,
}

/// A statistics snapshot collected from the peer connection
#[derive(Debug, Clone)]
pub struct StatsInfo {
    /// Call the snapshot belongs to
    pub call_id: CallId,
    /// The snapshot
    pub report: StatsReport,
    /// When the snapshot was collected
    pub timestamp: DateTime<Utc>,
}

/// Information about a fatal call error
///
/// By the time this is delivered the session has already been torn down
/// and the state observer has seen `Disconnected`.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Call that failed
    pub call_id: CallId,
    /// What went wrong
    pub error: ClientError,
    /// When the failure was detected
    pub timestamp: DateTime<Utc>,
}

/// Events emitted by the call client
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The call moved between Disconnected, Connecting, and Connected
    StateChanged(StateChangeInfo),
    /// Peer connectivity changed
    IceConnectionStateChanged(IceConnectionInfo),
    /// A local capture track was attached
    LocalTrackAdded(TrackInfo),
    /// The remote side added a track
    RemoteTrackAdded(TrackInfo),
    /// A periodic statistics snapshot was collected
    StatsCollected(StatsInfo),
    /// The call failed and was torn down
    ErrorOccurred(ErrorInfo),
}

/// Event handler trait for call client events
///
/// State changes and errors must be handled; the media and statistics
/// callbacks default to no-ops for clients that do not care about them.
#[async_trait]
pub trait CallEventHandler: Send + Sync {
    /// Handle a call state transition
    async fn on_state_changed(&self, info: StateChangeInfo);

    /// Handle a fatal call error. The session is already torn down.
    async fn on_error(&self, info: ErrorInfo);

    /// Handle an ICE connectivity change (optional)
    async fn on_ice_connection_state_changed(&self, _info: IceConnectionInfo) {}

    /// Handle a local track attaching (optional)
    async fn on_local_track(&self, _info: TrackInfo) {}

    /// Handle a remote track arriving (optional)
    async fn on_remote_track(&self, _info: TrackInfo) {}

    /// Handle a statistics snapshot (optional)
    async fn on_stats(&self, _info: StatsInfo) {}
}

/// Event stream type
pub type EventStream = BroadcastStream<CallEvent>;

/// Simple event iterator that doesn't require StreamExt
pub struct EventIterator {
    stream: EventStream,
}

impl EventIterator {
    /// Create a new event iterator from a stream
    pub fn new(stream: EventStream) -> Self {
        Self { stream }
    }

    /// Get the next event, skipping over lagged gaps
    pub async fn next(&mut self) -> Option<CallEvent> {
        use tokio_stream::StreamExt;
        loop {
            match self.stream.next().await {
                Some(Ok(event)) => return Some(event),
                Some(Err(_)) => continue,
                None => return None,
            }
        }
    }
}

/// Event emitter for the call client
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<CallEvent>,
}

impl EventEmitter {
    /// Create a new event emitter with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event
    pub fn emit(&self, event: CallEvent) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Subscribe to events with a simple iterator
    pub fn subscribe_simple(&self) -> EventIterator {
        EventIterator::new(self.subscribe())
    }

    /// Get the number of active receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
