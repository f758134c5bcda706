//! Per-call session state
//!
//! One `Session` lives inside the engine and is rebuilt for every connect.
//! Only the engine task touches it, so none of the fields need locks.

use url::Url;

use rtcall_signaling_core::{IceServer, MessageQueue, SignalingChannel};

use crate::call::{CallId, CallRole, CallState, ConnectOptions};
use crate::client::gate::JoinGate;
use crate::peer::PeerConnection;

pub(crate) struct Session {
    /// Identity of the current call attempt. Completions of background
    /// work carry the id they were started under; anything that does not
    /// match the live id is stale and dropped.
    pub call_id: CallId,
    pub state: CallState,
    pub role: Option<CallRole>,
    pub room_id: String,
    pub client_id: String,
    pub options: ConnectOptions,
    pub ice_servers: Vec<IceServer>,
    pub gate: JoinGate,
    pub queue: MessageQueue,
    pub signaling_url: Option<Url>,
    pub signaling_rest_url: Option<Url>,
    pub peer: Option<Box<dyn PeerConnection>>,
    pub channel: Option<Box<dyn SignalingChannel>>,
    pub loopback_channel: Option<Box<dyn SignalingChannel>>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            call_id: CallId::new_v4(),
            state: CallState::Disconnected,
            role: None,
            room_id: String::new(),
            client_id: String::new(),
            options: ConnectOptions::default(),
            ice_servers: Vec::new(),
            gate: JoinGate::new(),
            queue: MessageQueue::new(),
            signaling_url: None,
            signaling_rest_url: None,
            peer: None,
            channel: None,
            loopback_channel: None,
        }
    }

    /// Start a fresh call attempt and return its id.
    pub(crate) fn begin(&mut self, room_id: String, options: ConnectOptions) -> CallId {
        self.reset();
        self.call_id = CallId::new_v4();
        self.room_id = room_id;
        self.options = options;
        self.call_id
    }

    /// Whether the completion of work started under `call_id` still
    /// belongs to the live session.
    pub(crate) fn is_current(&self, call_id: CallId) -> bool {
        self.state != CallState::Disconnected && self.call_id == call_id
    }

    /// Whether the room join has completed and handed out an identity.
    pub(crate) fn has_joined_room(&self) -> bool {
        !self.client_id.is_empty()
    }

    /// Clear everything belonging to the current attempt. Keeps `call_id`
    /// and `state` so the final state transition can name the ended call.
    pub(crate) fn reset(&mut self) {
        self.role = None;
        self.room_id.clear();
        self.client_id.clear();
        self.options = ConnectOptions::default();
        self.ice_servers.clear();
        self.gate.reset();
        self.queue.clear();
        self.signaling_url = None;
        self.signaling_rest_url = None;
        self.peer = None;
        self.channel = None;
        self.loopback_channel = None;
    }
}
