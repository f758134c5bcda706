//! Shared test doubles for the call client integration tests
//!
//! Every collaborator the client needs has a scripted stand-in here:
//! a room server with a canned join response, a relay client, a channel
//! factory whose channels the tests can speak through, and a peer
//! connection that records what the engine does to it.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use rtcall_client_core::{
    CallClient, CallClientBuilder, CallConfig, CallEvent, CallEventHandler, CallState,
    ChannelEvent, ChannelState, ClientError, ErrorInfo, EventIterator, IceCandidate,
    IceConnectionInfo, IceConnectionState, IceServer, JoinResponse, JoinResultCode,
    MessageResponse, MessageResultCode, PeerConnection, PeerConnectionConfig,
    PeerConnectionFactory, PeerError, PeerEvent, RoomServerClient, SessionDescription,
    SignalingChannel, SignalingChannelFactory, SignalingError, SignalingMessage,
    SignalingResult, StateChangeInfo, StatsInfo, StatsReport, TrackInfo, TurnClient,
};

/// SDP used by the mock peer: video payloads 100 (VP8), 101 (VP9), and
/// 96 (H264), so the default H264 preference reorders the media line.
pub fn multi_codec_sdp() -> String {
    [
        "v=0",
        "o=- 4611731400430051336 2 IN IP4 127.0.0.1",
        "s=-",
        "t=0 0",
        "m=audio 9 UDP/TLS/RTP/SAVPF 111",
        "a=rtpmap:111 opus/48000/2",
        "m=video 9 UDP/TLS/RTP/SAVPF 100 101 96",
        "a=rtpmap:100 VP8/90000",
        "a=rtpmap:101 VP9/90000",
        "a=rtpmap:96 H264/90000",
    ]
    .join("\r\n")
}

/// The media line `multi_codec_sdp` ends up with after H264 is preferred
pub const PREFERRED_VIDEO_LINE: &str = "m=video 9 UDP/TLS/RTP/SAVPF 96 100 101";

pub fn test_url() -> Url {
    Url::parse("wss://signal.test/ws").unwrap()
}

pub fn test_rest_url() -> Url {
    Url::parse("https://signal.test/messages").unwrap()
}

/// Successful join response placing this client first in the room
pub fn join_as_initiator(room_id: &str) -> JoinResponse {
    JoinResponse {
        result: JoinResultCode::Success,
        is_initiator: true,
        room_id: room_id.to_string(),
        client_id: "client-a".to_string(),
        messages: Vec::new(),
        signaling_url: Some(test_url()),
        signaling_rest_url: Some(test_rest_url()),
    }
}

/// Successful join response placing this client second, with the
/// messages the initiator already posted
pub fn join_as_responder(room_id: &str, messages: Vec<SignalingMessage>) -> JoinResponse {
    JoinResponse {
        result: JoinResultCode::Success,
        is_initiator: false,
        room_id: room_id.to_string(),
        client_id: "client-b".to_string(),
        messages,
        signaling_url: Some(test_url()),
        signaling_rest_url: Some(test_rest_url()),
    }
}

// ---------------------------------------------------------------------
// Room server
// ---------------------------------------------------------------------

pub struct MockRoomServer {
    join_result: Mutex<SignalingResult<JoinResponse>>,
    send_result: Mutex<MessageResultCode>,
    join_delay: Mutex<Option<Duration>>,
    sent: Mutex<Vec<SignalingMessage>>,
    left: Mutex<Vec<(String, String)>>,
}

impl MockRoomServer {
    pub fn new(response: JoinResponse) -> Arc<Self> {
        Arc::new(Self {
            join_result: Mutex::new(Ok(response)),
            send_result: Mutex::new(MessageResultCode::Success),
            join_delay: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            left: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            join_result: Mutex::new(Err(SignalingError::transport(message))),
            send_result: Mutex::new(MessageResultCode::Success),
            join_delay: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            left: Mutex::new(Vec::new()),
        })
    }

    pub fn set_join_delay(&self, delay: Duration) {
        *self.join_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_send_result(&self, code: MessageResultCode) {
        *self.send_result.lock().unwrap() = code;
    }

    /// Messages the initiator posted through the room server
    pub fn sent_messages(&self) -> Vec<SignalingMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// (room_id, client_id) pairs that left
    pub fn leaves(&self) -> Vec<(String, String)> {
        self.left.lock().unwrap().clone()
    }

    pub async fn wait_for_message(&self) -> SignalingMessage {
        for _ in 0..400 {
            if let Some(message) = self.sent.lock().unwrap().first().cloned() {
                return message;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no message was posted to the room server");
    }

    pub async fn wait_for_leave(&self) {
        for _ in 0..400 {
            if !self.left.lock().unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("nobody left the room");
    }
}

#[async_trait]
impl RoomServerClient for MockRoomServer {
    async fn join(&self, _room_id: &str, _loopback: bool) -> SignalingResult<JoinResponse> {
        let delay = *self.join_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.join_result.lock().unwrap().clone()
    }

    async fn send(
        &self,
        message: &SignalingMessage,
        _room_id: &str,
        _client_id: &str,
    ) -> SignalingResult<MessageResponse> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(MessageResponse {
            result: *self.send_result.lock().unwrap(),
        })
    }

    async fn leave(&self, room_id: &str, client_id: &str) -> SignalingResult<()> {
        self.left
            .lock()
            .unwrap()
            .push((room_id.to_string(), client_id.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Relay discovery
// ---------------------------------------------------------------------

pub struct MockTurnClient {
    result: Mutex<SignalingResult<Vec<IceServer>>>,
    delay: Mutex<Option<Duration>>,
}

impl MockTurnClient {
    pub fn with_servers(servers: Vec<IceServer>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(servers)),
            delay: Mutex::new(None),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::with_servers(Vec::new())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Err(SignalingError::transport(message))),
            delay: Mutex::new(None),
        })
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl TurnClient for MockTurnClient {
    async fn request_servers(&self) -> SignalingResult<Vec<IceServer>> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.result.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------
// Signaling channel
// ---------------------------------------------------------------------

/// Test-side view of a channel the factory handed to the engine. The
/// `events` sender injects traffic as if the remote peer produced it.
#[derive(Clone)]
pub struct MockChannelHandle {
    pub events: mpsc::UnboundedSender<ChannelEvent>,
    pub state: Arc<Mutex<ChannelState>>,
    pub sent: Arc<Mutex<Vec<SignalingMessage>>>,
}

impl MockChannelHandle {
    pub fn sent_messages(&self) -> Vec<SignalingMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Deliver a message as if the peer sent it
    pub fn receive(&self, message: SignalingMessage) {
        self.events
            .send(ChannelEvent::MessageReceived(message))
            .expect("engine is listening");
    }

    pub fn change_state(&self, state: ChannelState) {
        *self.state.lock().unwrap() = state;
        self.events
            .send(ChannelEvent::StateChanged(state))
            .expect("engine is listening");
    }

    pub async fn wait_for_message(&self) -> SignalingMessage {
        for _ in 0..400 {
            if let Some(message) = self.sent.lock().unwrap().first().cloned() {
                return message;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no message was sent over the channel");
    }
}

struct MockChannel {
    events: mpsc::UnboundedSender<ChannelEvent>,
    state: Arc<Mutex<ChannelState>>,
    sent: Arc<Mutex<Vec<SignalingMessage>>>,
    fail_send: bool,
}

#[async_trait]
impl SignalingChannel for MockChannel {
    async fn register(&self, _room_id: &str, _client_id: &str) -> SignalingResult<()> {
        *self.state.lock().unwrap() = ChannelState::Registered;
        let _ = self
            .events
            .send(ChannelEvent::StateChanged(ChannelState::Registered));
        Ok(())
    }

    async fn send(&self, message: &SignalingMessage) -> SignalingResult<()> {
        if self.fail_send {
            return Err(SignalingError::transport("mock channel send failed"));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn state(&self) -> ChannelState {
        *self.state.lock().unwrap()
    }
}

pub struct MockChannelFactory {
    handles: Mutex<Vec<MockChannelHandle>>,
    fail_send: bool,
}

impl MockChannelFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handles: Mutex::new(Vec::new()),
            fail_send: false,
        })
    }

    pub fn with_failing_send() -> Arc<Self> {
        Arc::new(Self {
            handles: Mutex::new(Vec::new()),
            fail_send: true,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    pub async fn wait_for_channel(&self) -> MockChannelHandle {
        for _ in 0..400 {
            if let Some(handle) = self.handles.lock().unwrap().first().cloned() {
                return handle;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no signaling channel was created");
    }
}

#[async_trait]
impl SignalingChannelFactory for MockChannelFactory {
    async fn create(
        &self,
        _url: &Url,
        _rest_url: &Url,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> SignalingResult<Box<dyn SignalingChannel>> {
        let state = Arc::new(Mutex::new(ChannelState::Closed));
        let sent = Arc::new(Mutex::new(Vec::new()));
        self.handles.lock().unwrap().push(MockChannelHandle {
            events: events.clone(),
            state: state.clone(),
            sent: sent.clone(),
        });
        Ok(Box::new(MockChannel {
            events,
            state,
            sent,
            fail_send: self.fail_send,
        }))
    }
}

// ---------------------------------------------------------------------
// Peer connection
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct PeerState {
    pub local_description: Option<SessionDescription>,
    pub remote_description: Option<SessionDescription>,
    pub added_candidates: Vec<IceCandidate>,
    pub removed_candidates: Vec<IceCandidate>,
    pub closed: bool,
    /// Names of the operations the engine invoked, in order
    pub ops: Vec<&'static str>,
}

/// Which peer operations should fail
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerBehavior {
    pub fail_create_offer: bool,
    pub fail_create_answer: bool,
    pub fail_set_local: bool,
    pub fail_set_remote: bool,
}

/// Test-side view of a peer connection the factory built. The `events`
/// sender injects peer activity; `state` records what the engine did.
#[derive(Clone)]
pub struct MockPeerHandle {
    pub state: Arc<Mutex<PeerState>>,
    pub config: PeerConnectionConfig,
    pub events: mpsc::UnboundedSender<PeerEvent>,
}

impl MockPeerHandle {
    pub fn local_description(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().local_description.clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().remote_description.clone()
    }

    pub fn added_candidates(&self) -> Vec<IceCandidate> {
        self.state.lock().unwrap().added_candidates.clone()
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Emit peer activity as the negotiation engine would
    pub fn emit(&self, event: PeerEvent) {
        self.events.send(event).expect("engine is listening");
    }

    pub async fn wait_until_closed(&self) {
        for _ in 0..400 {
            if self.is_closed() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("peer connection was never closed");
    }
}

struct MockPeer {
    state: Arc<Mutex<PeerState>>,
    behavior: PeerBehavior,
}

#[async_trait]
impl PeerConnection for MockPeer {
    async fn create_offer(
        &self,
        _constraints: &rtcall_client_core::MediaConstraints,
    ) -> Result<SessionDescription, PeerError> {
        self.state.lock().unwrap().ops.push("create_offer");
        if self.behavior.fail_create_offer {
            return Err(PeerError::new("offer rejected"));
        }
        Ok(SessionDescription::offer(multi_codec_sdp()))
    }

    async fn create_answer(
        &self,
        _constraints: &rtcall_client_core::MediaConstraints,
    ) -> Result<SessionDescription, PeerError> {
        self.state.lock().unwrap().ops.push("create_answer");
        if self.behavior.fail_create_answer {
            return Err(PeerError::new("answer rejected"));
        }
        Ok(SessionDescription::answer(multi_codec_sdp()))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push("set_local_description");
        if self.behavior.fail_set_local {
            return Err(PeerError::new("local description rejected"));
        }
        state.local_description = Some(description);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push("set_remote_description");
        if self.behavior.fail_set_remote {
            return Err(PeerError::new("remote description rejected"));
        }
        state.remote_description = Some(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push("add_ice_candidate");
        state.added_candidates.push(candidate);
        Ok(())
    }

    async fn remove_ice_candidates(
        &self,
        candidates: Vec<IceCandidate>,
    ) -> Result<(), PeerError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push("remove_ice_candidates");
        state.removed_candidates.extend(candidates);
        Ok(())
    }

    fn local_description(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().local_description.clone()
    }

    async fn get_stats(&self) -> Result<StatsReport, PeerError> {
        Ok(StatsReport::default())
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}

pub struct MockPeerFactory {
    handles: Mutex<Vec<MockPeerHandle>>,
    behavior: PeerBehavior,
}

impl MockPeerFactory {
    pub fn new() -> Arc<Self> {
        Self::with_behavior(PeerBehavior::default())
    }

    pub fn with_behavior(behavior: PeerBehavior) -> Arc<Self> {
        Arc::new(Self {
            handles: Mutex::new(Vec::new()),
            behavior,
        })
    }

    pub fn peer_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    pub async fn wait_for_peer(&self) -> MockPeerHandle {
        for _ in 0..400 {
            if let Some(handle) = self.handles.lock().unwrap().first().cloned() {
                return handle;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no peer connection was created");
    }
}

#[async_trait]
impl PeerConnectionFactory for MockPeerFactory {
    async fn create(
        &self,
        config: PeerConnectionConfig,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Box<dyn PeerConnection>, PeerError> {
        let state = Arc::new(Mutex::new(PeerState::default()));
        self.handles.lock().unwrap().push(MockPeerHandle {
            state: state.clone(),
            config,
            events,
        });
        Ok(Box::new(MockPeer {
            state,
            behavior: self.behavior,
        }))
    }
}

// ---------------------------------------------------------------------
// Event handler
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    State(CallState),
    Ice(IceConnectionState),
    LocalTrack,
    RemoteTrack,
    Stats,
    Error(ClientError),
}

/// Handler that records every notification in arrival order
#[derive(Default)]
pub struct RecordingHandler {
    observed: Mutex<Vec<ObservedEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn observed(&self) -> Vec<ObservedEvent> {
        self.observed.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<CallState> {
        self.observed()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ClientError> {
        self.observed()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        self.observed.lock().unwrap().push(event);
    }
}

#[async_trait]
impl CallEventHandler for RecordingHandler {
    async fn on_state_changed(&self, info: StateChangeInfo) {
        self.push(ObservedEvent::State(info.new_state));
    }

    async fn on_error(&self, info: ErrorInfo) {
        self.push(ObservedEvent::Error(info.error));
    }

    async fn on_ice_connection_state_changed(&self, info: IceConnectionInfo) {
        self.push(ObservedEvent::Ice(info.state));
    }

    async fn on_local_track(&self, _info: TrackInfo) {
        self.push(ObservedEvent::LocalTrack);
    }

    async fn on_remote_track(&self, _info: TrackInfo) {
        self.push(ObservedEvent::RemoteTrack);
    }

    async fn on_stats(&self, _info: StatsInfo) {
        self.push(ObservedEvent::Stats);
    }
}

// ---------------------------------------------------------------------
// Assembly and waiting
// ---------------------------------------------------------------------

pub async fn build_client(
    room: Arc<MockRoomServer>,
    turn: Arc<MockTurnClient>,
    channels: Arc<MockChannelFactory>,
    peers: Arc<MockPeerFactory>,
) -> (CallClient, Arc<RecordingHandler>) {
    build_client_with_config(CallConfig::new(), room, turn, channels, peers).await
}

pub async fn build_client_with_config(
    config: CallConfig,
    room: Arc<MockRoomServer>,
    turn: Arc<MockTurnClient>,
    channels: Arc<MockChannelFactory>,
    peers: Arc<MockPeerFactory>,
) -> (CallClient, Arc<RecordingHandler>) {
    let handler = RecordingHandler::new();
    let client = CallClientBuilder::new()
        .config(config)
        .room_client(room)
        .turn_client(turn)
        .channel_factory(channels)
        .peer_factory(peers)
        .handler(handler.clone())
        .build()
        .await
        .expect("client assembles");
    (client, handler)
}

/// Wait until the event stream reports the given state
pub async fn wait_for_state(events: &mut EventIterator, target: CallState) {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(event) = events.next().await {
            if let CallEvent::StateChanged(info) = event {
                if info.new_state == target {
                    return;
                }
            }
        }
        panic!("event stream ended before reaching {target}");
    })
    .await;
    result.unwrap_or_else(|_| panic!("timed out waiting for {target}"));
}

/// Wait until the event stream reports an error
pub async fn wait_for_error(events: &mut EventIterator) -> ClientError {
    tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(event) = events.next().await {
            if let CallEvent::ErrorOccurred(info) = event {
                return info.error;
            }
        }
        panic!("event stream ended before an error");
    })
    .await
    .expect("timed out waiting for an error")
}
