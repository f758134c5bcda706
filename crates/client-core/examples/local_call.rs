//! Local Call Example
//!
//! This example runs a complete call between two in-process clients. An
//! in-memory switchboard plays the part of the room server and signaling
//! channels, and a scripted peer connection stands in for a real WebRTC
//! stack, so the whole offer/answer/candidate exchange is observable
//! without any network.
//!
//! Run with: cargo run --example local_call

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use rtcall_client_core::{
    CallClient, CallClientBuilder, CallConfig, CallEventHandler, CallState, ChannelEvent,
    ChannelState, ConnectOptions, ErrorInfo, IceCandidate, IceConnectionInfo,
    IceConnectionState, IceServer, JoinResponse, JoinResultCode, MediaConstraints, MediaTrack,
    MessageResponse, MessageResultCode, PeerConnection, PeerConnectionConfig,
    PeerConnectionFactory, PeerError, PeerEvent, RoomServerClient, SessionDescription,
    SignalingChannel, SignalingChannelFactory, SignalingError, SignalingMessage,
    SignalingResult, StateChangeInfo, TrackInfo, TrackKind, TurnClient,
};

fn demo_sdp() -> String {
    [
        "v=0",
        "o=- 0 2 IN IP4 127.0.0.1",
        "s=-",
        "t=0 0",
        "m=audio 9 UDP/TLS/RTP/SAVPF 111",
        "a=rtpmap:111 opus/48000/2",
        "m=video 9 UDP/TLS/RTP/SAVPF 100 96",
        "a=rtpmap:100 VP8/90000",
        "a=rtpmap:96 H264/90000",
    ]
    .join("\r\n")
}

/// In-memory room server and message router. The first client to join is
/// the initiator; messages posted before the second client arrives are
/// held and handed out with its join response, exactly like the real
/// room server's message store.
struct Switchboard {
    state: Mutex<SwitchboardState>,
}

#[derive(Default)]
struct SwitchboardState {
    joined: Vec<String>,
    backlog: Vec<(String, SignalingMessage)>,
    channels: HashMap<String, mpsc::UnboundedSender<ChannelEvent>>,
}

impl Switchboard {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SwitchboardState::default()),
        })
    }

    /// Deliver a message to the party that is not `from`, or hold it
    /// until that party joins or registers its channel.
    fn route(&self, from: &str, message: SignalingMessage) {
        let mut state = self.state.lock().unwrap();
        let target = state
            .joined
            .iter()
            .find(|id| id.as_str() != from)
            .cloned()
            .and_then(|id| state.channels.get(&id).cloned());
        match target {
            Some(tx) => {
                let _ = tx.send(ChannelEvent::MessageReceived(message));
            }
            None => state.backlog.push((from.to_string(), message)),
        }
    }

    fn attach_channel(&self, client_id: &str, events: mpsc::UnboundedSender<ChannelEvent>) {
        let mut state = self.state.lock().unwrap();
        state
            .channels
            .insert(client_id.to_string(), events.clone());
        // flush anything the other party sent while we were attaching
        let mut rest = Vec::new();
        for (from, message) in state.backlog.drain(..) {
            if from != client_id {
                let _ = events.send(ChannelEvent::MessageReceived(message));
            } else {
                rest.push((from, message));
            }
        }
        state.backlog = rest;
    }
}

#[async_trait]
impl RoomServerClient for Switchboard {
    async fn join(&self, room_id: &str, _loopback: bool) -> SignalingResult<JoinResponse> {
        let mut state = self.state.lock().unwrap();
        let is_initiator = state.joined.is_empty();
        let client_id = if is_initiator { "caller" } else { "callee" }.to_string();
        state.joined.push(client_id.clone());
        let messages = if is_initiator {
            Vec::new()
        } else {
            let backlog = std::mem::take(&mut state.backlog);
            backlog
                .into_iter()
                .filter(|(from, _)| *from != client_id)
                .map(|(_, message)| message)
                .collect()
        };
        Ok(JoinResponse {
            result: JoinResultCode::Success,
            is_initiator,
            room_id: room_id.to_string(),
            client_id,
            messages,
            signaling_url: Some(Url::parse("wss://switchboard.local/ws").unwrap()),
            signaling_rest_url: Some(Url::parse("https://switchboard.local").unwrap()),
        })
    }

    async fn send(
        &self,
        message: &SignalingMessage,
        _room_id: &str,
        client_id: &str,
    ) -> SignalingResult<MessageResponse> {
        self.route(client_id, message.clone());
        Ok(MessageResponse {
            result: MessageResultCode::Success,
        })
    }

    async fn leave(&self, _room_id: &str, client_id: &str) -> SignalingResult<()> {
        let mut state = self.state.lock().unwrap();
        state.joined.retain(|id| id != client_id);
        state.channels.remove(client_id);
        Ok(())
    }
}

/// No relay servers in-process; the call runs on the default STUN entry.
struct NoRelay;

#[async_trait]
impl TurnClient for NoRelay {
    async fn request_servers(&self) -> SignalingResult<Vec<IceServer>> {
        Ok(Vec::new())
    }
}

struct SwitchboardChannel {
    switchboard: Arc<Switchboard>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    client_id: Mutex<Option<String>>,
    state: Mutex<ChannelState>,
}

#[async_trait]
impl SignalingChannel for SwitchboardChannel {
    async fn register(&self, _room_id: &str, client_id: &str) -> SignalingResult<()> {
        self.switchboard
            .attach_channel(client_id, self.events.clone());
        *self.client_id.lock().unwrap() = Some(client_id.to_string());
        *self.state.lock().unwrap() = ChannelState::Registered;
        let _ = self
            .events
            .send(ChannelEvent::StateChanged(ChannelState::Registered));
        Ok(())
    }

    async fn send(&self, message: &SignalingMessage) -> SignalingResult<()> {
        let client_id = self.client_id.lock().unwrap().clone();
        match client_id {
            Some(client_id) => {
                self.switchboard.route(&client_id, message.clone());
                Ok(())
            }
            None => Err(SignalingError::channel_not_ready(
                ChannelState::Closed.to_string(),
            )),
        }
    }

    fn state(&self) -> ChannelState {
        *self.state.lock().unwrap()
    }
}

struct SwitchboardChannelFactory {
    switchboard: Arc<Switchboard>,
}

#[async_trait]
impl SignalingChannelFactory for SwitchboardChannelFactory {
    async fn create(
        &self,
        _url: &Url,
        _rest_url: &Url,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> SignalingResult<Box<dyn SignalingChannel>> {
        Ok(Box::new(SwitchboardChannel {
            switchboard: self.switchboard.clone(),
            events,
            client_id: Mutex::new(None),
            state: Mutex::new(ChannelState::Closed),
        }))
    }
}

/// Scripted peer connection: hands out a fixed SDP, trickles one host
/// candidate after the local description lands, and reports connectivity
/// once both descriptions are in place.
struct DemoPeer {
    events: mpsc::UnboundedSender<PeerEvent>,
    audio_only: bool,
    local: Mutex<Option<SessionDescription>>,
    remote_set: Mutex<bool>,
}

impl DemoPeer {
    fn check_connectivity(&self) {
        let connected = self.local.lock().unwrap().is_some() && *self.remote_set.lock().unwrap();
        if connected {
            let _ = self.events.send(PeerEvent::IceConnectionStateChanged(
                IceConnectionState::Checking,
            ));
            let _ = self.events.send(PeerEvent::IceConnectionStateChanged(
                IceConnectionState::Connected,
            ));
        }
    }
}

#[async_trait]
impl PeerConnection for DemoPeer {
    async fn create_offer(
        &self,
        _constraints: &MediaConstraints,
    ) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::offer(demo_sdp()))
    }

    async fn create_answer(
        &self,
        _constraints: &MediaConstraints,
    ) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::answer(demo_sdp()))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        *self.local.lock().unwrap() = Some(description);
        let _ = self.events.send(PeerEvent::LocalTrack(MediaTrack::new(
            "local-audio",
            TrackKind::Audio,
        )));
        if !self.audio_only {
            let _ = self.events.send(PeerEvent::LocalTrack(MediaTrack::new(
                "local-video",
                TrackKind::Video,
            )));
        }
        let _ = self.events.send(PeerEvent::IceCandidate(IceCandidate::new(
            "audio",
            0,
            "candidate:1 1 udp 2122260223 127.0.0.1 50000 typ host",
        )));
        self.check_connectivity();
        Ok(())
    }

    async fn set_remote_description(
        &self,
        _description: SessionDescription,
    ) -> Result<(), PeerError> {
        *self.remote_set.lock().unwrap() = true;
        let _ = self.events.send(PeerEvent::RemoteTrack(MediaTrack::new(
            "remote-audio",
            TrackKind::Audio,
        )));
        self.check_connectivity();
        Ok(())
    }

    async fn add_ice_candidate(&self, _candidate: IceCandidate) -> Result<(), PeerError> {
        Ok(())
    }

    async fn remove_ice_candidates(
        &self,
        _candidates: Vec<IceCandidate>,
    ) -> Result<(), PeerError> {
        Ok(())
    }

    fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    async fn get_stats(&self) -> Result<rtcall_client_core::StatsReport, PeerError> {
        Ok(rtcall_client_core::StatsReport::default())
    }

    async fn close(&self) {}
}

struct DemoPeerFactory;

#[async_trait]
impl PeerConnectionFactory for DemoPeerFactory {
    async fn create(
        &self,
        config: PeerConnectionConfig,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Box<dyn PeerConnection>, PeerError> {
        Ok(Box::new(DemoPeer {
            events,
            audio_only: config.audio_only,
            local: Mutex::new(None),
            remote_set: Mutex::new(false),
        }))
    }
}

/// Prints everything a call reports, prefixed with the party name.
struct PrintHandler {
    name: &'static str,
}

#[async_trait]
impl CallEventHandler for PrintHandler {
    async fn on_state_changed(&self, info: StateChangeInfo) {
        println!(
            "  [{}] {} -> {}",
            self.name, info.previous_state, info.new_state
        );
    }

    async fn on_error(&self, info: ErrorInfo) {
        println!("  [{}] ❌ {}", self.name, info.error);
    }

    async fn on_ice_connection_state_changed(&self, info: IceConnectionInfo) {
        println!("  [{}] 🧊 ice {}", self.name, info.state);
    }

    async fn on_local_track(&self, info: TrackInfo) {
        println!("  [{}] 🎤 local {} track", self.name, info.track.kind);
    }

    async fn on_remote_track(&self, info: TrackInfo) {
        println!("  [{}] 📺 remote {} track", self.name, info.track.kind);
    }
}

async fn build_party(
    name: &'static str,
    switchboard: Arc<Switchboard>,
) -> Result<CallClient, Box<dyn std::error::Error>> {
    let client = CallClientBuilder::new()
        .config(CallConfig::new())
        .room_client(switchboard.clone())
        .turn_client(Arc::new(NoRelay))
        .channel_factory(Arc::new(SwitchboardChannelFactory { switchboard }))
        .peer_factory(Arc::new(DemoPeerFactory))
        .handler(Arc::new(PrintHandler { name }))
        .build()
        .await?;
    Ok(client)
}

async fn wait_for(client: &CallClient, target: CallState) {
    let mut state_rx = client.watch_state();
    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while *state_rx.borrow() != target {
            if state_rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("📞 Local Call Example");
    println!("=====================\n");

    let switchboard = Switchboard::new();
    let caller = build_party("caller", switchboard.clone()).await?;
    let callee = build_party("callee", switchboard.clone()).await?;

    println!("🚀 caller dials into demo-room...");
    caller.connect("demo-room", ConnectOptions::new()).await?;
    wait_for(&caller, CallState::Connected).await;

    println!("🚀 callee joins demo-room...");
    callee.connect("demo-room", ConnectOptions::new()).await?;
    wait_for(&callee, CallState::Connected).await;

    // let the answer and candidates finish flowing
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("\n✅ both parties negotiated");

    println!("\n👋 caller hangs up...");
    caller.disconnect().await;
    wait_for(&callee, CallState::Disconnected).await;
    println!("✅ callee saw the hangup\n");

    caller.shutdown().await;
    callee.shutdown().await;

    println!("🏁 done");
    Ok(())
}
