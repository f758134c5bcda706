//! Call engine
//!
//! A single task owns all call state and processes every stimulus in
//! arrival order: API commands, completions of spawned work, channel
//! traffic, and peer connection notifications. Nothing else mutates the
//! session, so message ordering and state transitions need no locks.
//!
//! Long-running startup work (relay discovery, the room join, room server
//! posts) is spawned and reports back as an event tagged with the call id
//! it was started under. Completions whose id no longer matches the live
//! call are dropped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use rtcall_signaling_core::{
    prefer_video_codec, ChannelEvent, ChannelState, IceServer, JoinResponse, MessageResponse,
    RoomServerClient, SessionDescription, SignalingChannelFactory, SignalingError,
    SignalingMessage, SignalingResult, TurnClient,
};

use crate::call::{CallId, CallRole, CallState, ConnectOptions};
use crate::client::config::CallConfig;
use crate::client::session::Session;
use crate::error::{ClientError, ClientResult};
use crate::events::{
    CallEvent, CallEventHandler, ErrorInfo, EventEmitter, IceConnectionInfo, StateChangeInfo,
    StatsInfo, TrackInfo,
};
use crate::peer::{PeerConnectionConfig, PeerConnectionFactory, PeerEvent};

/// API requests forwarded into the engine task
pub(crate) enum Command {
    Connect {
        room_id: String,
        options: ConnectOptions,
        reply: oneshot::Sender<ClientResult<CallId>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Everything the engine task reacts to
pub(crate) enum EngineEvent {
    Command(Command),
    TurnResolved {
        call_id: CallId,
        result: SignalingResult<Vec<IceServer>>,
    },
    JoinCompleted {
        call_id: CallId,
        result: SignalingResult<JoinResponse>,
    },
    SendCompleted {
        call_id: CallId,
        kind: &'static str,
        result: SignalingResult<MessageResponse>,
    },
    Channel {
        call_id: CallId,
        event: ChannelEvent,
    },
    Peer {
        call_id: CallId,
        event: PeerEvent,
    },
    StatsTick {
        call_id: CallId,
    },
}

pub(crate) struct Engine {
    pub(crate) config: CallConfig,
    pub(crate) room_client: Arc<dyn RoomServerClient>,
    pub(crate) turn_client: Arc<dyn TurnClient>,
    pub(crate) channel_factory: Arc<dyn SignalingChannelFactory>,
    pub(crate) peer_factory: Arc<dyn PeerConnectionFactory>,
    pub(crate) handler: Arc<dyn CallEventHandler>,
    pub(crate) events: mpsc::UnboundedReceiver<EngineEvent>,
    pub(crate) self_tx: mpsc::UnboundedSender<EngineEvent>,
    pub(crate) emitter: EventEmitter,
    pub(crate) state_tx: watch::Sender<CallState>,
    pub(crate) session: Session,
    pub(crate) stats_task: Option<JoinHandle<()>>,
}

impl Engine {
    /// Process events until shutdown. Consumes the engine.
    pub(crate) async fn run(mut self) {
        debug!("call engine started");
        while let Some(event) = self.events.recv().await {
            match event {
                EngineEvent::Command(Command::Connect {
                    room_id,
                    options,
                    reply,
                }) => {
                    let result = self.handle_connect(room_id, options).await;
                    let _ = reply.send(result);
                }
                EngineEvent::Command(Command::Disconnect { reply }) => {
                    self.teardown().await;
                    let _ = reply.send(());
                }
                EngineEvent::Command(Command::Shutdown) => break,
                EngineEvent::TurnResolved { call_id, result } => {
                    self.on_turn_resolved(call_id, result).await;
                }
                EngineEvent::JoinCompleted { call_id, result } => {
                    self.on_join_completed(call_id, result).await;
                }
                EngineEvent::SendCompleted {
                    call_id,
                    kind,
                    result,
                } => {
                    self.on_send_completed(call_id, kind, result).await;
                }
                EngineEvent::Channel { call_id, event } => {
                    self.on_channel_event(call_id, event).await;
                }
                EngineEvent::Peer { call_id, event } => {
                    self.on_peer_event(call_id, event).await;
                }
                EngineEvent::StatsTick { call_id } => {
                    self.on_stats_tick(call_id).await;
                }
            }
        }
        self.teardown().await;
        debug!("call engine stopped");
    }

    async fn handle_connect(
        &mut self,
        room_id: String,
        options: ConnectOptions,
    ) -> ClientResult<CallId> {
        if self.session.state != CallState::Disconnected {
            return Err(ClientError::invalid_state(format!(
                "connect requires a disconnected client, but the client is {}",
                self.session.state
            )));
        }
        if room_id.is_empty() {
            return Err(ClientError::invalid_state("connect requires a room id"));
        }

        let call_id = self.session.begin(room_id.clone(), options);
        self.session
            .ice_servers
            .push(self.config.default_ice_server());
        self.set_state(CallState::Connecting).await;

        info!(%call_id, room_id = %self.session.room_id, "connecting");

        // relay discovery and the room join run concurrently; each reports
        // back as an event tagged with this call id
        let turn = self.turn_client.clone();
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            let result = turn.request_servers().await;
            let _ = tx.send(EngineEvent::TurnResolved { call_id, result });
        });

        let room = self.room_client.clone();
        let tx = self.self_tx.clone();
        let loopback = options.loopback;
        tokio::spawn(async move {
            let result = room.join(&room_id, loopback).await;
            let _ = tx.send(EngineEvent::JoinCompleted { call_id, result });
        });

        Ok(call_id)
    }

    async fn on_turn_resolved(
        &mut self,
        call_id: CallId,
        result: SignalingResult<Vec<IceServer>>,
    ) {
        if !self.session.is_current(call_id) {
            debug!(%call_id, "dropping stale relay discovery result");
            return;
        }

        match result {
            Ok(servers) => {
                debug!(count = servers.len(), "relay discovery finished");
                self.session.ice_servers.extend(servers);
            }
            // the call can survive on the default STUN server alone
            Err(error) => {
                warn!(%error, "relay discovery failed, continuing without relay servers");
            }
        }

        if self.session.gate.relay_complete() {
            self.start_signaling().await;
        }
    }

    async fn on_join_completed(
        &mut self,
        call_id: CallId,
        result: SignalingResult<JoinResponse>,
    ) {
        if !self.session.is_current(call_id) {
            debug!(%call_id, "dropping stale join result");
            return;
        }

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                self.fail(error.into()).await;
                return;
            }
        };

        if let Some(error) = ClientError::from_join_result(response.result, &self.session.room_id)
        {
            self.fail(error).await;
            return;
        }

        let role = if response.is_initiator {
            CallRole::Initiator
        } else {
            CallRole::Responder
        };
        self.session.role = Some(role);
        self.session.room_id = response.room_id;
        self.session.client_id = response.client_id;
        self.session.signaling_url = response.signaling_url;
        self.session.signaling_rest_url = response.signaling_rest_url;

        info!(
            %role,
            room_id = %self.session.room_id,
            client_id = %self.session.client_id,
            "joined room"
        );

        // the join response carries messages the peer sent before we
        // arrived; a backlogged bye means the peer already hung up
        for message in response.messages {
            if matches!(message, SignalingMessage::Bye) {
                info!("peer left before signaling started");
                self.teardown().await;
                return;
            }
            self.session.queue.push(message);
        }

        if let Err(error) = self.register_channel().await {
            self.fail(error).await;
            return;
        }

        if self.session.gate.room_complete() {
            self.start_signaling().await;
        }
    }

    /// Create and register the bidirectional signaling channel, if the
    /// join response carried channel endpoints.
    async fn register_channel(&mut self) -> ClientResult<()> {
        let (url, rest_url) = match (
            self.session.signaling_url.clone(),
            self.session.signaling_rest_url.clone(),
        ) {
            (Some(url), Some(rest_url)) => (url, rest_url),
            _ => {
                debug!("join response carried no channel endpoints");
                return Ok(());
            }
        };

        let call_id = self.session.call_id;
        let (channel_tx, mut channel_rx) = mpsc::unbounded_channel();
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = channel_rx.recv().await {
                if tx.send(EngineEvent::Channel { call_id, event }).is_err() {
                    break;
                }
            }
        });

        let channel = self
            .channel_factory
            .create(&url, &rest_url, channel_tx)
            .await
            .map_err(ClientError::from)?;
        channel
            .register(&self.session.room_id, &self.session.client_id)
            .await
            .map_err(ClientError::from)?;
        debug!(%url, "signaling channel registered");
        self.session.channel = Some(channel);

        if self.session.options.loopback {
            self.register_loopback_channel(&url, &rest_url).await;
        }

        Ok(())
    }

    /// Loopback calls answer themselves through a second channel. Losing
    /// it degrades the loopback demo, not the call, so failures only warn.
    async fn register_loopback_channel(&mut self, url: &url::Url, rest_url: &url::Url) {
        match self.channel_factory.create_loopback(url, rest_url).await {
            Ok(Some(loopback)) => {
                match loopback
                    .register(&self.session.room_id, &self.session.client_id)
                    .await
                {
                    Ok(()) => self.session.loopback_channel = Some(loopback),
                    Err(error) => warn!(%error, "loopback channel registration failed"),
                }
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "loopback channel creation failed"),
        }
    }

    /// Both startup legs are done: build the peer connection and start
    /// negotiating.
    async fn start_signaling(&mut self) {
        let call_id = self.session.call_id;
        let role = match self.session.role {
            Some(role) => role,
            None => {
                self.fail(ClientError::internal(
                    "signaling started without a joined room",
                ))
                .await;
                return;
            }
        };

        self.set_state(CallState::Connected).await;
        info!(%role, "starting peer negotiation");

        let config = PeerConnectionConfig {
            ice_servers: self.session.ice_servers.clone(),
            constraints: self
                .config
                .peer_connection_constraints(self.session.options.loopback),
            audio_only: self.session.options.audio_only,
            audio_constraints: self
                .config
                .audio_constraints(self.session.options.use_level_control),
        };

        let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = peer_rx.recv().await {
                if tx.send(EngineEvent::Peer { call_id, event }).is_err() {
                    break;
                }
            }
        });

        let peer = match self.peer_factory.create(config, peer_tx).await {
            Ok(peer) => peer,
            Err(error) => {
                self.fail(ClientError::internal(format!(
                    "failed to create peer connection: {error}"
                )))
                .await;
                return;
            }
        };
        self.session.peer = Some(peer);
        self.start_stats_task();

        match role {
            CallRole::Initiator => self.create_and_send_offer().await,
            // the responder waits for the offer; it may already be queued
            CallRole::Responder => self.drain_queue_if_ready().await,
        }
    }

    async fn create_and_send_offer(&mut self) {
        let constraints = self.config.offer_constraints();
        let offer = match self.session.peer.as_ref() {
            Some(peer) => peer.create_offer(&constraints).await,
            None => return,
        };
        match offer {
            Ok(description) => self.apply_local_description(description).await,
            Err(error) => {
                self.fail(ClientError::description_creation(error.to_string()))
                    .await;
            }
        }
    }

    async fn create_and_send_answer(&mut self) {
        let constraints = self.config.answer_constraints();
        let answer = match self.session.peer.as_ref() {
            Some(peer) => peer.create_answer(&constraints).await,
            None => return,
        };
        match answer {
            Ok(description) => self.apply_local_description(description).await,
            Err(error) => {
                self.fail(ClientError::description_creation(error.to_string()))
                    .await;
            }
        }
    }

    /// Apply a locally created description and send it to the peer. The
    /// codec preference is rewritten before both so the two sides agree.
    async fn apply_local_description(&mut self, description: SessionDescription) {
        let preferred = prefer_video_codec(&description, &self.config.preferred_video_codec);

        let result = match self.session.peer.as_ref() {
            Some(peer) => peer.set_local_description(preferred.clone()).await,
            None => return,
        };
        if let Err(error) = result {
            self.fail(ClientError::description_set(error.to_string()))
                .await;
            return;
        }

        self.send_signaling_message(SignalingMessage::from_description(preferred))
            .await;
    }

    async fn apply_remote_description(&mut self, description: SessionDescription) {
        let preferred = prefer_video_codec(&description, &self.config.preferred_video_codec);

        let result = match self.session.peer.as_ref() {
            Some(peer) => peer.set_remote_description(preferred).await,
            None => return,
        };
        if let Err(error) = result {
            self.fail(ClientError::description_set(error.to_string()))
                .await;
            return;
        }

        // responders answer the first remote offer as soon as it lands
        let needs_answer = self.session.role == Some(CallRole::Responder)
            && self
                .session
                .peer
                .as_ref()
                .map_or(false, |peer| peer.local_description().is_none());
        if needs_answer {
            self.create_and_send_answer().await;
        }
    }

    /// Process queued messages once both preconditions hold: the peer
    /// connection exists and a session description has been queued.
    /// Messages are handled strictly in queue order.
    async fn drain_queue_if_ready(&mut self) {
        if self.session.peer.is_none() || !self.session.queue.has_session_description() {
            return;
        }

        let call_id = self.session.call_id;
        let messages = self.session.queue.take_all();
        debug!(count = messages.len(), "draining queued signaling messages");
        for message in messages {
            // a failure mid-drain tears the call down; the rest is moot
            if !self.session.is_current(call_id) {
                return;
            }
            self.dispatch_message(message).await;
        }
    }

    async fn dispatch_message(&mut self, message: SignalingMessage) {
        match message {
            SignalingMessage::Offer(description) | SignalingMessage::Answer(description) => {
                self.apply_remote_description(description).await;
            }
            SignalingMessage::CandidateAdd(candidate) => {
                let result = match self.session.peer.as_ref() {
                    Some(peer) => peer.add_ice_candidate(candidate).await,
                    None => return,
                };
                if let Err(error) = result {
                    warn!(%error, "failed to add remote candidate");
                }
            }
            SignalingMessage::CandidateRemove(candidates) => {
                let result = match self.session.peer.as_ref() {
                    Some(peer) => peer.remove_ice_candidates(candidates).await,
                    None => return,
                };
                if let Err(error) = result {
                    warn!(%error, "failed to remove remote candidates");
                }
            }
            SignalingMessage::Bye => {
                self.teardown().await;
            }
        }
    }

    /// Send a signaling message to the peer over the role's transport:
    /// initiators post through the room server, responders use the channel.
    async fn send_signaling_message(&mut self, message: SignalingMessage) {
        match self.session.role {
            Some(CallRole::Initiator) => {
                let call_id = self.session.call_id;
                let kind = message.kind();
                let room = self.room_client.clone();
                let room_id = self.session.room_id.clone();
                let client_id = self.session.client_id.clone();
                let tx = self.self_tx.clone();
                tokio::spawn(async move {
                    let result = room.send(&message, &room_id, &client_id).await;
                    let _ = tx.send(EngineEvent::SendCompleted {
                        call_id,
                        kind,
                        result,
                    });
                });
            }
            Some(CallRole::Responder) => {
                let result = match self.session.channel.as_ref() {
                    Some(channel) => channel.send(&message).await,
                    None => Err(SignalingError::channel_not_ready(
                        ChannelState::Closed.to_string(),
                    )),
                };
                if let Err(error) = result {
                    self.fail(error.into()).await;
                }
            }
            None => {
                warn!(
                    kind = message.kind(),
                    "dropping outgoing message before the room join finished"
                );
            }
        }
    }

    async fn on_send_completed(
        &mut self,
        call_id: CallId,
        kind: &'static str,
        result: SignalingResult<MessageResponse>,
    ) {
        if !self.session.is_current(call_id) {
            debug!(%call_id, kind, "dropping stale send result");
            return;
        }

        match result {
            Ok(response) => {
                if let Some(error) = ClientError::from_message_result(response.result) {
                    warn!(kind, "room server rejected outgoing message");
                    self.fail(error).await;
                }
            }
            Err(error) => {
                warn!(kind, %error, "failed to post message to room server");
                self.fail(error.into()).await;
            }
        }
    }

    async fn on_channel_event(&mut self, call_id: CallId, event: ChannelEvent) {
        if !self.session.is_current(call_id) {
            debug!(%call_id, "dropping stale channel event");
            return;
        }

        match event {
            ChannelEvent::StateChanged(state) => {
                debug!(%state, "signaling channel state changed");
                match state {
                    ChannelState::Error => {
                        self.fail(ClientError::transport("signaling channel failed"))
                            .await;
                    }
                    // the channel closing under an active call ends it
                    ChannelState::Closed => self.teardown().await,
                    ChannelState::Open | ChannelState::Registered => {}
                }
            }
            ChannelEvent::MessageReceived(message) => {
                self.receive_signaling_message(message).await;
            }
        }
    }

    async fn receive_signaling_message(&mut self, message: SignalingMessage) {
        // bye never waits in the queue: the peer is gone
        if matches!(message, SignalingMessage::Bye) {
            info!("peer ended the call");
            self.teardown().await;
            return;
        }
        self.session.queue.push(message);
        self.drain_queue_if_ready().await;
    }

    async fn on_peer_event(&mut self, call_id: CallId, event: PeerEvent) {
        if !self.session.is_current(call_id) {
            debug!(%call_id, "dropping stale peer event");
            return;
        }

        match event {
            PeerEvent::IceCandidate(candidate) => {
                self.send_signaling_message(SignalingMessage::CandidateAdd(candidate))
                    .await;
            }
            PeerEvent::IceCandidatesRemoved(candidates) => {
                self.send_signaling_message(SignalingMessage::CandidateRemove(candidates))
                    .await;
            }
            PeerEvent::IceConnectionStateChanged(state) => {
                info!(%state, "ice connection state changed");
                let info = IceConnectionInfo {
                    call_id,
                    state,
                    timestamp: Utc::now(),
                };
                self.handler
                    .on_ice_connection_state_changed(info.clone())
                    .await;
                self.emitter
                    .emit(CallEvent::IceConnectionStateChanged(info));
            }
            PeerEvent::IceGatheringStateChanged(state) => {
                debug!(%state, "ice gathering state changed");
            }
            PeerEvent::SignalingStateChanged(state) => {
                debug!(%state, "peer signaling state changed");
            }
            PeerEvent::LocalTrack(track) => {
                let info = TrackInfo {
                    call_id,
                    track,
                    timestamp: Utc::now(),
                };
                self.handler.on_local_track(info.clone()).await;
                self.emitter.emit(CallEvent::LocalTrackAdded(info));
            }
            PeerEvent::RemoteTrack(track) => {
                let info = TrackInfo {
                    call_id,
                    track,
                    timestamp: Utc::now(),
                };
                self.handler.on_remote_track(info.clone()).await;
                self.emitter.emit(CallEvent::RemoteTrackAdded(info));
            }
            PeerEvent::RenegotiationNeeded => {
                warn!("peer requested renegotiation, which is not supported");
            }
        }
    }

    fn start_stats_task(&mut self) {
        let interval = match self.config.stats_interval {
            Some(interval) => interval,
            None => return,
        };

        let call_id = self.session.call_id;
        let tx = self.self_tx.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(EngineEvent::StatsTick { call_id }).is_err() {
                    break;
                }
            }
        });
        self.stats_task = Some(task);
    }

    async fn on_stats_tick(&mut self, call_id: CallId) {
        if !self.session.is_current(call_id) {
            return;
        }

        let report = match self.session.peer.as_ref() {
            Some(peer) => peer.get_stats().await,
            None => return,
        };
        match report {
            Ok(report) => {
                let info = StatsInfo {
                    call_id,
                    report,
                    timestamp: Utc::now(),
                };
                self.handler.on_stats(info.clone()).await;
                self.emitter.emit(CallEvent::StatsCollected(info));
            }
            Err(error) => debug!(%error, "stats collection failed"),
        }
    }

    /// Dismantle the session: leave the room, send bye over a registered
    /// channel, close the peer connection, then report Disconnected.
    /// Safe to call repeatedly; extra calls do nothing.
    async fn teardown(&mut self) {
        if self.session.state == CallState::Disconnected {
            return;
        }
        info!(call_id = %self.session.call_id, "tearing down call");

        // nothing depends on the leave outcome, so it runs detached
        if self.session.has_joined_room() {
            let room = self.room_client.clone();
            let room_id = self.session.room_id.clone();
            let client_id = self.session.client_id.clone();
            tokio::spawn(async move {
                if let Err(error) = room.leave(&room_id, &client_id).await {
                    warn!(%error, "room leave failed");
                }
            });
        }

        if let Some(channel) = self.session.channel.take() {
            if channel.state() == ChannelState::Registered {
                if let Err(error) = channel.send(&SignalingMessage::Bye).await {
                    warn!(%error, "failed to send bye");
                }
            }
        }
        self.session.loopback_channel = None;

        if let Some(task) = self.stats_task.take() {
            task.abort();
        }

        if let Some(peer) = self.session.peer.take() {
            peer.close().await;
        }

        self.session.reset();
        self.set_state(CallState::Disconnected).await;
    }

    /// Fatal error path: clean up first, then report. Observers always
    /// see the Disconnected transition before the error.
    async fn fail(&mut self, error: ClientError) {
        error!(%error, "call failed");
        let call_id = self.session.call_id;
        self.teardown().await;

        let info = ErrorInfo {
            call_id,
            error,
            timestamp: Utc::now(),
        };
        self.handler.on_error(info.clone()).await;
        self.emitter.emit(CallEvent::ErrorOccurred(info));
    }

    async fn set_state(&mut self, new_state: CallState) {
        if self.session.state == new_state {
            return;
        }
        let previous_state = self.session.state;
        self.session.state = new_state;
        debug!(%previous_state, %new_state, "call state changed");
        let _ = self.state_tx.send(new_state);

        let info = StateChangeInfo {
            call_id: self.session.call_id,
            previous_state,
            new_state,
            timestamp: Utc::now(),
        };
        self.handler.on_state_changed(info.clone()).await;
        self.emitter.emit(CallEvent::StateChanged(info));
    }
}
