//! Call client configuration

use std::time::Duration;

use rtcall_signaling_core::IceServer;

use crate::peer::{
    MediaConstraints, DTLS_SRTP_KEY_AGREEMENT, LEVEL_CONTROL, OFFER_TO_RECEIVE_AUDIO,
    OFFER_TO_RECEIVE_VIDEO,
};

/// Default STUN server used before relay discovery adds anything
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Default codec moved to the front of video negotiation
pub const DEFAULT_VIDEO_CODEC: &str = "H264";

/// Configuration for the call client
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use rtcall_client_core::CallConfig;
///
/// let config = CallConfig::new()
///     .with_preferred_video_codec("VP8")
///     .with_stats_interval(Duration::from_secs(1));
///
/// assert_eq!(config.preferred_video_codec, "VP8");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConfig {
    /// Codec promoted to the head of the video payload list in every
    /// description this client applies or sends
    pub preferred_video_codec: String,
    /// STUN server seeded into every call before relay discovery runs
    pub default_stun_server: String,
    /// How often to poll the peer connection for statistics. `None`
    /// disables polling.
    pub stats_interval: Option<Duration>,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            preferred_video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            default_stun_server: DEFAULT_STUN_SERVER.to_string(),
            stats_interval: None,
        }
    }
}

impl CallConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the preferred video codec
    pub fn with_preferred_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.preferred_video_codec = codec.into();
        self
    }

    /// Set the STUN server seeded before relay discovery
    pub fn with_default_stun_server(mut self, url: impl Into<String>) -> Self {
        self.default_stun_server = url.into();
        self
    }

    /// Enable periodic statistics polling at the given interval
    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = Some(interval);
        self
    }

    /// The ICE server every call starts with
    pub fn default_ice_server(&self) -> IceServer {
        IceServer::new(self.default_stun_server.clone())
    }

    /// Constraints for creating an offer: receive both audio and video
    pub fn offer_constraints(&self) -> MediaConstraints {
        MediaConstraints::new()
            .with_mandatory(OFFER_TO_RECEIVE_AUDIO, "true")
            .with_mandatory(OFFER_TO_RECEIVE_VIDEO, "true")
    }

    /// Constraints for creating an answer
    pub fn answer_constraints(&self) -> MediaConstraints {
        self.offer_constraints()
    }

    /// Connection-level constraints. Loopback calls disable DTLS-SRTP so
    /// the client can answer its own offer.
    pub fn peer_connection_constraints(&self, loopback: bool) -> MediaConstraints {
        let agreement = if loopback { "false" } else { "true" };
        MediaConstraints::new().with_optional(DTLS_SRTP_KEY_AGREEMENT, agreement)
    }

    /// Constraints for the local audio source
    pub fn audio_constraints(&self, use_level_control: bool) -> MediaConstraints {
        let mut constraints = MediaConstraints::new();
        if use_level_control {
            constraints = constraints.with_optional(LEVEL_CONTROL, "true");
        }
        constraints
    }
}
