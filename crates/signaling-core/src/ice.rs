//! ICE candidate and server descriptors shared across the signaling layer

use serde::{Deserialize, Serialize};

/// A single discovered network path offered for peer connectivity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Identification tag of the media description this candidate belongs to
    pub sdp_mid: String,
    /// Index of the media description this candidate belongs to
    pub sdp_mline_index: u32,
    /// The candidate-attribute line
    pub sdp: String,
}

impl IceCandidate {
    /// Create a candidate from its three wire fields
    pub fn new(sdp_mid: impl Into<String>, sdp_mline_index: u32, sdp: impl Into<String>) -> Self {
        Self {
            sdp_mid: sdp_mid.into(),
            sdp_mline_index,
            sdp: sdp.into(),
        }
    }
}

/// One ICE server entry handed to the peer connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    /// Server URLs (`stun:` or `turn:` scheme)
    pub urls: Vec<String>,
    /// Credential user name; empty for credential-free servers
    #[serde(default)]
    pub username: String,
    /// Credential secret; empty for credential-free servers
    #[serde(default)]
    pub credential: String,
}

impl IceServer {
    /// A credential-free server entry, typically STUN
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: String::new(),
            credential: String::new(),
        }
    }

    /// A server entry carrying TURN credentials
    pub fn with_credentials(
        urls: Vec<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            urls,
            username: username.into(),
            credential: credential.into(),
        }
    }
}
