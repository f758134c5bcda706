//! Error types for the signaling protocol layer

use thiserror::Error;

/// Result type for signaling operations
pub type SignalingResult<T> = Result<T, SignalingError>;

/// Errors produced by the signaling protocol layer and its collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// A signaling message could not be decoded from its wire form
    #[error("Malformed signaling message: {reason}")]
    MalformedMessage {
        /// What went wrong during decoding
        reason: String,
    },

    /// A signaling message carried an unrecognized type tag
    #[error("Unsupported signaling message type: {kind}")]
    UnsupportedMessageType {
        /// The unrecognized tag value
        kind: String,
    },

    /// A collaborator-level transport failure (HTTP, websocket, relay)
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure
        message: String,
    },

    /// The signaling channel is not in a state that allows the operation
    #[error("Channel not ready: {state}")]
    ChannelNotReady {
        /// The state the channel was in when the operation was attempted
        state: String,
    },
}

impl SignalingError {
    /// Create a malformed-message error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Create an unsupported-message-type error
    pub fn unsupported_type(kind: impl Into<String>) -> Self {
        Self::UnsupportedMessageType { kind: kind.into() }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a channel-not-ready error
    pub fn channel_not_ready(state: impl Into<String>) -> Self {
        Self::ChannelNotReady {
            state: state.into(),
        }
    }
}

impl From<serde_json::Error> for SignalingError {
    fn from(error: serde_json::Error) -> Self {
        Self::MalformedMessage {
            reason: error.to_string(),
        }
    }
}
