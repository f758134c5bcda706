//! Error types for the call client
//!
//! One taxonomy covers the whole client: join rejections, negotiation
//! failures, collaborator transport faults, and API misuse. Every fatal
//! error is reported to the observer exactly once, after the session has
//! already been torn down.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rtcall_signaling_core::{JoinResultCode, MessageResultCode, SignalingError};

/// Result type for call client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Why the room server rejected a join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinFailureReason {
    /// The room already has two parties
    RoomFull,
    /// The room server rejected the join for an unrecognized reason
    Unknown,
}

impl fmt::Display for JoinFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinFailureReason::RoomFull => f.write_str("the room is full"),
            JoinFailureReason::Unknown => f.write_str("unknown join error"),
        }
    }
}

/// Errors produced by the call client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The room server rejected the join
    #[error("Failed to join room {room_id}: {reason}")]
    JoinFailed {
        /// Room the client tried to join
        room_id: String,
        /// Why the join was rejected
        reason: JoinFailureReason,
    },

    /// The peer connection could not create an offer or answer
    #[error("Failed to create session description: {reason}")]
    DescriptionCreationFailed {
        /// Failure detail from the negotiation engine
        reason: String,
    },

    /// The peer connection rejected a local or remote description
    #[error("Failed to set session description: {reason}")]
    DescriptionSetFailed {
        /// Failure detail from the negotiation engine
        reason: String,
    },

    /// A collaborator transport failed (room server, channel, relay)
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure
        message: String,
    },

    /// The API was used in a state that does not allow the operation
    #[error("Invalid state: {message}")]
    InvalidState {
        /// What was attempted and why it is not allowed
        message: String,
    },

    /// The client was assembled without a required collaborator
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// The missing or inconsistent piece
        message: String,
    },

    /// A plumbing fault inside the client
    #[error("Internal error: {message}")]
    Internal {
        /// What broke
        message: String,
    },
}

impl ClientError {
    /// Create a join-failed error
    pub fn join_failed(room_id: impl Into<String>, reason: JoinFailureReason) -> Self {
        Self::JoinFailed {
            room_id: room_id.into(),
            reason,
        }
    }

    /// Create a room-full join error
    pub fn room_full(room_id: impl Into<String>) -> Self {
        Self::join_failed(room_id, JoinFailureReason::RoomFull)
    }

    /// Create a description-creation error
    pub fn description_creation(reason: impl Into<String>) -> Self {
        Self::DescriptionCreationFailed {
            reason: reason.into(),
        }
    }

    /// Create a description-set error
    pub fn description_set(reason: impl Into<String>) -> Self {
        Self::DescriptionSetFailed {
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an invalid-state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an invalid-configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify a room-join result code. `Success` carries no error.
    pub fn from_join_result(code: JoinResultCode, room_id: &str) -> Option<Self> {
        match code {
            JoinResultCode::Success => None,
            JoinResultCode::Full => Some(Self::room_full(room_id)),
            JoinResultCode::Unknown => {
                Some(Self::join_failed(room_id, JoinFailureReason::Unknown))
            }
        }
    }

    /// Classify a room-server message result code. `Success` carries no
    /// error; every rejection is a transport fault.
    pub fn from_message_result(code: MessageResultCode) -> Option<Self> {
        match code {
            MessageResultCode::Success => None,
            MessageResultCode::InvalidClient => Some(Self::transport(
                "room server rejected message: sender is not a client of the room",
            )),
            MessageResultCode::InvalidRoom => {
                Some(Self::transport("room server rejected message: no such room"))
            }
            MessageResultCode::Unknown => {
                Some(Self::transport("room server rejected message"))
            }
        }
    }
}

impl From<SignalingError> for ClientError {
    fn from(error: SignalingError) -> Self {
        let message = match error {
            SignalingError::Transport { message } => message,
            other => other.to_string(),
        };
        Self::Transport { message }
    }
}
