//! Room server contract: join, send, leave, and their result codes
//!
//! The room server pairs the two parties of a call, assigns roles, and
//! relays messages posted before the responder's channel is live. Its wire
//! transport is an implementation concern; the orchestrator depends only on
//! the [`RoomServerClient`] trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SignalingResult;
use crate::message::SignalingMessage;

/// How the room server classified a join attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinResultCode {
    /// The client is in the room
    Success,
    /// The room already has two parties
    Full,
    /// Anything the protocol does not recognize
    Unknown,
}

impl JoinResultCode {
    /// Map the room protocol's result string to a code.
    ///
    /// Unrecognized strings classify as [`JoinResultCode::Unknown`].
    pub fn from_wire(value: &str) -> Self {
        match value {
            "SUCCESS" => Self::Success,
            "FULL" => Self::Full,
            _ => Self::Unknown,
        }
    }
}

/// How the room server classified a posted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageResultCode {
    /// The message was accepted
    Success,
    /// The sender is not a registered client of the room
    InvalidClient,
    /// The room does not exist
    InvalidRoom,
    /// Anything the protocol does not recognize
    Unknown,
}

impl MessageResultCode {
    /// Map the room protocol's result string to a code
    pub fn from_wire(value: &str) -> Self {
        match value {
            "SUCCESS" => Self::Success,
            "INVALID_CLIENT" => Self::InvalidClient,
            "INVALID_ROOM" => Self::InvalidRoom,
            _ => Self::Unknown,
        }
    }
}

/// Everything a join attempt tells the client
///
/// On non-success results only `result` is meaningful; the remaining fields
/// stay at their defaults.
#[derive(Debug, Clone)]
pub struct JoinResponse {
    /// Outcome of the join
    pub result: JoinResultCode,
    /// True when this client must open the negotiation
    pub is_initiator: bool,
    /// The room joined
    pub room_id: String,
    /// Identifier the room assigned to this client; non-empty iff joined
    pub client_id: String,
    /// Messages the other party posted before we arrived, oldest first
    pub messages: Vec<SignalingMessage>,
    /// Websocket endpoint for the live signaling channel
    pub signaling_url: Option<Url>,
    /// REST endpoint backing the signaling channel
    pub signaling_rest_url: Option<Url>,
}

impl JoinResponse {
    /// A response carrying only a non-success result
    pub fn failure(result: JoinResultCode) -> Self {
        Self {
            result,
            is_initiator: false,
            room_id: String::new(),
            client_id: String::new(),
            messages: Vec::new(),
            signaling_url: None,
            signaling_rest_url: None,
        }
    }
}

/// Outcome of posting a message through the room server
#[derive(Debug, Clone)]
pub struct MessageResponse {
    /// How the room server classified the message
    pub result: MessageResultCode,
}

/// Transport-agnostic room server operations
#[async_trait]
pub trait RoomServerClient: Send + Sync {
    /// Join `room_id`, returning the room's view of the call.
    ///
    /// A transport failure is an `Err`; a room-level rejection is an `Ok`
    /// response whose result code is not `Success`.
    async fn join(&self, room_id: &str, loopback: bool) -> SignalingResult<JoinResponse>;

    /// Post a message to the other party through the room
    async fn send(
        &self,
        message: &SignalingMessage,
        room_id: &str,
        client_id: &str,
    ) -> SignalingResult<MessageResponse>;

    /// Tell the room this client is leaving
    async fn leave(&self, room_id: &str, client_id: &str) -> SignalingResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_result_codes_parse_from_wire_strings() {
        assert_eq!(JoinResultCode::from_wire("SUCCESS"), JoinResultCode::Success);
        assert_eq!(JoinResultCode::from_wire("FULL"), JoinResultCode::Full);
        assert_eq!(JoinResultCode::from_wire("ERROR"), JoinResultCode::Unknown);
        assert_eq!(JoinResultCode::from_wire(""), JoinResultCode::Unknown);
    }

    #[test]
    fn message_result_codes_parse_from_wire_strings() {
        assert_eq!(
            MessageResultCode::from_wire("SUCCESS"),
            MessageResultCode::Success
        );
        assert_eq!(
            MessageResultCode::from_wire("INVALID_CLIENT"),
            MessageResultCode::InvalidClient
        );
        assert_eq!(
            MessageResultCode::from_wire("INVALID_ROOM"),
            MessageResultCode::InvalidRoom
        );
        assert_eq!(
            MessageResultCode::from_wire("TEAPOT"),
            MessageResultCode::Unknown
        );
    }

    #[test]
    fn failure_response_has_empty_identity() {
        let response = JoinResponse::failure(JoinResultCode::Full);

        assert_eq!(response.result, JoinResultCode::Full);
        assert!(response.client_id.is_empty());
        assert!(response.messages.is_empty());
    }
}
