//! Signaling message model and its JSON wire form
//!
//! Messages travel as JSON objects tagged by a `type` field: `offer`,
//! `answer`, `candidate`, `remove-candidates`, or `bye`. Candidates flatten
//! to the room protocol's `label`/`id`/`candidate` triple.

use serde::{Deserialize, Serialize};

use crate::error::{SignalingError, SignalingResult};
use crate::ice::IceCandidate;
use crate::sdp::{SdpType, SessionDescription};

/// A message exchanged between the two parties of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingMessage {
    /// The initiator's session description
    Offer(SessionDescription),
    /// The responder's session description
    Answer(SessionDescription),
    /// A newly discovered ICE candidate
    CandidateAdd(IceCandidate),
    /// Previously sent candidates that are no longer usable
    CandidateRemove(Vec<IceCandidate>),
    /// The remote party is hanging up
    Bye,
}

impl SignalingMessage {
    /// Wrap a session description in the matching message variant
    pub fn from_description(description: SessionDescription) -> Self {
        match description.kind {
            SdpType::Offer => Self::Offer(description),
            SdpType::Answer => Self::Answer(description),
        }
    }

    /// The session description carried by an offer or answer
    pub fn description(&self) -> Option<&SessionDescription> {
        match self {
            Self::Offer(description) | Self::Answer(description) => Some(description),
            _ => None,
        }
    }

    /// True for offers and answers
    pub fn is_session_description(&self) -> bool {
        matches!(self, Self::Offer(_) | Self::Answer(_))
    }

    /// Wire tag of this message, also used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::CandidateAdd(_) => "candidate",
            Self::CandidateRemove(_) => "remove-candidates",
            Self::Bye => "bye",
        }
    }

    /// Encode to the room protocol's JSON form
    pub fn to_json(&self) -> SignalingResult<String> {
        let wire = WireMessage::from(self.clone());
        Ok(serde_json::to_string(&wire)?)
    }

    /// Decode from the room protocol's JSON form
    pub fn from_json(raw: &str) -> SignalingResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let tag = value
            .get("type")
            .and_then(|tag| tag.as_str())
            .ok_or_else(|| SignalingError::malformed("missing type tag"))?;
        if !matches!(
            tag,
            "offer" | "answer" | "candidate" | "remove-candidates" | "bye"
        ) {
            return Err(SignalingError::unsupported_type(tag));
        }
        let wire: WireMessage = serde_json::from_value(value)?;
        Ok(wire.into())
    }
}

/// Serde-facing shape of the wire protocol
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireMessage {
    Offer {
        sdp: String,
    },
    Answer {
        sdp: String,
    },
    Candidate {
        label: u32,
        id: String,
        candidate: String,
    },
    #[serde(rename = "remove-candidates")]
    RemoveCandidates { candidates: Vec<WireCandidate> },
    Bye,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCandidate {
    label: u32,
    id: String,
    candidate: String,
}

impl From<IceCandidate> for WireCandidate {
    fn from(candidate: IceCandidate) -> Self {
        Self {
            label: candidate.sdp_mline_index,
            id: candidate.sdp_mid,
            candidate: candidate.sdp,
        }
    }
}

impl From<WireCandidate> for IceCandidate {
    fn from(wire: WireCandidate) -> Self {
        Self {
            sdp_mid: wire.id,
            sdp_mline_index: wire.label,
            sdp: wire.candidate,
        }
    }
}

impl From<SignalingMessage> for WireMessage {
    fn from(message: SignalingMessage) -> Self {
        match message {
            SignalingMessage::Offer(description) => Self::Offer {
                sdp: description.sdp,
            },
            SignalingMessage::Answer(description) => Self::Answer {
                sdp: description.sdp,
            },
            SignalingMessage::CandidateAdd(candidate) => Self::Candidate {
                label: candidate.sdp_mline_index,
                id: candidate.sdp_mid,
                candidate: candidate.sdp,
            },
            SignalingMessage::CandidateRemove(candidates) => Self::RemoveCandidates {
                candidates: candidates.into_iter().map(WireCandidate::from).collect(),
            },
            SignalingMessage::Bye => Self::Bye,
        }
    }
}

impl From<WireMessage> for SignalingMessage {
    fn from(wire: WireMessage) -> Self {
        match wire {
            WireMessage::Offer { sdp } => Self::Offer(SessionDescription::offer(sdp)),
            WireMessage::Answer { sdp } => Self::Answer(SessionDescription::answer(sdp)),
            WireMessage::Candidate {
                label,
                id,
                candidate,
            } => Self::CandidateAdd(IceCandidate::new(id, label, candidate)),
            WireMessage::RemoveCandidates { candidates } => Self::CandidateRemove(
                candidates.into_iter().map(IceCandidate::from).collect(),
            ),
            WireMessage::Bye => Self::Bye,
        }
    }
}
