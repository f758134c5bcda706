//! Session description types and the codec-preference rewrite
//!
//! The rewrite is the only SDP surgery this layer performs: move one video
//! codec's payload type to the front of the `m=video` format list so the
//! peer connection picks it first. Everything else in the description is
//! left untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Whether a session description opens or answers a negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// The first description of an exchange, sent by the initiator
    Offer,
    /// The reply description, sent by the responder
    Answer,
}

impl SdpType {
    /// Wire spelling of the type tag
    pub fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session description: its negotiation role plus the SDP body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Offer or answer
    pub kind: SdpType,
    /// The SDP text
    pub sdp: String,
}

impl SessionDescription {
    /// Create a description of the given kind
    pub fn new(kind: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            kind,
            sdp: sdp.into(),
        }
    }

    /// Create an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Offer, sdp)
    }

    /// Create an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Answer, sdp)
    }
}

/// Rewrite `description` so `codec` is the first video format.
///
/// Scans the body for the first `m=video` line and for an
/// `a=rtpmap:<payload> <codec>/<rate>` attribute naming the requested
/// codec, then rebuilds the media line with that payload type moved to the
/// front of the format list. The relative order of the remaining formats
/// is preserved. If the body has no video media line, no matching rtpmap,
/// or a malformed media line, the input is returned unchanged.
///
/// Pure: the input is never mutated, and rewriting an already-preferred
/// description yields the same text.
pub fn prefer_video_codec(description: &SessionDescription, codec: &str) -> SessionDescription {
    let separator = if description.sdp.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    };
    let lines: Vec<&str> = description.sdp.split(separator).collect();

    let media_index = match lines.iter().position(|line| line.starts_with("m=video")) {
        Some(index) => index,
        None => {
            warn!(codec, "no video media line in description, leaving unchanged");
            return description.clone();
        }
    };

    let payload = match lines.iter().find_map(|line| rtpmap_payload(line, codec)) {
        Some(payload) => payload,
        None => {
            warn!(codec, "no rtpmap for codec in description, leaving unchanged");
            return description.clone();
        }
    };

    let media_line = match reorder_media_line(lines[media_index], &payload) {
        Some(line) => line,
        None => return description.clone(),
    };

    let mut out: Vec<&str> = lines;
    out[media_index] = &media_line;
    SessionDescription::new(description.kind, out.join(separator))
}

/// Extract the payload type from an `a=rtpmap` line naming `codec`, if any
fn rtpmap_payload(line: &str, codec: &str) -> Option<String> {
    let rest = line.strip_prefix("a=rtpmap:")?;
    let (payload, encoding) = rest.split_once(' ')?;
    if payload.is_empty() || !payload.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let encoding = encoding.trim_end_matches('\r');
    let (name, clock) = encoding.split_once('/')?;
    if name != codec || clock.is_empty() {
        return None;
    }
    Some(payload.to_string())
}

/// Rebuild a media line with `payload` first in its format list
fn reorder_media_line(line: &str, payload: &str) -> Option<String> {
    let fields: Vec<&str> = line.split(' ').collect();
    // m=<media> <port> <proto> <fmt> ...
    if fields.len() <= 3 {
        warn!(line, "malformed media line, leaving description unchanged");
        return None;
    }
    let mut rebuilt = fields[..3].to_vec();
    rebuilt.push(payload);
    rebuilt.extend(fields[3..].iter().filter(|field| **field != payload));
    Some(rebuilt.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn offer_with_lines(lines: &[&str]) -> SessionDescription {
        SessionDescription::offer(lines.join("\n"))
    }

    #[test]
    fn moves_preferred_codec_to_front_of_format_list() {
        let input = offer_with_lines(&[
            "v=0",
            "m=video 9 UDP/TLS/RTP/SAVPF 100 101 96",
            "a=rtpmap:100 VP8/90000",
            "a=rtpmap:101 VP9/90000",
            "a=rtpmap:96 H264/90000",
        ]);

        let output = prefer_video_codec(&input, "H264");

        let media_line = output.sdp.lines().nth(1).unwrap();
        assert_eq!(media_line, "m=video 9 UDP/TLS/RTP/SAVPF 96 100 101");
    }

    #[test]
    fn rewrite_is_idempotent() {
        let input = offer_with_lines(&[
            "v=0",
            "m=video 9 UDP/TLS/RTP/SAVPF 100 101 96",
            "a=rtpmap:96 H264/90000",
        ]);

        let once = prefer_video_codec(&input, "H264");
        let twice = prefer_video_codec(&once, "H264");

        assert_eq!(once, twice);
    }

    #[test]
    fn leaves_description_without_video_line_unchanged() {
        let input = offer_with_lines(&[
            "v=0",
            "m=audio 9 UDP/TLS/RTP/SAVPF 111",
            "a=rtpmap:111 opus/48000/2",
        ]);

        let output = prefer_video_codec(&input, "H264");

        assert_eq!(output, input);
    }

    #[test]
    fn leaves_description_without_matching_rtpmap_unchanged() {
        let input = offer_with_lines(&[
            "v=0",
            "m=video 9 UDP/TLS/RTP/SAVPF 100 101",
            "a=rtpmap:100 VP8/90000",
            "a=rtpmap:101 VP9/90000",
        ]);

        let output = prefer_video_codec(&input, "H264");

        assert_eq!(output, input);
    }

    #[test]
    fn leaves_malformed_media_line_unchanged() {
        let input = offer_with_lines(&["m=video 9", "a=rtpmap:96 H264/90000"]);

        let output = prefer_video_codec(&input, "H264");

        assert_eq!(output, input);
    }

    #[test]
    fn codec_name_must_match_exactly() {
        let input = offer_with_lines(&[
            "m=video 9 UDP/TLS/RTP/SAVPF 100 97",
            "a=rtpmap:97 H2641/90000",
        ]);

        let output = prefer_video_codec(&input, "H264");

        assert_eq!(output, input);
    }

    #[test]
    fn preserves_crlf_line_separators() {
        let input = SessionDescription::offer(
            "v=0\r\nm=video 9 UDP/TLS/RTP/SAVPF 100 96\r\na=rtpmap:96 H264/90000\r\n",
        );

        let output = prefer_video_codec(&input, "H264");

        assert_eq!(
            output.sdp,
            "v=0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96 100\r\na=rtpmap:96 H264/90000\r\n"
        );
    }

    #[test]
    fn preserves_relative_order_of_remaining_formats() {
        let input = offer_with_lines(&[
            "m=video 9 UDP/TLS/RTP/SAVPF 102 100 96 101",
            "a=rtpmap:96 H264/90000",
        ]);

        let output = prefer_video_codec(&input, "H264");

        let media_line = output.sdp.lines().next().unwrap();
        assert_eq!(media_line, "m=video 9 UDP/TLS/RTP/SAVPF 96 102 100 101");
    }
}
