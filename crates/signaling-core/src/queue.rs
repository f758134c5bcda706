//! Pending-message buffer with the description-first ordering rule
//!
//! Messages can arrive before the peer connection exists and out of order
//! relative to the offer/answer exchange. The queue buffers them so the
//! remote description is always applied before any candidate referencing
//! it: offers and answers are inserted at the front, everything else is
//! appended in arrival order.

use std::collections::VecDeque;

use crate::message::SignalingMessage;

/// Ordered buffer of signaling messages awaiting a ready peer connection
///
/// Bye is a termination signal handled on receipt; it never belongs in the
/// buffer.
#[derive(Debug, Default)]
pub struct MessageQueue {
    pending: VecDeque<SignalingMessage>,
    has_session_description: bool,
}

impl MessageQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a message under the ordering rule.
    ///
    /// Offers and answers jump to the front and latch the
    /// session-description flag; candidate messages are appended.
    pub fn push(&mut self, message: SignalingMessage) {
        debug_assert!(
            !matches!(message, SignalingMessage::Bye),
            "bye is handled on receipt, never buffered"
        );
        if message.is_session_description() {
            self.has_session_description = true;
            self.pending.push_front(message);
        } else {
            self.pending.push_back(message);
        }
    }

    /// True once an offer or answer has been observed.
    ///
    /// The latch survives drains; it only resets with [`clear`].
    ///
    /// [`clear`]: MessageQueue::clear
    pub fn has_session_description(&self) -> bool {
        self.has_session_description
    }

    /// Remove and return every buffered message in queue order
    pub fn take_all(&mut self) -> Vec<SignalingMessage> {
        self.pending.drain(..).collect()
    }

    /// Drop all buffered messages and reset the session-description latch
    pub fn clear(&mut self) {
        self.pending.clear();
        self.has_session_description = false;
    }

    /// Number of buffered messages
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The message at `index`, front first
    pub fn get(&self, index: usize) -> Option<&SignalingMessage> {
        self.pending.get(index)
    }
}
