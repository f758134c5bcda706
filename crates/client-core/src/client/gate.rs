//! Readiness gate for call startup
//!
//! Peer negotiation may not start until both startup legs have finished:
//! relay discovery and the room join. The legs run concurrently and finish
//! in either order, and the gate fires exactly once.

/// Tracks the two startup legs and fires once when both are done.
#[derive(Debug, Default)]
pub(crate) struct JoinGate {
    relay_done: bool,
    room_done: bool,
    fired: bool,
}

impl JoinGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mark relay discovery finished. Returns true exactly when this call
    /// completes the gate.
    pub(crate) fn relay_complete(&mut self) -> bool {
        self.relay_done = true;
        self.try_fire()
    }

    /// Mark the room join finished. Returns true exactly when this call
    /// completes the gate.
    pub(crate) fn room_complete(&mut self) -> bool {
        self.room_done = true;
        self.try_fire()
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.fired
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    fn try_fire(&mut self) -> bool {
        if self.fired || !self.relay_done || !self.room_done {
            return false;
        }
        self.fired = true;
        true
    }
}
