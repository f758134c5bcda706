//! Relay (TURN) server discovery contract

use async_trait::async_trait;

use crate::error::SignalingResult;
use crate::ice::IceServer;

/// Fetches relay servers ahead of a call.
///
/// Discovery is best effort by design: the orchestrator treats a failure
/// as "no extra servers" and proceeds with STUN-only connectivity.
#[async_trait]
pub trait TurnClient: Send + Sync {
    /// Request TURN servers for the upcoming call
    async fn request_servers(&self) -> SignalingResult<Vec<IceServer>>;
}
