mod web_push_sender;

pub use web_push_sender::WebPushSender;

use async_trait::async_trait;

use crate::models::Subscription;

/// TTL (seconds) applied when the user wants a queued notification to still
/// surface once their browser next opens: two days.
pub const ONLOAD_TTL_SECS: u32 = 172_800;

#[derive(Debug, thiserror::Error)]
#[error("push delivery failed (status {status_code:?}): {message}")]
pub struct PushError {
    pub status_code: Option<u16>,
    pub message: String,
}

impl PushError {
    /// The provider reported the endpoint as permanently gone (HTTP 410); the
    /// stored subscription should be deleted.
    pub fn is_gone(&self) -> bool {
        self.status_code == Some(410)
    }
}

/// Injected Web Push provider seam. Delivery is best-effort; callers decide
/// what a failure means.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        subscription: &Subscription,
        payload: &[u8],
        ttl_secs: u32,
    ) -> Result<(), PushError>;
}
