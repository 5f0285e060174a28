use std::time::Duration;

use async_trait::async_trait;

/// Default wait between image-generation calls, calibrated against the image
/// model's request-rate ceiling.
pub const DEFAULT_PACING: Duration = Duration::from_secs(30);

/// Pacing policy between successive calls to a rate-limited collaborator.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pace(&self);
}

/// Releases one request per fixed interval by sleeping after each call.
pub struct FixedDelayPacer {
    interval: Duration,
}

impl FixedDelayPacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedDelayPacer {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

#[async_trait]
impl Pacer for FixedDelayPacer {
    async fn pace(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// No waiting at all. For tests.
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pace(&self) {}
}
