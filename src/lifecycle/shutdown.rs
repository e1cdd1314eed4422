//! Shutdown coordination.

use tokio_util::sync::CancellationToken;

/// Coordinator handing out cancellation tokens to executions.
///
/// Triggering it cancels every token handed out, which aborts in-flight
/// attempts and pending retry waits.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token to pass to `send` / `send_with_retry`.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until shutdown is triggered.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}
