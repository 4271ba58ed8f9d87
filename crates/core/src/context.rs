//! Cancellation and deadline propagation for catalog operations.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why an operation stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token plus deadline, checked between the steps of an
/// operation and between chunks of a file write.
#[derive(Debug, Clone)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Instant,
}

impl OpContext {
    pub fn new(token: CancellationToken, timeout: Duration) -> Self {
        Self {
            token,
            deadline: Instant::now() + timeout,
        }
    }

    /// A context that is never cancelled and expires far in the future.
    pub fn unbounded() -> Self {
        Self::new(CancellationToken::new(), Duration::from_secs(60 * 60 * 24))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            Err(Interrupted::Cancelled)
        } else if Instant::now() >= self.deadline {
            Err(Interrupted::DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}
