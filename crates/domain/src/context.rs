//! Per-request cancellation and deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::DomainError;

/// Execution context threaded through every usecase call.
///
/// Collaborator calls are awaited through [`RequestContext::run`], which stops
/// waiting as soon as the request is cancelled or its deadline passes.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Creates a context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Uses an externally owned token, e.g. one cancelled on client disconnect.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Awaits `fut` unless the request is cancelled or times out first.
    ///
    /// Returns the future's output untouched; cancellation is reported as
    /// [`DomainError::Cancelled`] and expiry as [`DomainError::DeadlineExceeded`].
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, DomainError>
    where
        F: Future,
    {
        if self.token.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(DomainError::DeadlineExceeded);
        }

        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(DomainError::Cancelled),
            _ = expiry => Err(DomainError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}
