//! Cooperative cancellation
//!
//! A cloneable handle the caller keeps while passing a clone into
//! [`RequestOptions`](crate::models::request::RequestOptions). Cancelling any
//! clone aborts the in-flight attempt and any pending backoff wait.

use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation token shared between the caller and the client
#[derive(Debug, Clone)]
pub struct CancellationToken {
    notify: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            notify: Arc::new(tx),
        }
    }

    /// Cancel every operation observing this token
    pub fn cancel(&self) {
        self.notify.send_replace(true);
    }

    /// Check if cancelled
    pub fn is_cancelled(&self) -> bool {
        *self.notify.borrow()
    }

    /// Resolve once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.notify.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail early.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for cancellation on an optional token; pends forever when absent
pub(crate) async fn cancelled_or_pending(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}
