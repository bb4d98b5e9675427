//! Collaborator contracts for the remote datastore and identity service.
//!
//! # Responsibility
//! - Define the async interfaces core needs from external services.
//! - Define the cancellation handle returned by every listener.
//!
//! # Invariants
//! - A cancelled `Subscription` never delivers another callback.
//! - Snapshot callbacks carry the entire ordered result set, never deltas.
//!
//! # See also
//! - `crate::memory` for the in-process implementation.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod collection;
pub mod directory;
pub mod identity;

pub use collection::{RemoteCollection, SnapshotCallback};
pub use directory::{FamilyDirectory, ProfileDirectory};
pub use identity::{IdentityCallback, IdentityProvider};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Rejection reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for RemoteError {}

/// Cancellation capability for one live listener.
///
/// Dropping the handle cancels the listener.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle with nothing to cancel.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Cancels the listener now.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Subscription;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn cancel_runs_exactly_once_for_explicit_cancel_and_drop() {
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let explicit = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        explicit.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = calls.clone();
        let dropped = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(dropped);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
