//! Identity collaborator contract.

use crate::model::identity::Identity;
use crate::remote::{RemoteResult, Subscription};
use async_trait::async_trait;
use std::sync::Arc;

/// Receives the current identity (or `None` once signed out).
pub type IdentityCallback = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// Authentication service.
///
/// Explicit calls only report success or failure; the resulting identity is
/// observed through `on_identity_change`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Attaches a long-lived listener. Fires once with the current identity.
    fn on_identity_change(&self, callback: IdentityCallback) -> Subscription;

    async fn sign_in(&self, email: &str, password: &str) -> RemoteResult<()>;

    /// Creates the account and its profile document.
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> RemoteResult<()>;

    async fn sign_in_with_google(&self, id_token: &str) -> RemoteResult<()>;

    async fn sign_out(&self) -> RemoteResult<()>;
}
