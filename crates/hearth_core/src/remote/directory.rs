//! Profile and family directory contracts.

use crate::model::identity::{Family, Profile};
use crate::remote::RemoteResult;
use async_trait::async_trait;

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Returns `None` when no profile document exists for `user_id`.
    async fn get_profile(&self, user_id: &str) -> RemoteResult<Option<Profile>>;
}

/// Family membership service.
///
/// `create_family` and `join_family_by_invite_code` also write the caller's
/// profile (`family_id`, `role`) on success.
#[async_trait]
pub trait FamilyDirectory: Send + Sync {
    async fn create_family(&self, name: &str, owner_id: &str) -> RemoteResult<Family>;

    /// Returns `None` when the code resolves to no family.
    async fn join_family_by_invite_code(
        &self,
        code: &str,
        user_id: &str,
    ) -> RemoteResult<Option<Family>>;

    async fn get_family(&self, id: &str) -> RemoteResult<Family>;
}
