use crate::memory::{generate_id, generate_invite_code, lock, FailurePlan, MemoryOp};
use crate::model::identity::{Family, Profile, Role};
use crate::model::record::now_epoch_ms;
use crate::remote::{FamilyDirectory, ProfileDirectory, RemoteError, RemoteResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, Profile>,
    families: HashMap<String, Family>,
}

/// Profile and family documents held in memory.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: Mutex<Inner>,
    failures: FailurePlan,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, op: MemoryOp, message: impl Into<String>) {
        self.failures.arm(op, message);
    }

    pub fn put_profile(&self, profile: Profile) {
        lock(&self.inner)
            .profiles
            .insert(profile.id.clone(), profile);
    }

    pub fn put_family(&self, family: Family) {
        lock(&self.inner).families.insert(family.id.clone(), family);
    }

    pub fn profile(&self, user_id: &str) -> Option<Profile> {
        lock(&self.inner).profiles.get(user_id).cloned()
    }

    pub fn family_count(&self) -> usize {
        lock(&self.inner).families.len()
    }
}

fn assign(inner: &mut Inner, user_id: &str, family_id: &str, role: Role) -> RemoteResult<()> {
    let profile = inner
        .profiles
        .get_mut(user_id)
        .ok_or_else(|| RemoteError::new("profile not found"))?;
    profile.family_id = Some(family_id.to_string());
    profile.role = role;
    Ok(())
}

#[async_trait]
impl ProfileDirectory for MemoryDirectory {
    async fn get_profile(&self, user_id: &str) -> RemoteResult<Option<Profile>> {
        self.failures.check(MemoryOp::GetProfile)?;
        Ok(self.profile(user_id))
    }
}

#[async_trait]
impl FamilyDirectory for MemoryDirectory {
    async fn create_family(&self, name: &str, owner_id: &str) -> RemoteResult<Family> {
        self.failures.check(MemoryOp::CreateFamily)?;
        let mut inner = lock(&self.inner);
        if !inner.profiles.contains_key(owner_id) {
            return Err(RemoteError::new("profile not found"));
        }

        let invite_code = loop {
            let candidate = generate_invite_code();
            if !inner
                .families
                .values()
                .any(|family| family.invite_code == candidate)
            {
                break candidate;
            }
        };
        let family = Family {
            id: generate_id(),
            name: name.to_string(),
            created_at: now_epoch_ms(),
            invite_code,
        };
        inner.families.insert(family.id.clone(), family.clone());
        assign(&mut inner, owner_id, &family.id, Role::Admin)?;
        Ok(family)
    }

    async fn join_family_by_invite_code(
        &self,
        code: &str,
        user_id: &str,
    ) -> RemoteResult<Option<Family>> {
        self.failures.check(MemoryOp::JoinFamily)?;
        let mut inner = lock(&self.inner);
        let Some(family) = inner
            .families
            .values()
            .find(|family| family.invite_code == code)
            .cloned()
        else {
            return Ok(None);
        };
        assign(&mut inner, user_id, &family.id, Role::Member)?;
        Ok(Some(family))
    }

    async fn get_family(&self, id: &str) -> RemoteResult<Family> {
        self.failures.check(MemoryOp::GetFamily)?;
        lock(&self.inner)
            .families
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::new("family not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryDirectory;
    use crate::model::identity::{Profile, Role};
    use crate::remote::{FamilyDirectory, ProfileDirectory};

    fn profile(id: &str) -> Profile {
        Profile {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
            family_id: None,
            role: Role::Member,
        }
    }

    #[tokio::test]
    async fn create_then_join_assigns_roles() {
        let directory = MemoryDirectory::new();
        directory.put_profile(profile("u1"));
        directory.put_profile(profile("u2"));

        let family = directory
            .create_family("Smiths", "u1")
            .await
            .expect("create should succeed");
        assert_eq!(family.invite_code.len(), 6);

        let joined = directory
            .join_family_by_invite_code(&family.invite_code, "u2")
            .await
            .expect("join should succeed")
            .expect("code should resolve");
        assert_eq!(joined.id, family.id);

        let owner = directory
            .get_profile("u1")
            .await
            .expect("profile read should succeed")
            .expect("owner profile exists");
        let member = directory.profile("u2").expect("member profile exists");
        assert_eq!(owner.role, Role::Admin);
        assert_eq!(member.role, Role::Member);
        assert_eq!(member.family_id.as_deref(), Some(family.id.as_str()));
    }

    #[tokio::test]
    async fn unknown_code_resolves_to_none() {
        let directory = MemoryDirectory::new();
        directory.put_profile(profile("u1"));
        let joined = directory
            .join_family_by_invite_code("BADCODE", "u1")
            .await
            .expect("lookup should succeed");
        assert!(joined.is_none());
        assert_eq!(directory.profile("u1").and_then(|p| p.family_id), None);
    }
}
