//! Identity, profile and family models.
//!
//! # Responsibility
//! - Define who is signed in and which household they belong to.
//!
//! # Invariants
//! - `Profile` is one-to-one with `Identity` (same `id`).
//! - `Profile::family_id` is `None` until the user creates or joins a family
//!   and never changes afterwards within a session.
//! - A `Family` is shared by all members; no profile owns it exclusively.

use serde::{Deserialize, Serialize};

/// Opaque principal returned by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// Membership role within one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Created the family; may manage members.
    Admin,
    /// Joined through an invite code.
    #[default]
    Member,
}

/// Per-user profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub family_id: Option<String>,
    pub role: Role,
}

impl Profile {
    /// Returns whether this profile already belongs to a family.
    pub fn has_family(&self) -> bool {
        self.family_id
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }
}

/// Shared household record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: String,
    pub name: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub invite_code: String,
}

#[cfg(test)]
mod tests {
    use super::{Profile, Role};

    fn profile(family_id: Option<&str>) -> Profile {
        Profile {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            family_id: family_id.map(str::to_string),
            role: Role::Member,
        }
    }

    #[test]
    fn blank_family_id_does_not_count_as_membership() {
        assert!(!profile(None).has_family());
        assert!(!profile(Some("  ")).has_family());
        assert!(profile(Some("f1")).has_family());
    }

    #[test]
    fn profile_uses_camel_case_document_fields() {
        let value = serde_json::to_value(profile(Some("f1"))).expect("serialize profile");
        assert_eq!(value["familyId"], "f1");
        assert_eq!(value["role"], "member");
    }
}
