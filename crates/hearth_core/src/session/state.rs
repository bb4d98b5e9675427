//! Session phases and observable session state.
//!
//! # Invariants
//! - Each phase carries exactly the data that is valid in it; a family can
//!   only be present together with an identity and a profile.
//! - `LoadingFamily` is only entered when no family with the profile's
//!   family id is loaded yet. It also persists after a failed family
//!   fetch, with `loading=false` and `error` set, until `load_family_data`
//!   succeeds.
//! - `WithFamily` with `loading=true` means the same family is being
//!   re-fetched and stays visible meanwhile.

use crate::model::identity::{Family, Identity, Profile};

/// Explicit session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    SignedOut,
    /// Waiting for the first identity event, or for the profile of a new
    /// identity.
    Authenticating { identity: Option<Identity> },
    /// Signed in; the profile has no family (or no profile exists yet).
    NoFamily {
        identity: Identity,
        profile: Option<Profile>,
    },
    LoadingFamily { identity: Identity, profile: Profile },
    WithFamily {
        identity: Identity,
        profile: Profile,
        family: Family,
    },
}

impl SessionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedOut => "signed_out",
            Self::Authenticating { .. } => "authenticating",
            Self::NoFamily { .. } => "no_family",
            Self::LoadingFamily { .. } => "loading_family",
            Self::WithFamily { .. } => "with_family",
        }
    }
}

/// Snapshot published to observers on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    /// Initial state before the identity notifier has fired.
    fn default() -> Self {
        Self {
            phase: SessionPhase::Authenticating { identity: None },
            loading: true,
            error: None,
        }
    }
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match &self.phase {
            SessionPhase::SignedOut => None,
            SessionPhase::Authenticating { identity } => identity.as_ref(),
            SessionPhase::NoFamily { identity, .. }
            | SessionPhase::LoadingFamily { identity, .. }
            | SessionPhase::WithFamily { identity, .. } => Some(identity),
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.phase {
            SessionPhase::SignedOut | SessionPhase::Authenticating { .. } => None,
            SessionPhase::NoFamily { profile, .. } => profile.as_ref(),
            SessionPhase::LoadingFamily { profile, .. }
            | SessionPhase::WithFamily { profile, .. } => Some(profile),
        }
    }

    pub fn family(&self) -> Option<&Family> {
        match &self.phase {
            SessionPhase::WithFamily { family, .. } => Some(family),
            _ => None,
        }
    }

    /// Id of the loaded family; drives the family data coordinator.
    pub fn family_id(&self) -> Option<&str> {
        self.family().map(|family| family.id.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Whether the signed-in profile belongs to a family.
    pub fn has_family(&self) -> bool {
        self.profile().is_some_and(Profile::has_family)
    }

    /// Whether the session is still resolving identity, profile or family.
    ///
    /// Once an identity is known only `loading` counts, so a failed profile
    /// fetch settles instead of holding navigation forever.
    pub fn is_transient(&self) -> bool {
        self.loading || matches!(self.phase, SessionPhase::Authenticating { identity: None })
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionPhase, SessionState};
    use crate::model::identity::{Family, Identity, Profile, Role};

    fn profile(family_id: Option<&str>) -> Profile {
        Profile {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            family_id: family_id.map(str::to_string),
            role: Role::Admin,
        }
    }

    #[test]
    fn initial_state_is_transient_and_unauthenticated() {
        let state = SessionState::default();
        assert!(state.is_transient());
        assert!(!state.is_authenticated());
        assert_eq!(state.phase.name(), "authenticating");
    }

    #[test]
    fn with_family_exposes_all_fields() {
        let state = SessionState {
            phase: SessionPhase::WithFamily {
                identity: Identity::new("u1", "ada@example.com"),
                profile: profile(Some("f1")),
                family: Family {
                    id: "f1".to_string(),
                    name: "Smiths".to_string(),
                    created_at: 1,
                    invite_code: "ABC123".to_string(),
                },
            },
            loading: false,
            error: None,
        };
        assert_eq!(state.family_id(), Some("f1"));
        assert!(state.has_family());
        assert!(!state.is_transient());
    }

    #[test]
    fn failed_profile_fetch_settles_once_loading_ends() {
        let state = SessionState {
            phase: SessionPhase::Authenticating {
                identity: Some(Identity::new("u1", "ada@example.com")),
            },
            loading: false,
            error: Some("profile unavailable".to_string()),
        };
        assert!(state.is_authenticated());
        assert!(!state.has_family());
        assert!(!state.is_transient());

        let resolving = SessionState {
            loading: true,
            ..state
        };
        assert!(resolving.is_transient());
    }

    #[test]
    fn loading_family_has_family_but_no_family_id() {
        let state = SessionState {
            phase: SessionPhase::LoadingFamily {
                identity: Identity::new("u1", "ada@example.com"),
                profile: profile(Some("f1")),
            },
            loading: true,
            error: None,
        };
        assert!(state.has_family());
        assert_eq!(state.family_id(), None);
        assert!(state.is_transient());
    }
}
