//! Route groups and redirect destinations.

pub mod guard;

pub use guard::{decide, settle, GuardInput, Navigator, RouteGuard};

use crate::config::HomeSurface;

pub const LOGIN_PATH: &str = "/auth/login";
pub const FAMILY_SETUP_PATH: &str = "/auth/family-setup";
const AUTH_PREFIX: &str = "/auth";

/// Which part of the navigation tree the visible screen belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGroup {
    /// Login, sign-up and family setup screens.
    Auth,
    App,
}

impl RouteGroup {
    /// Classifies a path; `None` while the router has not resolved one yet.
    pub fn of_path(path: &str) -> Option<Self> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        let in_auth = path == AUTH_PREFIX
            || path
                .strip_prefix(AUTH_PREFIX)
                .is_some_and(|rest| rest.starts_with('/'));
        Some(if in_auth { Self::Auth } else { Self::App })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Login,
    FamilySetup,
    Home,
}

impl RouteTarget {
    pub fn path(self, surface: HomeSurface) -> &'static str {
        match self {
            Self::Login => LOGIN_PATH,
            Self::FamilySetup => FAMILY_SETUP_PATH,
            Self::Home => surface.home_path(),
        }
    }
}
