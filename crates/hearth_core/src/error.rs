//! Core error taxonomy shared by session, stores and coordinator.
//!
//! # Responsibility
//! - Give every caller-facing failure one stable semantic variant.
//! - Keep collaborator failure messages intact for UI display.
//!
//! # Invariants
//! - Collaborator failures are never retried or swallowed by core.
//! - `Display` output is human-readable and safe to show to end users.

use crate::remote::RemoteError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Semantic failure returned by every core action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Action requires a signed-in identity and none is present.
    Unauthenticated,
    /// Required mutation input is missing or malformed.
    InvalidArgument(String),
    /// Invite code is malformed or does not resolve to a family.
    InvalidInviteCode,
    /// Profile already belongs to a family; re-assignment is not modeled.
    FamilyAlreadyAssigned,
    /// A listener could not be established for the requested scope.
    Subscription(String),
    /// An external collaborator rejected the call.
    CollaboratorFailure(String),
}

impl CoreError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Stable machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidInviteCode => "invalid_invite_code",
            Self::FamilyAlreadyAssigned => "family_already_assigned",
            Self::Subscription(_) => "subscription_failed",
            Self::CollaboratorFailure(_) => "collaborator_failure",
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "you must be signed in to do that"),
            Self::InvalidArgument(message) => write!(f, "invalid input: {message}"),
            Self::InvalidInviteCode => write!(f, "invite code is not valid"),
            Self::FamilyAlreadyAssigned => write!(f, "you already belong to a family"),
            Self::Subscription(message) => write!(f, "could not listen for updates: {message}"),
            Self::CollaboratorFailure(message) => write!(f, "{message}"),
        }
    }
}

impl Error for CoreError {}

impl From<RemoteError> for CoreError {
    fn from(value: RemoteError) -> Self {
        Self::CollaboratorFailure(value.message)
    }
}
