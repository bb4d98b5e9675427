//! Authentication and family membership.

pub mod controller;
pub mod invite;
pub mod state;

pub use controller::SessionController;
pub use invite::normalize_invite_code;
pub use state::{SessionPhase, SessionState};
