//! Redirect decisions driven by the session state.
//!
//! # Responsibility
//! - Decide whether the visible screen must be replaced (`decide`).
//! - Collapse bursts of session changes into one decision (`settle`).
//! - Drive a [`Navigator`] from the session and route channels.
//!
//! # Invariants
//! - Nothing is decided while the session is transient or the current
//!   route group is unknown.
//! - Only the final input of a burst can navigate, and only once it has
//!   been stable for the quiet period.
//! - The same settled input never navigates twice.

use crate::config::HomeSurface;
use crate::route::{RouteGroup, RouteTarget};
use crate::session::SessionState;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Inputs the redirect rules depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardInput {
    /// Session has left every transient loading state.
    pub settled: bool,
    pub is_authenticated: bool,
    pub has_family: bool,
    pub current_group: Option<RouteGroup>,
}

impl GuardInput {
    pub fn from_session(state: &SessionState, current_group: Option<RouteGroup>) -> Self {
        Self {
            settled: !state.is_transient(),
            is_authenticated: state.is_authenticated(),
            has_family: state.has_family(),
            current_group,
        }
    }
}

/// Applies the redirect rules to one input.
pub fn decide(input: &GuardInput) -> Option<RouteTarget> {
    if !input.settled {
        return None;
    }
    let group = input.current_group?;
    let in_auth = group == RouteGroup::Auth;

    match (input.is_authenticated, input.has_family) {
        (false, _) if !in_auth => Some(RouteTarget::Login),
        (true, false) if !in_auth => Some(RouteTarget::FamilySetup),
        (true, true) if in_auth => Some(RouteTarget::Home),
        _ => None,
    }
}

/// Decision for the last of `changes`, once `now` is at least `quiet` past
/// it. Earlier inputs never navigate.
pub fn settle(
    changes: &[(Instant, GuardInput)],
    quiet: Duration,
    now: Instant,
) -> Option<RouteTarget> {
    let (changed_at, input) = changes.last()?;
    if now.saturating_duration_since(*changed_at) < quiet {
        return None;
    }
    decide(input)
}

/// Replaces the visible screen; implemented by the UI shell.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: RouteTarget, path: &'static str);
}

pub struct RouteGuard {
    navigator: Arc<dyn Navigator>,
    quiet: Duration,
    surface: HomeSurface,
}

impl RouteGuard {
    pub fn new(navigator: Arc<dyn Navigator>, quiet: Duration, surface: HomeSurface) -> Self {
        Self {
            navigator,
            quiet,
            surface,
        }
    }

    pub fn spawn(
        self,
        session: watch::Receiver<SessionState>,
        route: watch::Receiver<Option<RouteGroup>>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(session, route))
    }

    /// Evaluates after every quiet period until either sender is dropped.
    pub async fn run(
        self,
        mut session: watch::Receiver<SessionState>,
        mut route: watch::Receiver<Option<RouteGroup>>,
    ) {
        let mut last_settled: Option<GuardInput> = None;
        loop {
            let input =
                GuardInput::from_session(&session.borrow_and_update(), *route.borrow_and_update());

            let interrupted = tokio::select! {
                changed = session.changed() => Some(changed.is_ok()),
                changed = route.changed() => Some(changed.is_ok()),
                _ = tokio::time::sleep(self.quiet) => None,
            };
            match interrupted {
                Some(true) => continue,
                Some(false) => break,
                None => {}
            }

            if last_settled != Some(input) {
                last_settled = Some(input);
                self.apply(&input);
            }

            let open = tokio::select! {
                changed = session.changed() => changed.is_ok(),
                changed = route.changed() => changed.is_ok(),
            };
            if !open {
                break;
            }
        }
        info!("event=route_guard_stop module=route_guard status=ok");
    }

    fn apply(&self, input: &GuardInput) {
        match decide(input) {
            Some(target) => {
                let path = target.path(self.surface);
                info!("event=route_redirect module=route_guard status=ok path={path}");
                self.navigator.navigate(target, path);
            }
            None => debug!(
                "event=route_redirect module=route_guard status=skip settled={} authenticated={} has_family={}",
                input.settled, input.is_authenticated, input.has_family
            ),
        }
    }
}
