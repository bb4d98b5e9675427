use hearth_core::{
    Family, HomeSurface, Identity, Navigator, Profile, Role, RouteGroup, RouteGuard, RouteTarget,
    SessionPhase, SessionState,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

const QUIET: Duration = Duration::from_millis(250);

/// Records each redirect and moves the simulated screen like a router would.
struct RecordingNavigator {
    paths: Mutex<Vec<&'static str>>,
    route: watch::Sender<Option<RouteGroup>>,
}

impl RecordingNavigator {
    fn paths(&self) -> Vec<&'static str> {
        self.paths.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, _target: RouteTarget, path: &'static str) {
        self.paths.lock().unwrap().push(path);
        self.route.send_replace(RouteGroup::of_path(path));
    }
}

struct Harness {
    navigator: Arc<RecordingNavigator>,
    session: watch::Sender<SessionState>,
}

impl Harness {
    fn start(initial: SessionState, path: &str, surface: HomeSurface) -> Self {
        let (session, session_rx) = watch::channel(initial);
        let (route, route_rx) = watch::channel(RouteGroup::of_path(path));
        let navigator = Arc::new(RecordingNavigator {
            paths: Mutex::new(Vec::new()),
            route,
        });
        RouteGuard::new(navigator.clone(), QUIET, surface).spawn(session_rx, route_rx);
        Self { navigator, session }
    }

    fn publish(&self, phase: SessionPhase, loading: bool) {
        self.session.send_replace(state(phase, loading));
    }
}

fn state(phase: SessionPhase, loading: bool) -> SessionState {
    SessionState {
        phase,
        loading,
        error: None,
    }
}

fn identity() -> Identity {
    Identity::new("u1", "ada@example.com")
}

fn profile() -> Profile {
    Profile {
        id: "u1".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        family_id: Some("f1".to_string()),
        role: Role::Member,
    }
}

fn with_family() -> SessionPhase {
    SessionPhase::WithFamily {
        identity: identity(),
        profile: profile(),
        family: Family {
            id: "f1".to_string(),
            name: "Smiths".to_string(),
            created_at: 1,
            invite_code: "ABC123".to_string(),
        },
    }
}

async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

#[tokio::test(start_paused = true)]
async fn sign_in_burst_navigates_home_once() {
    let harness = Harness::start(SessionState::default(), "/auth/login", HomeSurface::Narrow);

    advance(40).await;
    harness.publish(SessionPhase::Authenticating { identity: Some(identity()) }, true);
    advance(40).await;
    harness.publish(
        SessionPhase::LoadingFamily {
            identity: identity(),
            profile: profile(),
        },
        true,
    );
    advance(40).await;
    harness.publish(with_family(), false);
    advance(1_000).await;

    assert_eq!(harness.navigator.paths(), vec!["/home"]);

    harness.publish(with_family(), false);
    advance(1_000).await;
    assert_eq!(harness.navigator.paths(), vec!["/home"]);
}

#[tokio::test(start_paused = true)]
async fn short_lived_signed_out_state_never_redirects() {
    let harness = Harness::start(
        state(SessionPhase::SignedOut, false),
        "/home",
        HomeSurface::Narrow,
    );

    advance(100).await;
    harness.publish(SessionPhase::Authenticating { identity: Some(identity()) }, true);
    advance(100).await;
    harness.publish(with_family(), false);
    advance(1_000).await;

    assert!(harness.navigator.paths().is_empty());
}

#[tokio::test(start_paused = true)]
async fn waits_for_quiet_period_before_redirecting() {
    let harness = Harness::start(
        state(SessionPhase::SignedOut, false),
        "/tasks",
        HomeSurface::Narrow,
    );

    advance(100).await;
    assert!(harness.navigator.paths().is_empty());

    advance(200).await;
    assert_eq!(harness.navigator.paths(), vec!["/auth/login"]);
}

#[tokio::test(start_paused = true)]
async fn sign_out_after_settling_redirects_to_login() {
    let harness = Harness::start(state(with_family(), false), "/auth/login", HomeSurface::Wide);

    advance(500).await;
    assert_eq!(harness.navigator.paths(), vec!["/web/home"]);

    harness.publish(SessionPhase::SignedOut, false);
    advance(500).await;
    assert_eq!(harness.navigator.paths(), vec!["/web/home", "/auth/login"]);
}

#[tokio::test(start_paused = true)]
async fn family_less_profile_goes_to_setup() {
    let harness = Harness::start(SessionState::default(), "/home", HomeSurface::Narrow);

    harness.publish(
        SessionPhase::NoFamily {
            identity: identity(),
            profile: None,
        },
        false,
    );
    advance(500).await;

    assert_eq!(harness.navigator.paths(), vec!["/auth/family-setup"]);
}

#[tokio::test(start_paused = true)]
async fn failed_profile_fetch_still_settles() {
    let harness = Harness::start(SessionState::default(), "/tasks", HomeSurface::Narrow);

    harness.publish(SessionPhase::Authenticating { identity: Some(identity()) }, true);
    advance(500).await;
    assert!(harness.navigator.paths().is_empty());

    harness.session.send_replace(SessionState {
        phase: SessionPhase::Authenticating {
            identity: Some(identity()),
        },
        loading: false,
        error: Some("profile unavailable".to_string()),
    });
    advance(500).await;

    assert_eq!(harness.navigator.paths(), vec!["/auth/family-setup"]);
}
