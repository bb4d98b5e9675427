use async_trait::async_trait;
use hearth_core::memory::{MemoryBackend, MemoryDirectory};
use hearth_core::remote::{FamilyDirectory, ProfileDirectory};
use hearth_core::{
    logging_status, AppContext, CoreConfig, Family, LogLevel, Navigator, Note, Profile,
    RecordMeta, RemoteResult, RouteGroup, RouteTarget, SessionPhase, ShoppingItem,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify, Semaphore};

struct RecordingNavigator {
    paths: Mutex<Vec<&'static str>>,
    route: watch::Sender<Option<RouteGroup>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, _target: RouteTarget, path: &'static str) {
        self.paths.lock().unwrap().push(path);
        self.route.send_replace(RouteGroup::of_path(path));
    }
}

/// Memory directory whose `get_family` can be held open while `held` is set.
struct HeldFamilies {
    inner: Arc<MemoryDirectory>,
    held: AtomicBool,
    release: Semaphore,
    entered: Notify,
}

impl HeldFamilies {
    fn new(inner: Arc<MemoryDirectory>) -> Self {
        Self {
            inner,
            held: AtomicBool::new(false),
            release: Semaphore::new(0),
            entered: Notify::new(),
        }
    }
}

#[async_trait]
impl ProfileDirectory for HeldFamilies {
    async fn get_profile(&self, user_id: &str) -> RemoteResult<Option<Profile>> {
        self.inner.get_profile(user_id).await
    }
}

#[async_trait]
impl FamilyDirectory for HeldFamilies {
    async fn create_family(&self, name: &str, owner_id: &str) -> RemoteResult<Family> {
        self.inner.create_family(name, owner_id).await
    }

    async fn join_family_by_invite_code(
        &self,
        code: &str,
        user_id: &str,
    ) -> RemoteResult<Option<Family>> {
        self.inner.join_family_by_invite_code(code, user_id).await
    }

    async fn get_family(&self, id: &str) -> RemoteResult<Family> {
        if self.held.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.acquire().await.unwrap().forget();
        }
        self.inner.get_family(id).await
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(500)).await;
}

#[tokio::test(start_paused = true)]
async fn household_session_end_to_end() {
    let backend = MemoryBackend::new();
    let context = AppContext::new(backend.collaborators(), CoreConfig::default());
    let (route, route_rx) = watch::channel(RouteGroup::of_path("/home"));
    let navigator = Arc::new(RecordingNavigator {
        paths: Mutex::new(Vec::new()),
        route,
    });

    context.start(navigator.clone(), route_rx).await;
    settle().await;
    assert_eq!(*navigator.paths.lock().unwrap(), vec!["/auth/login"]);

    let session = context.session();
    session
        .sign_up("ada@example.com", "correct-horse", "Ada")
        .await
        .unwrap();
    settle().await;
    assert!(matches!(session.state().phase, SessionPhase::NoFamily { .. }));
    assert_eq!(*navigator.paths.lock().unwrap(), vec!["/auth/login"]);

    let family = session.create_family("Lovelace").await.unwrap();
    settle().await;
    assert_eq!(
        *navigator.paths.lock().unwrap(),
        vec!["/auth/login", "/home"]
    );
    assert_eq!(family.invite_code.len(), 6);

    let user_id = session.state().identity().unwrap().id.clone();
    context
        .stores()
        .shopping
        .create(ShoppingItem {
            meta: RecordMeta::new(family.id.clone(), user_id),
            name: "Oat milk".to_string(),
            quantity: 2,
            checked: false,
        })
        .await
        .unwrap();
    assert_eq!(context.stores().shopping.records().len(), 1);
    assert_eq!(backend.shopping.listener_count(), 1);

    session.sign_out().await.unwrap();
    settle().await;
    assert_eq!(
        *navigator.paths.lock().unwrap(),
        vec!["/auth/login", "/home", "/auth/login"]
    );
    assert!(context.stores().shopping.records().is_empty());
    assert_eq!(backend.shopping.listener_count(), 0);

    context.shutdown();
    assert_eq!(backend.notes.listener_count(), 0);
}

#[tokio::test]
async fn start_twice_spawns_tasks_once() {
    let backend = MemoryBackend::new();
    let context = AppContext::new(backend.collaborators(), CoreConfig::default());
    let (route, route_rx) = watch::channel(RouteGroup::of_path("/auth/login"));
    let navigator = Arc::new(RecordingNavigator {
        paths: Mutex::new(Vec::new()),
        route,
    });

    context.start(navigator.clone(), route_rx.clone()).await;
    context.start(navigator, route_rx).await;
    context.shutdown();

    assert_eq!(context.session().state().phase.name(), "signed_out");
}

#[tokio::test(start_paused = true)]
async fn profile_refresh_keeps_family_data_live() {
    let backend = MemoryBackend::new();
    let families = Arc::new(HeldFamilies::new(backend.directory.clone()));
    let mut collaborators = backend.collaborators();
    collaborators.profiles = families.clone();
    collaborators.families = families.clone();
    let context = AppContext::new(collaborators, CoreConfig::default());
    let (route, route_rx) = watch::channel(RouteGroup::of_path("/auth/login"));
    let navigator = Arc::new(RecordingNavigator {
        paths: Mutex::new(Vec::new()),
        route,
    });
    context.start(navigator.clone(), route_rx).await;

    let session = context.session().clone();
    session
        .sign_up("ada@example.com", "correct-horse", "Ada")
        .await
        .unwrap();
    settle().await;
    let family = session.create_family("Lovelace").await.unwrap();
    settle().await;

    let user_id = session.state().identity().unwrap().id.clone();
    let notes = &context.stores().notes;
    notes
        .create(Note {
            meta: RecordMeta::new(family.id.clone(), user_id),
            title: "Wi-Fi".to_string(),
            body: "Router is in the hall closet".to_string(),
            pinned: false,
        })
        .await
        .unwrap();
    assert_eq!(notes.records().len(), 1);

    families.held.store(true, Ordering::SeqCst);
    let refresh = tokio::spawn({
        let session = session.clone();
        async move { session.refresh_profile().await }
    });
    families.entered.notified().await;
    settle().await;

    let during = session.state();
    assert!(during.loading);
    assert_eq!(during.family_id(), Some(family.id.as_str()));
    assert_eq!(notes.records().len(), 1);
    assert!(notes.is_subscribed());
    assert_eq!(backend.notes.listener_count(), 1);

    families.release.add_permits(1);
    refresh.await.unwrap().unwrap();
    settle().await;

    assert!(!session.state().loading);
    assert_eq!(notes.records().len(), 1);
    assert_eq!(backend.notes.listener_count(), 1);
    assert_eq!(*navigator.paths.lock().unwrap(), vec!["/home"]);

    context.shutdown();
}

#[tokio::test]
async fn start_turns_on_file_logging_from_config() {
    let logs = tempfile::tempdir().unwrap();
    let backend = MemoryBackend::new();
    let config = CoreConfig::default()
        .with_log_dir(logs.path())
        .with_log_level(LogLevel::Info);
    let context = AppContext::new(backend.collaborators(), config);
    let (route, route_rx) = watch::channel(RouteGroup::of_path("/auth/login"));
    let navigator = Arc::new(RecordingNavigator {
        paths: Mutex::new(Vec::new()),
        route,
    });

    context.start(navigator, route_rx).await;

    let (level, dir) = logging_status().expect("logger should be running");
    assert_eq!(level, "info");
    assert_eq!(dir, logs.path());
    context.shutdown();
}
