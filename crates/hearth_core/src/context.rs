//! Explicitly constructed application context.
//!
//! # Responsibility
//! - Wire the session controller, domain stores, coordinator and route
//!   guard from injected collaborators.
//! - Own the background tasks that keep them in step.
//!
//! # Invariants
//! - No process-wide singletons: every component is reached through one
//!   `AppContext`, so tests can build as many as they need.
//! - `shutdown` leaves every store cleared and no listener open.

use crate::config::CoreConfig;
use crate::coordinator::FamilyDataCoordinator;
use crate::remote::{FamilyDirectory, IdentityProvider, ProfileDirectory};
use crate::route::{Navigator, RouteGroup, RouteGuard};
use crate::session::SessionController;
use crate::store::{DomainCollections, DomainStores};
use crate::logging::init_logging_from;
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Every external service the core depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub families: Arc<dyn FamilyDirectory>,
    pub collections: DomainCollections,
}

pub struct AppContext {
    config: CoreConfig,
    session: Arc<SessionController>,
    stores: DomainStores,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AppContext {
    pub fn new(collaborators: Collaborators, config: CoreConfig) -> Self {
        let session = Arc::new(SessionController::new(
            collaborators.identity,
            collaborators.profiles,
            collaborators.families,
        ));
        Self {
            config,
            session,
            stores: DomainStores::new(collaborators.collections),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    pub fn stores(&self) -> &DomainStores {
        &self.stores
    }

    /// Starts file logging when the config names a directory, spawns the
    /// coordinator and route guard, then attaches the session to the
    /// identity notifier. A second call is a no-op.
    ///
    /// A logging failure is reported and startup continues without it.
    pub async fn start(
        &self,
        navigator: Arc<dyn Navigator>,
        route: watch::Receiver<Option<RouteGroup>>,
    ) {
        {
            let mut tasks = lock(&self.tasks);
            if !tasks.is_empty() {
                return;
            }

            if let Err(message) = init_logging_from(&self.config) {
                warn!("event=logging_start module=core status=error error={message}");
            }

            let coordinator = FamilyDataCoordinator::for_stores(&self.stores);
            tasks.push(coordinator.spawn(
                self.session.watch(),
                self.stores.budget_periods.watch(),
            ));

            let guard = RouteGuard::new(
                navigator,
                self.config.settle_interval,
                self.config.home_surface,
            );
            tasks.push(guard.spawn(self.session.watch(), route));
        }

        self.session.initialize().await;
        info!(
            "event=context_start module=core status=ok settle_ms={}",
            self.config.settle_interval.as_millis()
        );
    }

    /// Stops background tasks, detaches the session and clears all stores.
    pub fn shutdown(&self) {
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        self.session.shutdown();
        self.stores.clear_all();
        info!("event=context_shutdown module=core status=ok");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
