//! Reactive sync core for the Hearth household app.
//! Session state, per-domain synchronized stores and route decisions live
//! here; UI shells only render state and forward intents.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod logging;
pub mod memory;
pub mod model;
pub mod preferences;
pub mod remote;
pub mod route;
pub mod session;
pub mod store;

pub use config::{CoreConfig, HomeSurface, LogLevel};
pub use context::{AppContext, Collaborators};
pub use coordinator::FamilyDataCoordinator;
pub use error::{CoreError, CoreResult};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status};
pub use model::domains::{
    BudgetCategory, BudgetPeriod, CalendarEvent, MealPlan, MealSlot, Note, ShoppingItem, Task,
    TaskStatus, Transaction,
};
pub use model::identity::{Family, Identity, Profile, Role};
pub use model::record::{CollectionScope, DomainRecord, RecordMeta, RecordPatch};
pub use preferences::{
    PreferenceError, PreferenceResult, PreferenceStore, Preferences, SqlitePreferenceStore, Theme,
};
pub use remote::{RemoteError, RemoteResult, Subscription};
pub use route::{decide, settle, GuardInput, Navigator, RouteGroup, RouteGuard, RouteTarget};
pub use session::{SessionController, SessionPhase, SessionState};
pub use store::{DomainStores, StoreState, SynchronizedStore};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
