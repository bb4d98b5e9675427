//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `hearth_core` linkage.
//! - Run one scripted household session against the in-memory backend:
//!   redirect to login, sign up, create a family, write records.
//! - Log to files under `HEARTH_LOG_DIR` when it is set.

use hearth_core::memory::MemoryBackend;
use hearth_core::{
    AppContext, CoreConfig, CoreError, LogLevel, Navigator, Note, RecordMeta, RouteGroup,
    RouteTarget, ShoppingItem,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Prints each redirect and moves the simulated screen into its group.
struct PrintingNavigator {
    route: watch::Sender<Option<RouteGroup>>,
}

impl Navigator for PrintingNavigator {
    fn navigate(&self, _target: RouteTarget, path: &'static str) {
        println!("navigate path={path}");
        self.route.send_replace(RouteGroup::of_path(path));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CoreError> {
    println!("hearth_core ping={}", hearth_core::ping());
    println!("hearth_core version={}", hearth_core::core_version());

    let backend = MemoryBackend::new();
    let config = config_from_env()?;
    let settle = config.settle_interval + Duration::from_millis(50);
    let context = AppContext::new(backend.collaborators(), config);

    let (route_tx, route_rx) = watch::channel(RouteGroup::of_path("/home"));
    let navigator = Arc::new(PrintingNavigator { route: route_tx });
    context.start(navigator, route_rx).await;
    tokio::time::sleep(settle).await;

    let session = context.session();
    session
        .sign_up("ada@example.com", "correct-horse", "Ada")
        .await?;
    tokio::time::sleep(settle).await;

    let family = session.create_family("Lovelace").await?;
    println!(
        "family created id={} invite_code={}",
        family.id, family.invite_code
    );
    tokio::time::sleep(settle).await;

    let user_id = session
        .state()
        .identity()
        .map(|identity| identity.id.clone())
        .ok_or(CoreError::Unauthenticated)?;

    let stores = context.stores();
    stores
        .shopping
        .create(ShoppingItem {
            meta: RecordMeta::new(family.id.clone(), user_id.clone()),
            name: "Oat milk".to_string(),
            quantity: 2,
            checked: false,
        })
        .await?;
    stores
        .notes
        .create(Note {
            meta: RecordMeta::new(family.id.clone(), user_id),
            title: "Wi-Fi".to_string(),
            body: "Router is in the hall closet".to_string(),
            pinned: false,
        })
        .await?;

    let mut shopping = stores.shopping.watch();
    let item_id = tokio::time::timeout(
        settle,
        shopping.wait_for(|state| state.records.iter().any(|item| item.name == "Oat milk")),
    )
    .await
    .ok()
    .and_then(Result::ok)
    .and_then(|state| {
        state
            .records
            .iter()
            .find(|item| item.name == "Oat milk")
            .map(|item| item.meta.id.clone())
    })
    .ok_or_else(|| CoreError::invalid_argument("shopping item never reached the snapshot"))?;
    stores.shopping.toggle_checked(&item_id).await?;
    let checked_seen = tokio::time::timeout(
        settle,
        shopping.wait_for(|state| state.records.iter().any(|item| item.checked)),
    )
    .await
    .is_ok();

    println!(
        "records shopping={} notes={} checked={}",
        stores.shopping.records().len(),
        stores.notes.records().len(),
        checked_seen
    );

    session.sign_out().await?;
    tokio::time::sleep(settle).await;
    println!(
        "after sign-out phase={} shopping={}",
        session.state().phase.name(),
        stores.shopping.records().len()
    );

    context.shutdown();
    Ok(())
}

/// `HEARTH_LOG_DIR` turns on file logging; `HEARTH_LOG_LEVEL` overrides the
/// build default.
fn config_from_env() -> Result<CoreConfig, CoreError> {
    let mut config = CoreConfig::default();
    if let Ok(level) = std::env::var("HEARTH_LOG_LEVEL") {
        let level = LogLevel::parse(&level).map_err(CoreError::invalid_argument)?;
        config = config.with_log_level(level);
    }
    if let Ok(dir) = std::env::var("HEARTH_LOG_DIR") {
        config = config.with_log_dir(dir);
    }
    Ok(config)
}
