//! Keeps every domain store scoped to the session's family.
//!
//! # Responsibility
//! - Subscribe all family-scoped stores when the family id appears or
//!   changes, and clear them when it disappears.
//! - Scope period-bound stores to the active budget period.
//!
//! # Invariants
//! - Re-observing the same family id never touches a store.
//! - Each store is subscribed exactly once per family id change.
//! - Period-scoped stores are only subscribed while both a family and an
//!   active period are known.

use crate::model::domains::{active_period_id, BudgetPeriod};
use crate::model::record::CollectionScope;
use crate::session::SessionState;
use crate::store::{DomainStores, ScopedStore, StoreState};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct FamilyDataCoordinator {
    family_stores: Vec<Arc<dyn ScopedStore>>,
    period_stores: Vec<Arc<dyn ScopedStore>>,
    family_id: Option<String>,
    period_id: Option<String>,
}

impl FamilyDataCoordinator {
    pub fn new(
        family_stores: Vec<Arc<dyn ScopedStore>>,
        period_stores: Vec<Arc<dyn ScopedStore>>,
    ) -> Self {
        Self {
            family_stores,
            period_stores,
            family_id: None,
            period_id: None,
        }
    }

    pub fn for_stores(stores: &DomainStores) -> Self {
        Self::new(stores.family_scoped(), stores.period_scoped())
    }

    pub fn family_id(&self) -> Option<&str> {
        self.family_id.as_deref()
    }

    pub fn period_id(&self) -> Option<&str> {
        self.period_id.as_deref()
    }

    /// Reacts to the session's current family id.
    pub fn observe_family(&mut self, family_id: Option<&str>) {
        let family_id = family_id.filter(|id| !id.trim().is_empty());
        if family_id == self.family_id.as_deref() {
            return;
        }

        if self.period_id.take().is_some() {
            clear_all(&self.period_stores);
        }

        match family_id {
            Some(id) => {
                let scope = CollectionScope::family(id);
                let failed = subscribe_all(&self.family_stores, &scope);
                info!(
                    "event=coordinator_family module=coordinator status=ok action=subscribe stores={} failed={}",
                    self.family_stores.len(),
                    failed
                );
                self.family_id = Some(id.to_string());
            }
            None => {
                clear_all(&self.family_stores);
                info!(
                    "event=coordinator_family module=coordinator status=ok action=clear stores={}",
                    self.family_stores.len()
                );
                self.family_id = None;
            }
        }
    }

    /// Reacts to the active budget period of the current family.
    pub fn observe_active_period(&mut self, period_id: Option<&str>) {
        let Some(family_id) = self.family_id.clone() else {
            return;
        };
        let period_id = period_id.filter(|id| !id.trim().is_empty());
        if period_id == self.period_id.as_deref() {
            return;
        }

        match period_id {
            Some(period) => {
                let scope = CollectionScope::family_period(family_id, period);
                let failed = subscribe_all(&self.period_stores, &scope);
                info!(
                    "event=coordinator_period module=coordinator status=ok action=subscribe stores={} failed={}",
                    self.period_stores.len(),
                    failed
                );
                self.period_id = Some(period.to_string());
            }
            None => {
                clear_all(&self.period_stores);
                info!(
                    "event=coordinator_period module=coordinator status=ok action=clear stores={}",
                    self.period_stores.len()
                );
                self.period_id = None;
            }
        }
    }

    /// Drives the coordinator from the session and budget-period channels
    /// until either sender is dropped.
    pub fn spawn(
        mut self,
        mut session: watch::Receiver<SessionState>,
        mut periods: watch::Receiver<StoreState<BudgetPeriod>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let family_id = session.borrow_and_update().family_id().map(str::to_string);
                self.observe_family(family_id.as_deref());

                let period_id = active_period_id(&periods.borrow_and_update().records)
                    .map(str::to_string);
                self.observe_active_period(period_id.as_deref());

                let open = tokio::select! {
                    changed = session.changed() => changed.is_ok(),
                    changed = periods.changed() => changed.is_ok(),
                };
                if !open {
                    break;
                }
            }
            info!("event=coordinator_stop module=coordinator status=ok");
        })
    }
}

fn subscribe_all(stores: &[Arc<dyn ScopedStore>], scope: &CollectionScope) -> usize {
    let mut failed = 0;
    for store in stores {
        if let Err(err) = store.subscribe(scope.clone()) {
            failed += 1;
            warn!(
                "event=coordinator_subscribe module=coordinator status=error collection={} error_code={}",
                store.collection(),
                err.code()
            );
        }
    }
    failed
}

fn clear_all(stores: &[Arc<dyn ScopedStore>]) {
    for store in stores {
        store.clear();
    }
}
