//! Per-domain store instantiations and convenience mutations.

use crate::error::{CoreError, CoreResult};
use crate::model::domains::{
    active_period_id, BudgetCategory, BudgetPeriod, CalendarEvent, MealPlan, Note, ShoppingItem,
    Task, TaskStatus, Transaction,
};
use crate::model::record::{DomainRecord, RecordPatch};
use crate::remote::RemoteCollection;
use crate::store::synchronized::{ScopedStore, SynchronizedStore};
use std::sync::Arc;

pub type BudgetPeriodStore = SynchronizedStore<BudgetPeriod>;
pub type BudgetCategoryStore = SynchronizedStore<BudgetCategory>;
pub type TransactionStore = SynchronizedStore<Transaction>;
pub type ShoppingStore = SynchronizedStore<ShoppingItem>;
pub type TaskStore = SynchronizedStore<Task>;
pub type CalendarStore = SynchronizedStore<CalendarEvent>;
pub type NoteStore = SynchronizedStore<Note>;
pub type MealPlanStore = SynchronizedStore<MealPlan>;

/// Remote collections for every synchronized domain.
#[derive(Clone)]
pub struct DomainCollections {
    pub budget_periods: Arc<dyn RemoteCollection<BudgetPeriod>>,
    pub budget_categories: Arc<dyn RemoteCollection<BudgetCategory>>,
    pub transactions: Arc<dyn RemoteCollection<Transaction>>,
    pub shopping: Arc<dyn RemoteCollection<ShoppingItem>>,
    pub tasks: Arc<dyn RemoteCollection<Task>>,
    pub calendar: Arc<dyn RemoteCollection<CalendarEvent>>,
    pub notes: Arc<dyn RemoteCollection<Note>>,
    pub meal_plans: Arc<dyn RemoteCollection<MealPlan>>,
}

/// The eight stores, each owning its own records and listener.
pub struct DomainStores {
    pub budget_periods: Arc<BudgetPeriodStore>,
    pub budget_categories: Arc<BudgetCategoryStore>,
    pub transactions: Arc<TransactionStore>,
    pub shopping: Arc<ShoppingStore>,
    pub tasks: Arc<TaskStore>,
    pub calendar: Arc<CalendarStore>,
    pub notes: Arc<NoteStore>,
    pub meal_plans: Arc<MealPlanStore>,
}

impl DomainStores {
    pub fn new(collections: DomainCollections) -> Self {
        Self {
            budget_periods: Arc::new(SynchronizedStore::new(collections.budget_periods)),
            budget_categories: Arc::new(SynchronizedStore::new(collections.budget_categories)),
            transactions: Arc::new(SynchronizedStore::new(collections.transactions)),
            shopping: Arc::new(SynchronizedStore::new(collections.shopping)),
            tasks: Arc::new(SynchronizedStore::new(collections.tasks)),
            calendar: Arc::new(SynchronizedStore::new(collections.calendar)),
            notes: Arc::new(SynchronizedStore::new(collections.notes)),
            meal_plans: Arc::new(SynchronizedStore::new(collections.meal_plans)),
        }
    }

    /// Stores scoped by family id alone.
    pub fn family_scoped(&self) -> Vec<Arc<dyn ScopedStore>> {
        let stores: [Arc<dyn ScopedStore>; 7] = [
            self.budget_periods.clone(),
            self.transactions.clone(),
            self.shopping.clone(),
            self.tasks.clone(),
            self.calendar.clone(),
            self.notes.clone(),
            self.meal_plans.clone(),
        ];
        stores.into()
    }

    /// Stores scoped by family id and active budget period.
    pub fn period_scoped(&self) -> Vec<Arc<dyn ScopedStore>> {
        let stores: [Arc<dyn ScopedStore>; 1] = [self.budget_categories.clone()];
        stores.into()
    }

    /// Active budget period in the latest periods snapshot.
    pub fn active_period_id(&self) -> Option<String> {
        active_period_id(&self.budget_periods.state().records).map(str::to_string)
    }

    pub fn clear_all(&self) {
        for store in self.family_scoped().into_iter().chain(self.period_scoped()) {
            store.clear();
        }
    }
}

impl ShoppingStore {
    /// Flips `checked` based on the latest snapshot value.
    ///
    /// # Errors
    /// - `InvalidArgument` when `id` is not in the latest snapshot.
    pub async fn toggle_checked(&self, id: &str) -> CoreResult<()> {
        let checked = self
            .records()
            .iter()
            .find(|item| item.meta().id == id)
            .map(|item| item.checked);
        let Some(checked) = checked else {
            return Err(CoreError::invalid_argument(format!(
                "shopping item `{id}` is not in the current snapshot"
            )));
        };
        self.update(id, RecordPatch::new().set("checked", !checked))
            .await
    }
}

impl TaskStore {
    pub async fn set_status(&self, id: &str, status: TaskStatus) -> CoreResult<()> {
        self.update(id, RecordPatch::new().set("status", status.as_str()))
            .await
    }
}

impl NoteStore {
    pub async fn set_pinned(&self, id: &str, pinned: bool) -> CoreResult<()> {
        self.update(id, RecordPatch::new().set("pinned", pinned))
            .await
    }
}
