//! In-process implementation of every collaborator contract.
//!
//! # Responsibility
//! - Back the CLI demo and integration tests without a network service.
//! - Allow tests to inject one-shot failures per operation.
//!
//! # Invariants
//! - Listeners receive full ordered snapshots, never deltas.
//! - Callbacks are invoked outside internal locks.

mod collection;
mod directory;
mod identity;

pub use collection::MemoryCollection;
pub use directory::MemoryDirectory;
pub use identity::MemoryIdentityProvider;

use crate::context::Collaborators;
use crate::model::domains::{
    BudgetCategory, BudgetPeriod, CalendarEvent, MealPlan, Note, ShoppingItem, Task, Transaction,
};
use crate::remote::{RemoteError, RemoteResult};
use crate::store::DomainCollections;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Collaborator operation a failure can be armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryOp {
    Subscribe,
    Create,
    Update,
    Delete,
    SignIn,
    SignUp,
    SignInWithGoogle,
    SignOut,
    GetProfile,
    CreateFamily,
    JoinFamily,
    GetFamily,
}

/// One-shot failures keyed by operation.
#[derive(Default)]
pub(crate) struct FailurePlan {
    pending: Mutex<HashMap<MemoryOp, String>>,
}

impl FailurePlan {
    pub(crate) fn arm(&self, op: MemoryOp, message: impl Into<String>) {
        lock(&self.pending).insert(op, message.into());
    }

    /// Consumes the failure armed for `op`, if any.
    pub(crate) fn check(&self, op: MemoryOp) -> RemoteResult<()> {
        match lock(&self.pending).remove(&op) {
            Some(message) => Err(RemoteError::new(message)),
            None => Ok(()),
        }
    }
}

/// Shared directory, identity provider and the eight collections.
#[derive(Clone)]
pub struct MemoryBackend {
    pub directory: Arc<MemoryDirectory>,
    pub identity: Arc<MemoryIdentityProvider>,
    pub budget_periods: Arc<MemoryCollection<BudgetPeriod>>,
    pub budget_categories: Arc<MemoryCollection<BudgetCategory>>,
    pub transactions: Arc<MemoryCollection<Transaction>>,
    pub shopping: Arc<MemoryCollection<ShoppingItem>>,
    pub tasks: Arc<MemoryCollection<Task>>,
    pub calendar: Arc<MemoryCollection<CalendarEvent>>,
    pub notes: Arc<MemoryCollection<Note>>,
    pub meal_plans: Arc<MemoryCollection<MealPlan>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let directory = Arc::new(MemoryDirectory::new());
        Self {
            identity: Arc::new(MemoryIdentityProvider::new(directory.clone())),
            directory,
            budget_periods: Arc::new(MemoryCollection::new()),
            budget_categories: Arc::new(MemoryCollection::new()),
            transactions: Arc::new(MemoryCollection::new()),
            shopping: Arc::new(MemoryCollection::new()),
            tasks: Arc::new(MemoryCollection::new()),
            calendar: Arc::new(MemoryCollection::new()),
            notes: Arc::new(MemoryCollection::new()),
            meal_plans: Arc::new(MemoryCollection::new()),
        }
    }

    pub fn collections(&self) -> DomainCollections {
        DomainCollections {
            budget_periods: self.budget_periods.clone(),
            budget_categories: self.budget_categories.clone(),
            transactions: self.transactions.clone(),
            shopping: self.shopping.clone(),
            tasks: self.tasks.clone(),
            calendar: self.calendar.clone(),
            notes: self.notes.clone(),
            meal_plans: self.meal_plans.clone(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            identity: self.identity.clone(),
            profiles: self.directory.clone(),
            families: self.directory.clone(),
            collections: self.collections(),
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Six uppercase alphanumerics.
pub(crate) fn generate_invite_code() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .to_ascii_uppercase()
        .chars()
        .take(6)
        .collect()
}

pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::{generate_invite_code, FailurePlan, MemoryOp};
    use crate::session::normalize_invite_code;

    #[test]
    fn armed_failure_fires_once() {
        let plan = FailurePlan::default();
        plan.arm(MemoryOp::Create, "quota exceeded");
        let err = plan.check(MemoryOp::Create).expect_err("armed op should fail");
        assert_eq!(err.message, "quota exceeded");
        assert!(plan.check(MemoryOp::Create).is_ok());
        assert!(plan.check(MemoryOp::Delete).is_ok());
    }

    #[test]
    fn generated_invite_codes_are_valid() {
        for _ in 0..32 {
            let code = generate_invite_code();
            assert_eq!(code.len(), 6);
            assert_eq!(normalize_invite_code(&code).as_deref(), Some(code.as_str()));
        }
    }
}
