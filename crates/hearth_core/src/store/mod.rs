//! Synchronized collection stores.
//!
//! # Responsibility
//! - Mirror remote push-based collections into observable local state.
//! - Provide one generic store plus per-domain instantiations.
//!
//! # Invariants
//! - Each store owns its records and listener; stores never share state.
//! - Records change only when a snapshot arrives or the store is cleared.

pub mod domains;
pub mod state;
pub mod synchronized;

pub use domains::{DomainCollections, DomainStores};
pub use state::StoreState;
pub use synchronized::{ScopedStore, SynchronizedStore};
