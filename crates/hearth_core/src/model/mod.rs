//! Household data model.
//!
//! # Responsibility
//! - Define identity/profile/family records used by the session.
//! - Define the eight family-scoped domain records mirrored by stores.
//!
//! # Invariants
//! - Every domain record belongs to exactly one family.
//! - Authoritative existence of a record is its presence in the latest
//!   pushed snapshot; nothing here is constructed as local truth.

pub mod domains;
pub mod identity;
pub mod record;
