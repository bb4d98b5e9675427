//! Flutter-facing bindings for the Hearth sync core.

pub mod api;
