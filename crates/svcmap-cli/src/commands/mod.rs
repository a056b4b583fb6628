//! CLI command implementations

pub mod reconcile;
