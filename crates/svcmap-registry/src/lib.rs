//! SVCMAP Registry - Registry client contract and implementations
//!
//! This crate defines the boundary between reconciliation and the remote
//! service registry:
//!
//! - **RegistryClient**: the calls the reconciler may make
//! - **RegistryError**: failures a backend can report
//! - **InMemoryRegistry**: a complete backend for development and tests
//!
//! Concrete network clients implement the same trait.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod client;
pub mod error;
pub mod memory;

// Re-exports
pub use client::RegistryClient;
pub use error::{RegistryError, Result};
pub use memory::{CallCounts, InMemoryRegistry, FAIL_STATUS, PENDING_STATUS, SUCCESS_STATUS};
