//! SVCMAP Reconcile - Desired-state reconciliation against a service registry
//!
//! A reconciliation pass is stateless: it resolves names, merges attributes,
//! submits at most one mutation and waits for it to finish.
//!
//! - **NameResolver**: namespace and service names to identifiers, walking
//!   paginated listings to the end before declaring a service absent
//! - **Attribute merging**: ordered attribute layers with identity keys
//!   re-asserted on update
//! - **OperationWaiter**: bounded polling of asynchronous operations
//! - **Reconciler**: one idempotent routine per intent
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use svcmap_reconcile::{Reconciler, ReconcilerConfig};
//! use svcmap_registry::InMemoryRegistry;
//! use svcmap_types::{Attributes, DesiredState, Intent};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(InMemoryRegistry::new());
//! let reconciler = Reconciler::new(registry, ReconcilerConfig::default());
//! let desired = DesiredState::from_json_str(r#"{"namespace": "prod", "service_name": "api"}"#)?;
//! let instances = reconciler
//!     .reconcile(Intent::GetInstances, &desired, &Attributes::new())
//!     .await?;
//! println!("{:?}", instances);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod merge;
pub mod reconciler;
pub mod resolver;
pub mod waiter;

// Re-exports
pub use error::{ReconcileError, Result};
pub use merge::{merge_for_register, merge_for_update, AttributeSources};
pub use reconciler::{
    DeleteOutcome, InstanceChange, Outcome, Reconciler, ReconcilerConfig, RegisterOutcome,
};
pub use resolver::{NameResolver, DEFAULT_PAGE_SIZE};
pub use waiter::{OperationWaiter, WaitState, WaiterConfig};
