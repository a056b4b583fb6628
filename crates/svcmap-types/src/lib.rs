//! SVCMAP Types - Core types for service registry reconciliation
//!
//! These types describe both sides of a reconciliation pass:
//!
//! - **DesiredState**: the flat attribute set the caller wants to see
//! - **Intent**: which reconciliation routine to run
//! - **Records**: namespaces, services, instances and operations as the
//!   registry reports them
//!
//! Identifiers are opaque strings handed out by the registry.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod attributes;
pub mod desired;
pub mod ids;
pub mod records;

// Re-export main types
pub use attributes::{Attributes, IDENTITY_KEYS};
pub use desired::{parse_override, DesiredState, DesiredStateError, Intent};
pub use ids::{InstanceId, NamespaceId, OperationId, ServiceId};
pub use records::{
    CreateServiceRequest, InstanceRecord, NamespaceSummary, Operation, OperationStatus, PageToken,
    ServicePage, ServiceSummary,
};
