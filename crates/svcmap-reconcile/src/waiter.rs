//! Operation waiter
//!
//! Polls an asynchronous registry operation until it reaches a terminal
//! status or the timeout budget runs out. Only the status check is retried;
//! the mutation itself is never resubmitted.
//!
//! There is no cancellation hook. A caller that needs one can wrap `wait`
//! in `tokio::time::timeout`, keeping in mind the remote operation may still
//! complete after the caller gives up.

use crate::error::{ReconcileError, Result};
use std::time::Duration;
use svcmap_registry::RegistryClient;
use svcmap_types::{Operation, OperationId, OperationStatus};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Polling behaviour and status vocabulary of the waiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaiterConfig {
    /// Pause between two status checks
    pub poll_interval: Duration,
    /// Budget measured from the first status check
    pub timeout: Duration,
    /// Registry label for a successful operation
    pub success_status: String,
    /// Registry label for a failed operation
    pub failure_status: String,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(3600),
            success_status: "SUCCESS".to_string(),
            failure_status: "FAIL".to_string(),
        }
    }
}

impl WaiterConfig {
    /// Zero-delay polling, for tests and local backends
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Map a raw registry label onto an operation status
    pub fn classify(&self, status: &str) -> OperationStatus {
        if status == self.success_status {
            OperationStatus::Success
        } else if status == self.failure_status {
            OperationStatus::Failed
        } else {
            OperationStatus::Pending
        }
    }
}

/// Waiter states; `Polling` is the only non-terminal one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl WaitState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WaitState::Polling)
    }
}

impl From<OperationStatus> for WaitState {
    fn from(status: OperationStatus) -> Self {
        match status {
            OperationStatus::Pending => WaitState::Polling,
            OperationStatus::Success => WaitState::Succeeded,
            OperationStatus::Failed => WaitState::Failed,
        }
    }
}

/// Drives one operation to a terminal state
pub struct OperationWaiter<'a> {
    client: &'a dyn RegistryClient,
    config: &'a WaiterConfig,
}

impl<'a> OperationWaiter<'a> {
    pub fn new(client: &'a dyn RegistryClient, config: &'a WaiterConfig) -> Self {
        Self { client, config }
    }

    /// Poll until success, failure or timeout
    ///
    /// Returns the final operation record on success.
    #[instrument(skip(self), fields(operation_id = %operation_id))]
    pub async fn wait(&self, operation_id: &OperationId) -> Result<Operation> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let operation = self.client.get_operation(operation_id).await?;
            polls += 1;

            let state = WaitState::from(self.config.classify(&operation.status));
            debug!(polls, status = %operation.status, ?state, "Checked operation");

            match state {
                WaitState::Succeeded => {
                    info!(polls, elapsed = ?started.elapsed(), "Operation succeeded");
                    return Ok(operation);
                }
                WaitState::Failed => {
                    warn!(polls, status = %operation.status, "Operation failed");
                    return Err(ReconcileError::OperationFailed {
                        operation_id: operation_id.clone(),
                        operation: Box::new(operation),
                    });
                }
                WaitState::Polling | WaitState::TimedOut => {}
            }

            tokio::time::sleep(self.config.poll_interval).await;

            let elapsed = started.elapsed();
            if elapsed > self.config.timeout {
                warn!(polls, ?elapsed, state = ?WaitState::TimedOut, "Gave up waiting for operation");
                return Err(ReconcileError::OperationTimeout {
                    operation_id: operation_id.clone(),
                    elapsed,
                    operation: Box::new(operation),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcmap_registry::{InMemoryRegistry, FAIL_STATUS, PENDING_STATUS, SUCCESS_STATUS};
    use svcmap_types::{Attributes, InstanceId};

    /// Submit one operation whose status sequence is `statuses`
    async fn scripted_operation(registry: &InMemoryRegistry, statuses: &[&str]) -> OperationId {
        let ns = registry.add_namespace("prod").await;
        let svc = registry.add_service(&ns, "api").await;
        registry.script_operation(statuses.iter().copied()).await;
        registry
            .upsert_instance(&svc, &InstanceId::new("web-1"), &Attributes::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_succeeds_after_pending_statuses() {
        let registry = InMemoryRegistry::new();
        let op = scripted_operation(
            &registry,
            &[PENDING_STATUS, PENDING_STATUS, SUCCESS_STATUS],
        )
        .await;

        let config = WaiterConfig::immediate().with_timeout(Duration::from_secs(100));
        let operation = OperationWaiter::new(&registry, &config).wait(&op).await.unwrap();

        assert_eq!(operation.status, SUCCESS_STATUS);
        assert_eq!(registry.calls().get_operation, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_terminal() {
        let registry = InMemoryRegistry::new();
        let op = scripted_operation(&registry, &[PENDING_STATUS]).await;

        let config = WaiterConfig::default()
            .with_poll_interval(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(1));
        let err = OperationWaiter::new(&registry, &config)
            .wait(&op)
            .await
            .unwrap_err();

        match err {
            ReconcileError::OperationTimeout {
                elapsed, operation, ..
            } => {
                assert!(elapsed >= Duration::from_secs(1));
                assert!(elapsed <= Duration::from_secs(2));
                assert_eq!(operation.status, PENDING_STATUS);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(registry.calls().get_operation, 2);
    }

    #[tokio::test]
    async fn test_fails_immediately_on_failed_status() {
        let registry = InMemoryRegistry::new();
        let op = scripted_operation(&registry, &[FAIL_STATUS]).await;

        let config = WaiterConfig::immediate();
        let err = OperationWaiter::new(&registry, &config)
            .wait(&op)
            .await
            .unwrap_err();

        match err {
            ReconcileError::OperationFailed {
                operation_id,
                operation,
            } => {
                assert_eq!(operation_id, op);
                assert_eq!(operation.record["Status"], FAIL_STATUS);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(registry.calls().get_operation, 1);
    }

    #[tokio::test]
    async fn test_custom_status_labels() {
        let registry = InMemoryRegistry::new().with_success_status("DONE");
        let ns = registry.add_namespace("prod").await;
        let svc = registry.add_service(&ns, "api").await;
        let instance = InstanceId::new("web-1");
        registry.script_operation(["RUNNING", "DONE"]).await;
        let op = registry
            .upsert_instance(&svc, &instance, &Attributes::new())
            .await
            .unwrap();

        let config = WaiterConfig {
            success_status: "DONE".to_string(),
            failure_status: "ERROR".to_string(),
            ..WaiterConfig::immediate()
        };
        let operation = OperationWaiter::new(&registry, &config).wait(&op).await.unwrap();

        assert_eq!(operation.status, "DONE");
        assert_eq!(registry.calls().get_operation, 2);
        assert!(registry.instance_attributes(&svc, &instance).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_deadline_abandons_wait() {
        let registry = InMemoryRegistry::new();
        let op = scripted_operation(&registry, &[PENDING_STATUS]).await;

        let config = WaiterConfig::default();
        let waiter = OperationWaiter::new(&registry, &config);
        let result = tokio::time::timeout(Duration::from_secs(12), waiter.wait(&op)).await;

        assert!(result.is_err());
        // Polls at 0s, 5s and 10s before the deadline
        assert_eq!(registry.calls().get_operation, 3);
    }

    #[test]
    fn test_classify_unknown_label_is_pending() {
        let config = WaiterConfig::default();
        assert_eq!(config.classify("SUCCESS"), OperationStatus::Success);
        assert_eq!(config.classify("FAIL"), OperationStatus::Failed);
        assert_eq!(config.classify("SUBMITTED"), OperationStatus::Pending);
        assert!(!WaitState::from(OperationStatus::Pending).is_terminal());
    }
}
