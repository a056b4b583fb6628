//! Reconciliation commands

use crate::error::{CliError, CliResult};
use crate::output::{self, print_info, print_success, print_warning, OutputFormat};
use clap::Args;
use std::path::PathBuf;
use svcmap_reconcile::{InstanceChange, Outcome, Reconciler};
use svcmap_types::{parse_override, Attributes, DesiredState, Intent};

/// Arguments shared by every intent
#[derive(Debug, Args)]
pub struct IntentArgs {
    /// Path to the JSON file describing the desired service and instance
    pub desired_state: PathBuf,

    /// Attribute override applied with highest precedence (repeatable)
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_override_arg)]
    pub overrides: Vec<(String, String)>,
}

fn parse_override_arg(raw: &str) -> Result<(String, String), String> {
    parse_override(raw).map_err(|e| e.to_string())
}

impl IntentArgs {
    /// Desired state read from disk
    pub async fn load(&self) -> CliResult<DesiredState> {
        let raw = tokio::fs::read_to_string(&self.desired_state)
            .await
            .map_err(|source| CliError::Io {
                path: self.desired_state.display().to_string(),
                source,
            })?;
        Ok(DesiredState::from_json_str(&raw)?)
    }

    pub fn extra(&self) -> Attributes {
        self.overrides.iter().cloned().collect()
    }
}

/// Execute one intent
pub async fn execute(
    intent: Intent,
    args: IntentArgs,
    reconciler: &Reconciler,
    format: OutputFormat,
) -> CliResult<()> {
    let desired = args.load().await?;
    let extra = args.extra();

    if matches!(format, OutputFormat::Table) {
        print_info(&describe(intent, &desired));
    }

    let outcome = reconciler.reconcile(intent, &desired, &extra).await?;
    report(&outcome, format)
}

fn describe(intent: Intent, desired: &DesiredState) -> String {
    let service = desired.service_name().unwrap_or("-");
    match intent {
        Intent::RegisterInstance => format!(
            "Registering instance {} in service {}...",
            desired.instance_name().unwrap_or("-"),
            service
        ),
        Intent::UpdateInstance => format!(
            "Updating instance {} in service {}...",
            desired.instance_name().unwrap_or("-"),
            service
        ),
        Intent::DeregisterInstance => format!(
            "Deregistering instance with name {}...",
            desired.instance_name().unwrap_or("-")
        ),
        Intent::DeleteService => format!("Deleting service {}...", service),
        Intent::GetInstances => format!("Listing instances of service {}...", service),
    }
}

/// Render an outcome for the operator
pub fn report(outcome: &Outcome, format: OutputFormat) -> CliResult<()> {
    if !matches!(format, OutputFormat::Table) {
        return match outcome {
            Outcome::Instances(instances) => output::print_instances(instances, format),
            other => output::print_single(other, format),
        };
    }

    match outcome {
        Outcome::Registered(registered) => {
            if registered.service_created {
                print_success(&format!("Created service: {}", registered.service_id));
            }
            print_success(&format!(
                "Registered instance {} (operation {})",
                registered.instance_id, registered.operation.id
            ));
        }
        Outcome::Updated(change) => report_change(change, "Updated"),
        Outcome::Deregistered(change) => report_change(change, "Deregistered"),
        Outcome::ServiceDeleted(deleted) => {
            if deleted.service_created {
                print_warning(&format!(
                    "Service {} did not exist and was created before deletion",
                    deleted.service_id
                ));
            }
            print_success(&format!("Service deleted: {}", deleted.service_id));
        }
        Outcome::Instances(instances) => output::print_instances(instances, format)?,
    }
    Ok(())
}

fn report_change(change: &InstanceChange, verb: &str) {
    match change {
        InstanceChange::Applied {
            instance_id,
            operation,
            ..
        } => print_success(&format!(
            "{} instance {} (operation {})",
            verb, instance_id, operation.id
        )),
        InstanceChange::NotFound {
            service_id,
            instance_name,
        } => print_warning(&format!(
            "No instance named {} in service {}; nothing to do",
            instance_name, service_id
        )),
    }
}
