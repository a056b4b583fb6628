//! Output formatting utilities

use crate::error::CliResult;
use colored::*;
use serde::Serialize;
use svcmap_types::InstanceRecord;
use tabled::{Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Table row for instance display
#[derive(Debug, Serialize, Tabled)]
pub struct InstanceRow {
    /// Registry instance id
    id: String,
    /// `instance_name` attribute
    instance_name: String,
    /// Remaining attributes as `key=value`
    attributes: String,
}

impl From<&InstanceRecord> for InstanceRow {
    fn from(record: &InstanceRecord) -> Self {
        let attributes = record
            .attributes
            .iter()
            .filter(|(k, _)| *k != svcmap_types::attributes::INSTANCE_NAME)
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: record.id.to_string(),
            instance_name: record.instance_name().unwrap_or("-").to_string(),
            attributes,
        }
    }
}

/// Print instances in the specified format
pub fn print_instances(instances: &[InstanceRecord], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table => {
            if instances.is_empty() {
                println!("{}", "No instances".dimmed());
            } else {
                let rows: Vec<InstanceRow> = instances.iter().map(InstanceRow::from).collect();
                println!("{}", Table::new(rows));
            }
            Ok(())
        }
        OutputFormat::Json | OutputFormat::Yaml => print_single(&instances, format),
    }
}

/// Print a single item in the specified format
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(data)?);
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcmap_types::InstanceId;

    #[test]
    fn test_output_format_default() {
        let format = OutputFormat::default();
        assert!(matches!(format, OutputFormat::Table));
    }

    #[test]
    fn test_instance_row_moves_name_out_of_attributes() {
        let record = InstanceRecord {
            id: InstanceId::new("i-1"),
            attributes: [("instance_name", "web-1"), ("port", "80"), ("type", "http")]
                .into_iter()
                .collect(),
        };

        let row = InstanceRow::from(&record);
        assert_eq!(row.instance_name, "web-1");
        assert_eq!(row.attributes, "port=80, type=http");
    }
}
