//! Run configuration.
//!
//! The configuration is read from a file whose format is picked by extension
//! (`.json`, `.yaml`/`.yml`, `.toml`). Either the bare parameters object or
//! the host envelope `{"parameters": {...}, "action": ..., "storage": ...}`
//! is accepted.

use crate::error::{Result, SyncError};
use crate::schema::{key_field_names, ColumnConfig, LoadType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Default number of input rows read per chunk.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Largest accepted input chunk size.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Most records Airtable accepts in one batch request.
pub const MAX_RECORDS_PER_REQUEST: usize = 10;

/// Destination table settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// Destination table name (exact match)
    #[serde(default)]
    pub table_name: String,

    /// Configured columns
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,

    /// Write strategy
    #[serde(default)]
    pub load_type: LoadType,

    /// Input column holding existing Airtable record ids, if any
    #[serde(default)]
    pub record_id_column: Option<String>,
}

/// Tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedOptions {
    /// Input rows read per chunk
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Records per Airtable request
    #[serde(default = "default_request_batch_size")]
    pub request_batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_request_batch_size() -> usize {
    MAX_RECORDS_PER_REQUEST
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_batch_size: MAX_RECORDS_PER_REQUEST,
        }
    }
}

/// Connector parameters.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Airtable personal access token
    #[serde(rename = "#api_token", alias = "api_token", default)]
    pub api_token: String,

    /// Airtable base id
    #[serde(default)]
    pub base_id: String,

    /// Destination table settings
    #[serde(default)]
    pub destination: Destination,

    /// Tuning knobs
    #[serde(default)]
    pub advanced_options: AdvancedOptions,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("api_token", &"<redacted>")
            .field("base_id", &self.base_id)
            .field("destination", &self.destination)
            .field("advanced_options", &self.advanced_options)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Configuration {
    /// Parse the parameters object.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| SyncError::Configuration(format!("Validation Error: {e}")))
    }

    /// Destination names of the upsert key columns.
    pub fn key_fields(&self) -> Vec<String> {
        key_field_names(&self.destination.columns)
    }

    /// Check that an API token is present.
    pub fn validate_credentials(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(SyncError::Configuration(
                "API token must be entered".to_string(),
            ));
        }
        Ok(())
    }

    /// Check the token and the base id.
    pub fn validate_base(&self) -> Result<()> {
        self.validate_credentials()?;
        if self.base_id.trim().is_empty() {
            return Err(SyncError::Configuration("Base ID must be entered".to_string()));
        }
        Ok(())
    }

    /// Check everything a write run needs before any remote call is made.
    pub fn validate_for_run(&self) -> Result<()> {
        self.validate_base()?;

        let destination = &self.destination;
        if destination.table_name.trim().is_empty() {
            return Err(SyncError::Configuration(
                "Destination table name must be entered".to_string(),
            ));
        }
        if destination.columns.is_empty() {
            return Err(SyncError::Configuration(
                "Column configuration is required. Configure columns using the 'Load Columns' \
                 button in the UI."
                    .to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for column in &destination.columns {
            if column.destination_name.trim().is_empty() {
                return Err(SyncError::Configuration(format!(
                    "Column '{}' has an empty destination name",
                    column.source_name
                )));
            }
            if !seen.insert(column.destination_name.as_str()) {
                return Err(SyncError::Configuration(format!(
                    "Destination field '{}' is mapped more than once",
                    column.destination_name
                )));
            }
        }

        if destination.load_type == LoadType::IncrementalLoad && self.key_fields().is_empty() {
            return Err(SyncError::Configuration(
                "Incremental Load requires at least one column marked as upsert key".to_string(),
            ));
        }

        let options = &self.advanced_options;
        if !(1..=MAX_BATCH_SIZE).contains(&options.batch_size) {
            return Err(SyncError::Configuration(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                options.batch_size
            )));
        }
        if !(1..=MAX_RECORDS_PER_REQUEST).contains(&options.request_batch_size) {
            return Err(SyncError::Configuration(format!(
                "request_batch_size must be between 1 and {MAX_RECORDS_PER_REQUEST}, got {}",
                options.request_batch_size
            )));
        }

        Ok(())
    }
}

/// A loaded configuration file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Connector parameters
    pub parameters: Configuration,

    /// Requested action from the host envelope, if any
    pub action: Option<String>,

    /// First input table id from the host envelope, if any
    pub input_table_id: Option<String>,
}

impl ConfigFile {
    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::Configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let value = match extension.as_str() {
            "yaml" | "yml" => {
                let yaml: serde_yaml::Value = serde_yaml::from_str(&content).map_err(|e| {
                    SyncError::Configuration(format!("Failed to parse YAML config: {e}"))
                })?;
                serde_json::to_value(yaml).map_err(|e| {
                    SyncError::Configuration(format!("Unsupported YAML config: {e}"))
                })?
            }
            "toml" => {
                let toml: toml::Value = toml::from_str(&content).map_err(|e| {
                    SyncError::Configuration(format!("Failed to parse TOML config: {e}"))
                })?;
                serde_json::to_value(toml).map_err(|e| {
                    SyncError::Configuration(format!("Unsupported TOML config: {e}"))
                })?
            }
            _ => serde_json::from_str(&content).map_err(|e| {
                SyncError::Configuration(format!("Failed to parse JSON config: {e}"))
            })?,
        };

        Self::from_value(value)
    }

    /// Build from an already parsed document.
    pub fn from_value(mut value: serde_json::Value) -> Result<Self> {
        let action = value
            .get("action")
            .and_then(|a| a.as_str())
            .map(str::to_string);
        let input_table_id = value
            .pointer("/storage/input/tables/0/source")
            .and_then(|s| s.as_str())
            .map(str::to_string);

        let parameters = if value.get("parameters").is_some() {
            value["parameters"].take()
        } else {
            value
        };

        Ok(Self {
            parameters: Configuration::from_value(parameters)?,
            action,
            input_table_id,
        })
    }
}
