//! Airtable Sync Library
//!
//! Writes a CSV input table into an Airtable table.
//!
//! # Features
//!
//! - Full Load: clear the destination table, then create every input row
//! - Incremental Load: upsert input rows, matched on the configured key fields
//! - Append: create every input row
//! - Table provisioning: a missing destination table is created from the
//!   column configuration
//! - Per-batch failure containment with a per-record outcome report
//!
//! # Crates
//!
//! - `sync_core` - configuration, field kinds, cell values and errors
//! - `csv_types` - CSV cell parsing by field kind
//! - `airtable_client` - the Airtable Web API behind the `AirtableApi` trait
//! - `airtable_sink` - mapping, reconciliation, provisioning and batch writes
//! - `airtable_sync_csv_source` - chunked CSV reading and the run driver
//!
//! # CLI Usage
//!
//! ```bash
//! # Write the input table using <data-dir>/config.json
//! airtable-sync --data-dir /data run
//!
//! # Check the token, then fill the UI select boxes
//! airtable-sync --config config.yaml test-connection
//! airtable-sync --config config.yaml list-bases
//! airtable-sync --config config.yaml list-tables
//!
//! # Derive the column configuration from the input table's metadata
//! airtable-sync derive-columns --storage-url https://connection.keboola.com
//! ```

use airtable_client::{AirtableApi, AirtableClient};
use clap::{Args, Parser};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use sync_core::{ConfigFile, Configuration, Result, SyncError};

pub mod actions;
pub mod storage;

// Re-export the CSV source crate for convenience
pub use airtable_sync_csv_source as csv;

/// Options shared by every subcommand.
#[derive(Parser, Clone, Debug)]
pub struct ConnectorOpts {
    /// Data directory holding config.json, in/tables and out/tables
    #[arg(long, global = true, default_value = "/data", env = "KBC_DATADIR")]
    pub data_dir: PathBuf,

    /// Configuration file (.json, .yaml, .yml or .toml); defaults to <data-dir>/config.json
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Airtable personal access token; overrides the configured token
    #[arg(long, global = true, env = "AIRTABLE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Airtable API URL
    #[arg(
        long,
        global = true,
        default_value = AirtableClient::DEFAULT_API_URL,
        env = "AIRTABLE_API_URL"
    )]
    pub api_url: String,
}

impl ConnectorOpts {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.data_dir.join("config.json"))
    }

    /// Load the configuration file and apply the token override.
    pub fn load_config(&self) -> Result<ConfigFile> {
        let mut config = ConfigFile::from_file(&self.config_path())?;
        if let Some(token) = self.api_token.as_deref().filter(|t| !t.trim().is_empty()) {
            config.parameters.api_token = token.to_string();
        }
        Ok(config)
    }

    pub fn client(&self, parameters: &Configuration) -> AirtableClient {
        AirtableClient::with_api_url(parameters.api_token.clone(), self.api_url.clone())
    }
}

/// Options of the `run` subcommand.
#[derive(Args, Clone, Debug)]
pub struct RunOpts {
    /// Input CSV file; defaults to the first *.csv in <data-dir>/in/tables
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Outcome report path; defaults to <data-dir>/out/tables/log.csv
    #[arg(long, value_name = "PATH")]
    pub log_output: Option<PathBuf>,

    /// CSV delimiter character (default: ',')
    #[arg(long, default_value = ",")]
    pub delimiter: char,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            input: None,
            log_output: None,
            delimiter: ',',
        }
    }
}

/// What to do, when picked by the configuration's `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Run,
    TestConnection,
    ListBases,
    ListTables,
    DeriveColumns,
}

impl FromStr for Action {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "run" | "" => Ok(Action::Run),
            "testConnection" | "test-connection" | "test_connection" => Ok(Action::TestConnection),
            "listBases" | "list-bases" | "list_bases" => Ok(Action::ListBases),
            "listTables" | "list-tables" | "list_tables" => Ok(Action::ListTables),
            "deriveColumns" | "derive-columns" | "derive_columns" | "loadColumns" => {
                Ok(Action::DeriveColumns)
            }
            other => Err(SyncError::Configuration(format!("Unknown action '{other}'"))),
        }
    }
}

/// Build the CSV run configuration from the data directory layout.
pub fn csv_config(
    parameters: Configuration,
    run_opts: &RunOpts,
    data_dir: &Path,
) -> Result<csv::Config> {
    let input = match &run_opts.input {
        Some(path) => path.clone(),
        None => csv::find_input_csv(&data_dir.join("in").join("tables"))?,
    };
    let log_output = run_opts
        .log_output
        .clone()
        .unwrap_or_else(|| data_dir.join("out").join("tables").join("log.csv"));
    let delimiter = u8::try_from(run_opts.delimiter).map_err(|_| {
        SyncError::Configuration(format!(
            "Delimiter must be a single-byte character, got '{}'",
            run_opts.delimiter
        ))
    })?;

    Ok(csv::Config {
        input,
        parameters,
        log_output: Some(log_output),
        delimiter,
    })
}

/// Write the input table into Airtable.
pub async fn run_sync<A: AirtableApi + ?Sized>(
    api: &A,
    parameters: Configuration,
    run_opts: &RunOpts,
    data_dir: &Path,
) -> Result<csv::RunReport> {
    parameters.validate_for_run()?;
    let config = csv_config(parameters, run_opts, data_dir)?;
    let report = csv::sync(api, &config).await?;
    tracing::info!("Sync finished: {}", report.summary);
    Ok(report)
}
