//! Command-line interface for airtable-sync
//!
//! # Usage Examples
//!
//! ## Run
//! ```bash
//! # Write <data-dir>/in/tables/*.csv using <data-dir>/config.json
//! airtable-sync --data-dir /data run
//!
//! # Explicit input, config and report paths
//! airtable-sync --config config.yaml run \
//!   --input orders.csv \
//!   --log-output out/log.csv
//! ```
//!
//! ## Sync actions
//! ```bash
//! airtable-sync --config config.json test-connection
//! airtable-sync --config config.json list-bases
//! airtable-sync --config config.json list-tables
//! airtable-sync --config config.json derive-columns \
//!   --storage-url https://connection.keboola.com --storage-token "$KBC_TOKEN"
//! ```
//!
//! Without a subcommand the configuration's `action` field decides, and a
//! missing action means `run`.
//!
//! ## Exit codes
//! - 0: success
//! - 1: configuration, input or schema problem the user can fix
//! - 2: internal or unexpected remote failure

use airtable_sync::actions;
use airtable_sync::storage::StorageClient;
use airtable_sync::{run_sync, Action, ConnectorOpts, RunOpts};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sync_core::{ConfigFile, SyncError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "airtable-sync")]
#[command(about = "Write CSV tables into Airtable")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: ConnectorOpts,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the input table into the destination Airtable table
    Run {
        #[command(flatten)]
        run_opts: RunOpts,
    },

    /// Check that the API token can list bases
    TestConnection,

    /// List the bases visible to the API token
    ListBases,

    /// List the tables of the configured base
    ListTables,

    /// Derive the column configuration from the input table's metadata
    DeriveColumns {
        #[command(flatten)]
        storage: StorageOpts,
    },
}

#[derive(clap::Args, Clone, Debug, Default)]
struct StorageOpts {
    /// Storage API URL
    #[arg(long, env = "KBC_URL", default_value = "https://connection.keboola.com")]
    storage_url: String,

    /// Storage API token
    #[arg(long, env = "KBC_TOKEN", hide_env_values = true, default_value = "")]
    storage_token: String,

    /// Input table id; defaults to the first input table of the configuration
    #[arg(long)]
    table_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<SyncError>()
            .map(SyncError::exit_code)
            .unwrap_or(2);
        std::process::exit(code);
    }
    Ok(())
}

/// RUST_LOG wins; otherwise the configuration's debug flag picks the level.
fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let output = serde_json::to_string(value).context("Failed to serialize action output")?;
    println!("{output}");
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = cli.opts.load_config();
    init_tracing(
        loaded
            .as_ref()
            .map(|config| config.parameters.debug)
            .unwrap_or(false),
    );
    let config: ConfigFile = loaded?;
    let parameters = config.parameters.clone();
    tracing::debug!("Loaded configuration: {parameters:?}");

    let command = match cli.command {
        Some(command) => command,
        None => match config.action.as_deref().unwrap_or("run").parse::<Action>()? {
            Action::Run => Commands::Run {
                run_opts: RunOpts::default(),
            },
            Action::TestConnection => Commands::TestConnection,
            Action::ListBases => Commands::ListBases,
            Action::ListTables => Commands::ListTables,
            Action::DeriveColumns => Commands::DeriveColumns {
                storage: StorageOpts {
                    storage_url: std::env::var("KBC_URL")
                        .unwrap_or_else(|_| "https://connection.keboola.com".to_string()),
                    storage_token: std::env::var("KBC_TOKEN").unwrap_or_default(),
                    table_id: None,
                },
            },
        },
    };

    let client = cli.opts.client(&parameters);

    match command {
        Commands::Run { run_opts } => {
            let report = run_sync(&client, parameters, &run_opts, &cli.opts.data_dir).await?;
            if let Some(path) = &report.report_path {
                tracing::info!("Outcome report written to {}", path.display());
            }
        }
        Commands::TestConnection => {
            let status = actions::test_connection(&client, &parameters).await?;
            print_json(&status)?;
        }
        Commands::ListBases => {
            let bases = actions::list_bases(&client, &parameters).await?;
            print_json(&bases)?;
        }
        Commands::ListTables => {
            let tables = actions::list_tables(&client, &parameters).await?;
            print_json(&tables)?;
        }
        Commands::DeriveColumns { storage } => {
            if storage.storage_token.is_empty() {
                return Err(SyncError::Configuration(
                    "Storage API token is required to derive columns (KBC_TOKEN)".to_string(),
                )
                .into());
            }
            let table_id = storage.table_id.or(config.input_table_id);
            let storage_client = StorageClient::new(storage.storage_url, storage.storage_token);
            let columns = actions::derive_columns(&storage_client, table_id.as_deref()).await?;
            print_json(&columns)?;
        }
    }

    Ok(())
}
