//! Interactive actions used to fill in the configuration UI.
//!
//! Each action returns a JSON-serializable value; `main` prints it to stdout.

use crate::storage::StorageClient;
use airtable_client::{AirtableApi, RemoteError};
use serde::Serialize;
use serde_json::{json, Value};
use sync_core::{ColumnConfig, Configuration, Result, SyncError};
use tracing::info;

/// One entry of a UI select box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

fn connection_error(err: RemoteError) -> SyncError {
    if err.is_unauthorized() {
        SyncError::Configuration(format!(
            "Failed to connect to Airtable, check the API token: {err}"
        ))
    } else if err.is_not_found() {
        SyncError::Configuration(format!("Airtable resource not found: {err}"))
    } else {
        SyncError::Remote(format!("Failed to connect to Airtable: {err}"))
    }
}

/// Check that the token can list bases.
pub async fn test_connection<A: AirtableApi + ?Sized>(
    api: &A,
    parameters: &Configuration,
) -> Result<Value> {
    parameters.validate_credentials()?;
    let bases = api.list_bases().await.map_err(connection_error)?;
    info!("Connection OK, {} bases visible", bases.len());
    Ok(json!({ "status": "success" }))
}

/// Bases visible to the token, as `{value: id, label: name}`.
pub async fn list_bases<A: AirtableApi + ?Sized>(
    api: &A,
    parameters: &Configuration,
) -> Result<Vec<SelectOption>> {
    parameters.validate_credentials()?;
    let bases = api.list_bases().await.map_err(connection_error)?;
    Ok(bases
        .into_iter()
        .map(|base| SelectOption::new(base.id, base.name))
        .collect())
}

/// Tables of the configured base, as `{value: name, label: name}`.
///
/// The destination is configured by table name, so the name is the value.
pub async fn list_tables<A: AirtableApi + ?Sized>(
    api: &A,
    parameters: &Configuration,
) -> Result<Vec<SelectOption>> {
    parameters.validate_base()?;
    let tables = api
        .list_tables(&parameters.base_id)
        .await
        .map_err(connection_error)?;
    Ok(tables
        .into_iter()
        .map(|table| SelectOption::new(table.name.clone(), table.name))
        .collect())
}

/// Column configuration derived from the input table's storage metadata.
pub async fn derive_columns(
    storage: &StorageClient,
    input_table_id: Option<&str>,
) -> Result<Vec<ColumnConfig>> {
    let table_id = input_table_id.ok_or_else(|| {
        SyncError::Configuration(
            "No input table mapped. Map exactly one input table to load its columns.".to_string(),
        )
    })?;
    Ok(storage.get_column_definitions(table_id).await?)
}
