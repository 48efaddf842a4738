//! Column definitions from the Keboola Storage API.
//!
//! `derive-columns` asks Storage for the input table's metadata and turns its
//! columns into a starting column configuration.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use sync_core::{ColumnConfig, FieldKind, SyncError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage API request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Storage API returned status {status} for '{url}': {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Failed to decode Storage API table detail: {0}")]
    Decode(String),
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::Status {
                status: 401 | 403 | 404,
                ..
            } => SyncError::Configuration(message),
            _ => SyncError::Remote(message),
        }
    }
}

/// Table detail as returned by `GET /v2/storage/tables/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableDetail {
    #[serde(rename = "isTyped", default)]
    pub is_typed: bool,
    #[serde(default)]
    pub definition: Option<TableDefinition>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(rename = "primaryKey", default)]
    pub primary_key: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableDefinition {
    #[serde(rename = "primaryKeysNames", default)]
    pub primary_keys_names: Vec<String>,
    #[serde(default)]
    pub columns: Vec<DefinedColumn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefinedColumn {
    pub name: String,
    #[serde(default)]
    pub definition: ColumnDefinition,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnDefinition {
    #[serde(rename = "type", default)]
    pub base_type: Option<String>,
}

impl TableDetail {
    /// One same-named column per source column, typed from the storage type.
    ///
    /// Typed tables carry a type per column; untyped tables are all text.
    pub fn column_configs(&self) -> Vec<ColumnConfig> {
        let (columns, primary_keys): (Vec<(&str, &str)>, HashSet<&str>) =
            match (&self.definition, self.is_typed) {
                (Some(definition), true) => (
                    definition
                        .columns
                        .iter()
                        .map(|c| {
                            (
                                c.name.as_str(),
                                c.definition.base_type.as_deref().unwrap_or("STRING"),
                            )
                        })
                        .collect(),
                    definition
                        .primary_keys_names
                        .iter()
                        .map(String::as_str)
                        .collect(),
                ),
                _ => (
                    self.columns.iter().map(|c| (c.as_str(), "STRING")).collect(),
                    self.primary_key.iter().map(String::as_str).collect(),
                ),
            };

        columns
            .into_iter()
            .map(|(name, storage_type)| {
                let column = ColumnConfig::same_name(name, FieldKind::from_source_type(storage_type));
                if primary_keys.contains(name) {
                    column.key()
                } else {
                    column
                }
            })
            .collect()
    }
}

/// Minimal Storage API client.
#[derive(Clone)]
pub struct StorageClient {
    http: Client,
    url: String,
    token: String,
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl StorageClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub async fn get_table_detail(&self, table_id: &str) -> Result<TableDetail, StorageError> {
        let url = format!("{}/v2/storage/tables/{table_id}", self.url);
        tracing::debug!("Fetching table detail from {url}");

        let response = self
            .http
            .get(&url)
            .header("X-StorageApi-Token", &self.token)
            .send()
            .await
            .map_err(|source| StorageError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| StorageError::Transport {
            url: url.clone(),
            source,
        })?;
        if !status.is_success() {
            return Err(StorageError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| StorageError::Decode(e.to_string()))
    }

    /// Column configuration derived from the metadata of `table_id`.
    pub async fn get_column_definitions(
        &self,
        table_id: &str,
    ) -> Result<Vec<ColumnConfig>, StorageError> {
        let detail = self.get_table_detail(table_id).await?;
        let columns = detail.column_configs();
        tracing::info!("Derived {} columns from table {table_id}", columns.len());
        Ok(columns)
    }
}
