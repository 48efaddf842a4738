//! AirtableApi trait definition.
//!
//! The sync engine is written against this trait so that runs can be driven
//! by the real HTTP client or by the in-memory implementation in tests.

use crate::error::RemoteError;
use crate::types::{
    BaseInfo, FieldDefinition, Fields, RecordUpdate, RemoteRecord, TableHandle, TableSchema,
    UpsertResult,
};

/// Operations the connector needs from the remote service.
///
/// # Usage Pattern
///
/// Callers take the API as a generic parameter:
///
/// ```ignore
/// pub async fn clear_table<A: AirtableApi + ?Sized>(api: &A, table: &TableHandle) -> Result<usize> {
///     let ids = api.list_record_ids(table).await?;
///     // ...
/// }
/// ```
///
/// Batch operations receive at most
/// [`MAX_RECORDS_PER_REQUEST`](sync_core::config::MAX_RECORDS_PER_REQUEST)
/// records; implementations reject larger batches. Every write is sent with
/// type coercion enabled, so the service converts strings into the field's
/// type where it can.
#[async_trait::async_trait]
pub trait AirtableApi: Send + Sync {
    /// List every base the token can access.
    async fn list_bases(&self) -> Result<Vec<BaseInfo>, RemoteError>;

    /// List the tables of a base, with their fields.
    async fn list_tables(&self, base_id: &str) -> Result<Vec<TableSchema>, RemoteError>;

    /// Fetch the current schema of one table.
    async fn get_table_schema(&self, table: &TableHandle) -> Result<TableSchema, RemoteError> {
        self.list_tables(&table.base_id)
            .await?
            .into_iter()
            .find(|t| t.id == table.table_id)
            .ok_or_else(|| {
                RemoteError::new(
                    Some(404),
                    Some("TABLE_NOT_FOUND".to_string()),
                    format!("Table '{}' not found in base '{}'", table.name, table.base_id),
                )
            })
    }

    /// Create a table with the given fields. The first field becomes primary.
    async fn create_table(
        &self,
        base_id: &str,
        name: &str,
        fields: &[FieldDefinition],
    ) -> Result<TableSchema, RemoteError>;

    /// Ids of every record in the table.
    async fn list_record_ids(&self, table: &TableHandle) -> Result<Vec<String>, RemoteError>;

    /// Create records.
    async fn batch_create(
        &self,
        table: &TableHandle,
        records: &[Fields],
    ) -> Result<Vec<RemoteRecord>, RemoteError>;

    /// Update records addressed by id.
    async fn batch_update(
        &self,
        table: &TableHandle,
        records: &[RecordUpdate],
    ) -> Result<Vec<RemoteRecord>, RemoteError>;

    /// Insert-or-update records, matching existing ones on `key_fields`.
    async fn batch_upsert(
        &self,
        table: &TableHandle,
        records: &[Fields],
        key_fields: &[String],
    ) -> Result<UpsertResult, RemoteError>;

    /// Delete records by id. Returns the ids the service reported deleted.
    async fn batch_delete(
        &self,
        table: &TableHandle,
        record_ids: &[String],
    ) -> Result<Vec<String>, RemoteError>;
}
