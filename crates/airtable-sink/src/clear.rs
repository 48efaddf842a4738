//! Full-load table clearing.

use crate::batch::partition;
use airtable_client::{AirtableApi, TableHandle};
use sync_core::config::MAX_RECORDS_PER_REQUEST;
use sync_core::{Result, SyncError};

/// Delete every record of the table. Returns the number of ids deleted.
///
/// Ids are listed without field data and deleted in batches of
/// [`MAX_RECORDS_PER_REQUEST`]. Any failure aborts the run.
pub async fn clear_table<A: AirtableApi + ?Sized>(api: &A, table: &TableHandle) -> Result<usize> {
    let ids = api.list_record_ids(table).await.map_err(|e| {
        SyncError::Remote(format!(
            "Failed to list existing records of table '{}' for full load: {e}",
            table.name
        ))
    })?;

    if ids.is_empty() {
        tracing::info!("Table '{}' is already empty, nothing to delete", table.name);
        return Ok(0);
    }

    tracing::info!("Full load: deleting {} existing records", ids.len());

    for batch in partition(&ids, MAX_RECORDS_PER_REQUEST) {
        api.batch_delete(table, batch).await.map_err(|e| {
            SyncError::Remote(format!(
                "Failed to delete records of table '{}' for full load: {e}",
                table.name
            ))
        })?;
        tracing::debug!("Deleted batch of {} records", batch.len());
    }

    tracing::info!("Deleted all {} records", ids.len());
    Ok(ids.len())
}
