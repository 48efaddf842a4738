//! Batch record synchronization.
//!
//! The synchronizer turns mapped records into create, update or upsert calls
//! of at most [`MAX_RECORDS_PER_REQUEST`] records. Each call is awaited before
//! the next one is made.
//!
//! A failed batch is contained: its records are logged as errors and the run
//! continues. Failures that would repeat for every batch stop the run
//! instead:
//!
//! - writing into a computed field, for any operation
//! - an upsert key matching several existing records
//! - duplicate key values within one upsert batch

use crate::batch::partition;
use crate::mapper::MappedRecord;
use crate::outcome::{OutcomeLog, OutcomeStatus};
use airtable_client::{
    AirtableApi, Fields, RecordUpdate, RemoteError, RemoteErrorCategory, TableHandle,
};
use serde::Serialize;
use std::fmt;
use sync_core::config::MAX_RECORDS_PER_REQUEST;
use sync_core::{LoadType, Result, SyncError};

/// Aggregate counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    pub total: usize,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records processed: {} created, {} updated, {} failed",
            self.total, self.created, self.updated, self.errors
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Update,
    Upsert,
}

impl Operation {
    fn verb(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Upsert => "upsert",
        }
    }
}

/// Writes records into one table for the duration of a run.
///
/// Records may arrive in several chunks; batch indices and the outcome log
/// span all of them.
pub struct RecordSynchronizer<'a, A: AirtableApi + ?Sized> {
    api: &'a A,
    table: TableHandle,
    load_type: LoadType,
    key_fields: Vec<String>,
    request_batch_size: usize,
    next_batch: usize,
    log: OutcomeLog,
    summary: SyncSummary,
}

impl<'a, A: AirtableApi + ?Sized> RecordSynchronizer<'a, A> {
    /// Create a synchronizer. Validates the batch size and, for incremental
    /// loads, that key fields are configured.
    pub fn new(
        api: &'a A,
        table: TableHandle,
        load_type: LoadType,
        key_fields: Vec<String>,
        request_batch_size: usize,
    ) -> Result<Self> {
        if request_batch_size == 0 || request_batch_size > MAX_RECORDS_PER_REQUEST {
            return Err(SyncError::Configuration(format!(
                "request batch size must be between 1 and {MAX_RECORDS_PER_REQUEST}, got {request_batch_size}"
            )));
        }
        if load_type == LoadType::IncrementalLoad && key_fields.is_empty() {
            return Err(SyncError::Configuration(
                "Incremental Load requires at least one upsert key column".to_string(),
            ));
        }

        Ok(Self {
            api,
            table,
            load_type,
            key_fields,
            request_batch_size,
            next_batch: 0,
            log: OutcomeLog::new(),
            summary: SyncSummary::default(),
        })
    }

    pub fn summary(&self) -> SyncSummary {
        self.summary
    }

    pub fn log(&self) -> &OutcomeLog {
        &self.log
    }

    /// Write one chunk of records according to the load type.
    pub async fn sync_chunk(&mut self, records: &[MappedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        match self.load_type {
            LoadType::FullLoad | LoadType::Append => {
                for batch in partition(records, self.request_batch_size) {
                    self.create_batch(batch).await?;
                }
            }
            LoadType::IncrementalLoad => {
                let (with_id, without_id): (Vec<MappedRecord>, Vec<MappedRecord>) =
                    records.iter().cloned().partition(|r| r.record_id.is_some());

                for batch in partition(&with_id, self.request_batch_size) {
                    self.update_batch(batch).await?;
                }
                for batch in partition(&without_id, self.request_batch_size) {
                    self.upsert_batch(batch).await?;
                }
            }
        }
        Ok(())
    }

    /// Log the aggregate summary and hand back the outcome log.
    pub fn finish(self) -> (OutcomeLog, SyncSummary) {
        tracing::info!("Sync finished for table '{}': {}", self.table.name, self.summary);
        if self.summary.errors > 0 {
            tracing::warn!(
                "{} records failed; see the outcome log for details",
                self.summary.errors
            );
        }
        (self.log, self.summary)
    }

    fn take_batch_index(&mut self) -> usize {
        let index = self.next_batch;
        self.next_batch += 1;
        index
    }

    async fn create_batch(&mut self, batch: &[MappedRecord]) -> Result<()> {
        let index = self.take_batch_index();
        self.summary.total += batch.len();
        let fields: Vec<Fields> = batch.iter().map(|r| r.fields.clone()).collect();

        let result = self.api.batch_create(&self.table, &fields).await;
        match result {
            Ok(created) => {
                for record in &created {
                    self.log.push(&record.id, OutcomeStatus::Create, "created");
                }
                self.summary.created += created.len();
                tracing::debug!("Batch {index}: created {} records", created.len());
                Ok(())
            }
            Err(err) => self.handle_failure(index, batch, Operation::Create, err),
        }
    }

    async fn update_batch(&mut self, batch: &[MappedRecord]) -> Result<()> {
        let index = self.take_batch_index();
        self.summary.total += batch.len();
        let updates: Vec<RecordUpdate> = batch
            .iter()
            .filter_map(|r| {
                r.record_id.as_ref().map(|id| RecordUpdate {
                    id: id.clone(),
                    fields: r.fields.clone(),
                })
            })
            .collect();

        let result = self.api.batch_update(&self.table, &updates).await;
        match result {
            Ok(updated) => {
                for record in &updated {
                    self.log.push(&record.id, OutcomeStatus::Update, "updated");
                }
                self.summary.updated += updated.len();
                tracing::debug!("Batch {index}: updated {} records", updated.len());
                Ok(())
            }
            Err(err) => self.handle_failure(index, batch, Operation::Update, err),
        }
    }

    async fn upsert_batch(&mut self, batch: &[MappedRecord]) -> Result<()> {
        let index = self.take_batch_index();
        self.summary.total += batch.len();
        let fields: Vec<Fields> = batch.iter().map(|r| r.fields.clone()).collect();

        let response = self
            .api
            .batch_upsert(&self.table, &fields, &self.key_fields)
            .await;
        match response {
            Ok(result) => {
                for record in &result.records {
                    let message = if result.created_records.contains(&record.id) {
                        "created"
                    } else {
                        "updated"
                    };
                    self.log.push(&record.id, OutcomeStatus::Upsert, message);
                }
                self.summary.created += result.created_records.len();
                self.summary.updated += result.updated_records.len();
                tracing::debug!(
                    "Batch {index}: upserted {} created, {} updated",
                    result.created_records.len(),
                    result.updated_records.len()
                );
                Ok(())
            }
            Err(err) => self.handle_failure(index, batch, Operation::Upsert, err),
        }
    }

    fn handle_failure(
        &mut self,
        index: usize,
        batch: &[MappedRecord],
        operation: Operation,
        err: RemoteError,
    ) -> Result<()> {
        let detail = err.to_string();
        match err.category() {
            RemoteErrorCategory::ComputedFieldWrite { field } => {
                tracing::error!("Batch {index} wrote into computed field '{field}'");
                return Err(SyncError::ComputedFieldWrite { field, detail });
            }
            RemoteErrorCategory::NonUniqueMatchKey if operation == Operation::Upsert => {
                return Err(SyncError::NonUniqueMatchKey { detail });
            }
            RemoteErrorCategory::DuplicateKeyInBatch if operation == Operation::Upsert => {
                return Err(SyncError::DuplicateKeyInBatch { detail });
            }
            _ => {}
        }

        tracing::error!(
            "Batch {index} failed to {} {} records. Use debug for more info.",
            operation.verb(),
            batch.len()
        );
        tracing::debug!("Batch {index} failure details: {detail}");

        for (offset, record) in batch.iter().enumerate() {
            let record_id = record
                .record_id
                .clone()
                .unwrap_or_else(|| format!("batch_{index}_row_{offset}"));
            self.log.push(record_id, OutcomeStatus::Error, detail.as_str());
        }
        self.summary.errors += batch.len();
        Ok(())
    }
}

/// Write all `records` in one go and return the outcome log and summary.
pub async fn sync_records<A: AirtableApi + ?Sized>(
    api: &A,
    table: TableHandle,
    load_type: LoadType,
    key_fields: Vec<String>,
    records: &[MappedRecord],
    request_batch_size: usize,
) -> Result<(OutcomeLog, SyncSummary)> {
    let mut synchronizer =
        RecordSynchronizer::new(api, table, load_type, key_fields, request_batch_size)?;
    synchronizer.sync_chunk(records).await?;
    Ok(synchronizer.finish())
}
