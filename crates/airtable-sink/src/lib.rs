//! Airtable sink for airtable-sync.
//!
//! Everything between typed input rows and remote writes:
//!
//! - [`FieldMapper`] - source row → destination record, with null
//!   normalization and stringification of text and numeric key fields
//! - [`reconcile`] - mapping vs. input columns vs. table fields
//! - [`partition`] - fixed-size batching
//! - [`RecordSynchronizer`] - per-batch create/update/upsert with failure
//!   containment, producing an [`OutcomeLog`]
//! - [`clear_table`] - full-load table clearing
//! - [`TableCatalog`] / [`provision_table`] - destination table lookup and
//!   creation
//!
//! The sink is written against [`airtable_client::AirtableApi`], so the
//! same code drives the HTTP client and the in-memory implementation.

mod batch;
mod clear;
mod mapper;
mod outcome;
mod provision;
mod reconcile;
mod synchronizer;

pub use batch::partition;
pub use clear::clear_table;
pub use mapper::{FieldMapper, MappedRecord};
pub use outcome::{OutcomeLog, OutcomeRow, OutcomeStatus};
pub use provision::{build_field_definitions, detect_precision, provision_table, TableCatalog};
pub use reconcile::{reconcile, SchemaReport};
pub use synchronizer::{sync_records, RecordSynchronizer, SyncSummary};
