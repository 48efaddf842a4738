//! Error taxonomy for a sync run.
//!
//! Every error that can terminate a run is a `SyncError`. User-facing
//! variants describe a usage or configuration problem and exit with status 1;
//! the rest indicate a bug or an unexpected remote failure and exit with 2.
//! Per-batch remote failures that are contained by the synchronizer never
//! become a `SyncError`; they only show up in the outcome log.

use thiserror::Error;

/// Errors that abort a sync run or an action.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing credentials or identifiers, invalid column configuration,
    /// missing key fields for an incremental load, unknown load type.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The destination table cannot be created or accessed.
    #[error("{0}")]
    Schema(String),

    /// A batch tried to write into a computed (read-only) field.
    #[error(
        "Field '{field}' is computed by Airtable and cannot be written. \
         Remove it from the column mapping. Airtable error: {detail}"
    )]
    ComputedFieldWrite { field: String, detail: String },

    /// The upsert key fields match more than one destination record.
    #[error(
        "Airtable upsert failed: the upsert key fields do not uniquely identify records \
         in the table. Make sure the combination of upsert key fields is unique for all \
         records. Airtable error: {detail}"
    )]
    NonUniqueMatchKey { detail: String },

    /// The submitted batch itself holds duplicate key values.
    #[error(
        "Airtable upsert failed: the input data contains duplicate values for the upsert \
         key. Deduplicate the upsert key fields in the source data. Airtable error: {detail}"
    )]
    DuplicateKeyInBatch { detail: String },

    /// The input table is missing or cannot be parsed.
    #[error("Input error: {0}")]
    Input(String),

    /// A remote call outside per-batch containment failed.
    #[error("Airtable request failed: {0}")]
    Remote(String),

    /// Anything unexpected.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether the error describes a usage problem rather than a bug.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, SyncError::Remote(_) | SyncError::Internal(_))
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_user_facing() {
            1
        } else {
            2
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SyncError::Configuration("x".into()).exit_code(), 1);
        assert_eq!(SyncError::Schema("x".into()).exit_code(), 1);
        assert_eq!(
            SyncError::ComputedFieldWrite {
                field: "Total".into(),
                detail: "x".into()
            }
            .exit_code(),
            1
        );
        assert_eq!(SyncError::Input("x".into()).exit_code(), 1);
        assert_eq!(SyncError::Remote("x".into()).exit_code(), 2);
        assert_eq!(SyncError::Internal(anyhow::anyhow!("boom")).exit_code(), 2);
    }

    #[test]
    fn test_computed_field_message_names_field() {
        let err = SyncError::ComputedFieldWrite {
            field: "Total billed".into(),
            detail: "INVALID_VALUE_FOR_COLUMN".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'Total billed'"));
        assert!(msg.contains("Remove it from the column mapping"));
    }
}
