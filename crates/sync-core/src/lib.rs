//! Core types for the airtable-sync connector.
//!
//! This crate provides the foundational types shared by every other crate
//! in the workspace:
//!
//! - [`FieldKind`] - the destination field kinds a column can be written as
//! - [`CellValue`] - a typed input cell read from the source table
//! - [`InputRow`] - one source row, keyed by source column name
//! - [`ColumnConfig`] / [`LoadType`] - the user's column mapping and load semantics
//! - [`Configuration`] - the full run configuration, loaded from JSON, YAML or TOML
//! - [`SyncError`] - the error taxonomy that decides the process exit status
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── csv-types        (CSV string <-> CellValue)
//!    ├─── airtable-client  (remote API, independent of this crate's values)
//!    ├─── airtable-sink    (mapper, reconciler, synchronizer, provisioner)
//!    └─── csv-source       (reads input, drives a run)
//! ```

pub mod config;
pub mod error;
pub mod schema;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use config::{AdvancedOptions, ConfigFile, Configuration, Destination};
pub use error::{Result, SyncError};
pub use schema::{ColumnConfig, LoadType};
pub use types::{is_computed_field_type, FieldKind, VALID_PRIMARY_FIELD_KINDS};
pub use values::{CellValue, InputRow};
