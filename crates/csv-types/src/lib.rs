//! CSV type conversions for sync-core values.
//!
//! This crate provides bidirectional conversions between sync-core's
//! `CellValue` and CSV string cells.
//!
//! # Modules
//!
//! - [`forward`] - CellValue → CSV string conversion
//! - [`reverse`] - CSV string → CellValue conversion
//!
//! # Example
//!
//! ```
//! use csv_types::{csv_string_to_cell_value, CsvValue};
//! use sync_core::{CellValue, FieldKind};
//!
//! // Reverse: CSV string → CellValue, guided by the destination field kind
//! let value = csv_string_to_cell_value("42", FieldKind::Number).unwrap();
//! assert_eq!(value, CellValue::Int(42));
//!
//! // Forward: CellValue → CSV string
//! assert_eq!(CsvValue::from(&value).as_str(), "42");
//! ```

pub mod forward;
pub mod reverse;

pub use forward::CsvValue;
pub use reverse::{
    csv_string_to_cell_value, csv_string_to_cell_value_inferred, parse_duration_seconds,
    CsvParseError,
};
