//! Value representations for input rows.
//!
//! `CellValue` is the typed form of a single input cell after parsing. It can
//! carry a floating-point NaN, which JSON cannot, so it is kept separate from
//! the wire representation until the field mapper converts it.

use std::collections::HashMap;

/// A typed input cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point (may be NaN)
    Float(f64),

    /// String value
    String(String),

    /// List of option names (multi-select cells)
    List(Vec<String>),
}

impl CellValue {
    /// Create a string value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Check if this value is the explicit null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this value should be treated as missing.
    ///
    /// Null, empty or whitespace-only strings, and NaN are all null-like.
    pub fn is_null_like(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(f) => f.is_nan(),
            Self::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value for the wire.
    ///
    /// Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|s| serde_json::Value::String(s.clone()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One source row keyed by source column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRow {
    /// 0-based position of the row in the input (header excluded)
    pub row_number: u64,

    /// Cell values (column name -> value)
    pub cells: HashMap<String, CellValue>,
}

impl InputRow {
    /// Create an empty row.
    pub fn new(row_number: u64) -> Self {
        Self {
            row_number,
            cells: HashMap::new(),
        }
    }

    /// Add a cell, builder style.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(column.into(), value.into());
        self
    }

    /// Set a cell value.
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.cells.insert(column.into(), value);
    }

    /// Get a cell value by column name.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Number of cells in the row.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_like_values() {
        assert!(CellValue::Null.is_null_like());
        assert!(CellValue::text("").is_null_like());
        assert!(CellValue::text("   \t").is_null_like());
        assert!(CellValue::Float(f64::NAN).is_null_like());

        assert!(!CellValue::text("0").is_null_like());
        assert!(!CellValue::Int(0).is_null_like());
        assert!(!CellValue::Bool(false).is_null_like());
        assert!(!CellValue::Float(0.0).is_null_like());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(CellValue::Int(42).to_json(), serde_json::json!(42));
        assert_eq!(CellValue::Float(2.5).to_json(), serde_json::json!(2.5));
        assert_eq!(CellValue::Float(f64::INFINITY).to_json(), serde_json::Value::Null);
        assert_eq!(
            CellValue::List(vec!["a".into(), "b".into()]).to_json(),
            serde_json::json!(["a", "b"])
        );
    }

    #[test]
    fn test_input_row_builder() {
        let row = InputRow::new(3).with("id", 1i64).with("name", "Alice");

        assert_eq!(row.row_number, 3);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("id"), Some(&CellValue::Int(1)));
        assert_eq!(row.get("name").and_then(|v| v.as_str()), Some("Alice"));
        assert_eq!(row.get("missing"), None);
    }
}
