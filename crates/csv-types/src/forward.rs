//! Forward conversion: CellValue → CSV string.
//!
//! The same rendering is used when a value has to be stringified for a text
//! field, so a numeric `42` becomes `"42"` and `1001.0` becomes `"1001"`.

use sync_core::CellValue;

/// Wrapper for CSV string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvValue(pub String);

impl CsvValue {
    /// Get the inner CSV string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Get a reference to the inner CSV string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&CellValue> for CsvValue {
    fn from(value: &CellValue) -> Self {
        match value {
            // Null - empty string
            CellValue::Null => CsvValue(String::new()),

            CellValue::Bool(b) => CsvValue(b.to_string()),

            CellValue::Int(i) => CsvValue(i.to_string()),

            // f64 Display is the shortest round-trip form and never uses exponents
            CellValue::Float(f) => CsvValue(f.to_string()),

            CellValue::String(s) => CsvValue(s.clone()),

            CellValue::List(items) => CsvValue(items.join(", ")),
        }
    }
}

impl From<CellValue> for CsvValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::String(s) => CsvValue(s),
            other => CsvValue::from(&other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_scalars() {
        assert_eq!(CsvValue::from(CellValue::Null).as_str(), "");
        assert_eq!(CsvValue::from(CellValue::Bool(true)).as_str(), "true");
        assert_eq!(CsvValue::from(CellValue::Int(42)).as_str(), "42");
        assert_eq!(CsvValue::from(CellValue::Int(-7)).as_str(), "-7");
        assert_eq!(CsvValue::from(CellValue::text("hi")).into_inner(), "hi");
    }

    #[test]
    fn test_forward_floats() {
        assert_eq!(CsvValue::from(CellValue::Float(1001.0)).as_str(), "1001");
        assert_eq!(CsvValue::from(CellValue::Float(0.1)).as_str(), "0.1");
        assert_eq!(CsvValue::from(CellValue::Float(12.345)).as_str(), "12.345");
    }

    #[test]
    fn test_forward_list() {
        let value = CellValue::List(vec!["red".into(), "blue".into()]);
        assert_eq!(CsvValue::from(&value).as_str(), "red, blue");
    }
}
