//! Reverse conversion: CSV string → CellValue.
//!
//! Cells of configured columns are parsed according to the destination field
//! kind; cells of unconfigured columns go through best-effort inference.

use sync_core::{CellValue, FieldKind};
use thiserror::Error;

/// Error type for CSV parsing failures.
#[derive(Debug, Clone, Error)]
#[error("Failed to parse '{value}' as {expected_kind}: {message}")]
pub struct CsvParseError {
    pub message: String,
    pub value: String,
    pub expected_kind: FieldKind,
}

impl CsvParseError {
    fn new(message: &str, value: &str, expected_kind: FieldKind) -> Self {
        Self {
            message: message.to_string(),
            value: value.to_string(),
            expected_kind,
        }
    }
}

/// Parse a CSV cell according to the destination field kind.
pub fn csv_string_to_cell_value(value: &str, kind: FieldKind) -> Result<CellValue, CsvParseError> {
    // Handle empty string as null for every kind
    if value.is_empty() {
        return Ok(CellValue::Null);
    }

    match kind {
        // Boolean - lenient parsing
        FieldKind::Checkbox => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "t" | "y" => Ok(CellValue::Bool(true)),
            "false" | "0" | "no" | "f" | "n" => Ok(CellValue::Bool(false)),
            "" => Ok(CellValue::Null),
            _ => Err(CsvParseError::new("Invalid boolean value", value, kind)),
        },

        FieldKind::Number | FieldKind::Currency | FieldKind::Percent => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(CellValue::Null);
            }
            parse_number(trimmed).ok_or_else(|| CsvParseError::new("Invalid number", value, kind))
        }

        // Duration - seconds, or h:mm[:ss]
        FieldKind::Duration => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(CellValue::Null);
            }
            parse_number(trimmed)
                .or_else(|| parse_duration_seconds(trimmed))
                .ok_or_else(|| {
                    CsvParseError::new("Invalid duration (expected seconds or h:mm:ss)", value, kind)
                })
        }

        // Auto numbers are assigned remotely; keep whatever the input holds
        FieldKind::AutoNumber => Ok(value
            .trim()
            .parse::<i64>()
            .map(CellValue::Int)
            .unwrap_or_else(|_| CellValue::String(value.to_string()))),

        // Multi-select - comma-separated option names
        FieldKind::MultipleSelects => Ok(CellValue::List(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )),

        // Text-like kinds, dates and single selects are sent as written
        FieldKind::SingleLineText
        | FieldKind::MultilineText
        | FieldKind::Email
        | FieldKind::Url
        | FieldKind::PhoneNumber
        | FieldKind::Date
        | FieldKind::DateTime
        | FieldKind::SingleSelect => Ok(CellValue::String(value.to_string())),
    }
}

/// Parse an integer first, then a float. NaN is kept; infinities are not numbers here.
fn parse_number(value: &str) -> Option<CellValue> {
    if let Ok(i) = value.parse::<i64>() {
        return Some(CellValue::Int(i));
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() || f.is_nan() => Some(CellValue::Float(f)),
        _ => None,
    }
}

/// Parse `h:mm` or `h:mm:ss[.fff]` into seconds.
pub fn parse_duration_seconds(value: &str) -> Option<CellValue> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let hours = parts[0].parse::<u64>().ok()?;
    let minutes = parts[1].parse::<u64>().ok()?;
    if minutes >= 60 {
        return None;
    }
    let whole = (hours * 3600 + minutes * 60) as f64;

    let seconds = match parts.get(2) {
        Some(s) => {
            let secs = s.parse::<f64>().ok()?;
            if !(0.0..60.0).contains(&secs) {
                return None;
            }
            secs
        }
        None => 0.0,
    };

    let total = whole + seconds;
    if total.fract() == 0.0 {
        Some(CellValue::Int(total as i64))
    } else {
        Some(CellValue::Float(total))
    }
}

/// Parse a CSV string without a field kind (best-effort type inference).
///
/// Tries integer, float, boolean, then falls back to string.
pub fn csv_string_to_cell_value_inferred(value: &str) -> CellValue {
    if value.is_empty() {
        return CellValue::Null;
    }

    if let Some(number) = parse_number(value) {
        return number;
    }

    match value.to_lowercase().as_str() {
        "true" => CellValue::Bool(true),
        "false" => CellValue::Bool(false),
        _ => CellValue::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_null() {
        for kind in [FieldKind::SingleLineText, FieldKind::Number, FieldKind::Checkbox] {
            assert!(csv_string_to_cell_value("", kind).unwrap().is_null());
        }
        assert!(csv_string_to_cell_value("  ", FieldKind::Number).unwrap().is_null());
    }

    #[test]
    fn test_reverse_bool() {
        for input in &["true", "TRUE", "1", "yes", "t", "Y"] {
            let result = csv_string_to_cell_value(input, FieldKind::Checkbox).unwrap();
            assert_eq!(result, CellValue::Bool(true), "input: {input}");
        }
        for input in &["false", "0", "No", "f", "n"] {
            let result = csv_string_to_cell_value(input, FieldKind::Checkbox).unwrap();
            assert_eq!(result, CellValue::Bool(false), "input: {input}");
        }
        assert!(csv_string_to_cell_value("maybe", FieldKind::Checkbox).is_err());
    }

    #[test]
    fn test_reverse_numbers() {
        assert_eq!(
            csv_string_to_cell_value("42", FieldKind::Number).unwrap(),
            CellValue::Int(42)
        );
        assert_eq!(
            csv_string_to_cell_value(" 12.50 ", FieldKind::Currency).unwrap(),
            CellValue::Float(12.5)
        );
        let nan = csv_string_to_cell_value("NaN", FieldKind::Percent).unwrap();
        assert!(nan.as_f64().unwrap().is_nan());

        let err = csv_string_to_cell_value("abc", FieldKind::Number).unwrap_err();
        assert_eq!(err.expected_kind, FieldKind::Number);
        assert!(err.to_string().contains("'abc'"));
        assert!(csv_string_to_cell_value("inf", FieldKind::Number).is_err());
    }

    #[test]
    fn test_reverse_duration() {
        assert_eq!(
            csv_string_to_cell_value("1:30:05", FieldKind::Duration).unwrap(),
            CellValue::Int(5405)
        );
        assert_eq!(
            csv_string_to_cell_value("0:02", FieldKind::Duration).unwrap(),
            CellValue::Int(120)
        );
        assert_eq!(
            csv_string_to_cell_value("90", FieldKind::Duration).unwrap(),
            CellValue::Int(90)
        );
        assert_eq!(
            csv_string_to_cell_value("0:00:01.5", FieldKind::Duration).unwrap(),
            CellValue::Float(1.5)
        );
        assert!(csv_string_to_cell_value("1:75", FieldKind::Duration).is_err());
    }

    #[test]
    fn test_reverse_multiple_selects() {
        assert_eq!(
            csv_string_to_cell_value("red, green,,blue", FieldKind::MultipleSelects).unwrap(),
            CellValue::List(vec!["red".into(), "green".into(), "blue".into()])
        );
    }

    #[test]
    fn test_reverse_text_kinds_keep_raw_string() {
        assert_eq!(
            csv_string_to_cell_value("007", FieldKind::SingleLineText).unwrap(),
            CellValue::text("007")
        );
        assert_eq!(
            csv_string_to_cell_value("2024-01-31", FieldKind::Date).unwrap(),
            CellValue::text("2024-01-31")
        );
        assert_eq!(
            csv_string_to_cell_value("  ", FieldKind::Email).unwrap(),
            CellValue::text("  ")
        );
    }

    #[test]
    fn test_reverse_inferred() {
        assert_eq!(csv_string_to_cell_value_inferred("42"), CellValue::Int(42));
        assert_eq!(csv_string_to_cell_value_inferred("3.15"), CellValue::Float(3.15));
        assert_eq!(csv_string_to_cell_value_inferred("True"), CellValue::Bool(true));
        assert_eq!(csv_string_to_cell_value_inferred("hello"), CellValue::text("hello"));
        assert_eq!(csv_string_to_cell_value_inferred("Infinity"), CellValue::text("Infinity"));
        assert!(csv_string_to_cell_value_inferred("").is_null());
    }
}
