//! Source row → destination record mapping.

use airtable_client::Fields;
use csv_types::CsvValue;
use serde_json::Value;
use sync_core::schema::key_field_names;
use sync_core::{CellValue, ColumnConfig, InputRow, SyncError};

/// One input row ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRecord {
    /// Remote record id supplied by the source, when configured.
    pub record_id: Option<String>,
    pub fields: Fields,
}

/// Applies the configured column mapping to input rows.
///
/// Every mapped field is present in the output; missing and null-like cells
/// are written as explicit `null` so the destination field is cleared.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    columns: Vec<ColumnConfig>,
    record_id_column: Option<String>,
}

impl FieldMapper {
    pub fn new(columns: Vec<ColumnConfig>) -> sync_core::Result<Self> {
        if columns.is_empty() {
            return Err(SyncError::Configuration(
                "No columns configured. Configure at least one column mapping.".to_string(),
            ));
        }
        Ok(Self {
            columns,
            record_id_column: None,
        })
    }

    /// Read remote record ids from the given source column.
    pub fn with_record_id_column(mut self, column: Option<String>) -> Self {
        self.record_id_column = column;
        self
    }

    pub fn columns(&self) -> &[ColumnConfig] {
        &self.columns
    }

    pub fn record_id_column(&self) -> Option<&str> {
        self.record_id_column.as_deref()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.source_name.clone()).collect()
    }

    pub fn destination_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.destination_name.clone())
            .collect()
    }

    /// Destination names of the upsert key fields.
    pub fn key_fields(&self) -> Vec<String> {
        key_field_names(&self.columns)
    }

    /// A mapper limited to the given source columns, keeping configured order.
    pub fn restrict_to(&self, source_columns: &[String]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| source_columns.contains(&c.source_name))
                .cloned()
                .collect(),
            record_id_column: self.record_id_column.clone(),
        }
    }

    pub fn map_row(&self, row: &InputRow) -> MappedRecord {
        let mut fields = Fields::new();
        for column in &self.columns {
            if self.record_id_column.as_deref() == Some(column.source_name.as_str()) {
                continue;
            }
            let value = row
                .get(&column.source_name)
                .map(|cell| coerce(cell, column))
                .unwrap_or(Value::Null);
            fields.insert(column.destination_name.clone(), value);
        }

        let record_id = self
            .record_id_column
            .as_deref()
            .and_then(|column| row.get(column))
            .filter(|cell| !cell.is_null_like())
            .map(|cell| CsvValue::from(cell).into_inner().trim().to_string());

        MappedRecord { record_id, fields }
    }

    pub fn map_rows(&self, rows: &[InputRow]) -> Vec<MappedRecord> {
        rows.iter().map(|row| self.map_row(row)).collect()
    }
}

fn coerce(value: &CellValue, column: &ColumnConfig) -> Value {
    if value.is_null_like() {
        return Value::Null;
    }
    if let CellValue::Float(f) = value {
        if !f.is_finite() {
            return Value::Null;
        }
    }

    let stringify =
        column.dtype.is_text_like() || (column.is_primary_key && column.dtype.is_numeric());
    if stringify {
        Value::String(CsvValue::from(value).into_inner())
    } else {
        value.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sync_core::FieldKind;

    fn mapper() -> FieldMapper {
        FieldMapper::new(vec![
            ColumnConfig::new("id", "ID", FieldKind::Number).key(),
            ColumnConfig::new("name", "Name", FieldKind::SingleLineText),
            ColumnConfig::new("amount", "Amount", FieldKind::Number),
            ColumnConfig::new("note", "Note", FieldKind::MultilineText),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_configuration_rejected() {
        let err = FieldMapper::new(vec![]).unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn test_null_normalization() {
        let row = InputRow::new(0)
            .with("id", 1i64)
            .with("name", "   ")
            .with("amount", f64::NAN);
        let record = mapper().map_row(&row);

        assert_eq!(record.fields["Name"], Value::Null);
        assert_eq!(record.fields["Amount"], Value::Null);
        // Absent cells are still emitted
        assert_eq!(record.fields["Note"], Value::Null);
        assert_eq!(record.fields.len(), 4);
    }

    #[test]
    fn test_text_fields_are_stringified() {
        let row = InputRow::new(0).with("id", 7i64).with("name", 42i64);
        let record = mapper().map_row(&row);
        assert_eq!(record.fields["Name"], json!("42"));
    }

    #[test]
    fn test_numeric_key_fields_are_stringified() {
        let row = InputRow::new(0)
            .with("id", 1001.0f64)
            .with("amount", 12.5f64);
        let record = mapper().map_row(&row);
        assert_eq!(record.fields["ID"], json!("1001"));
        // Non-key numbers pass through
        assert_eq!(record.fields["Amount"], json!(12.5));
    }

    #[test]
    fn test_unmapped_columns_dropped() {
        let row = InputRow::new(0).with("id", 1i64).with("extra", "x");
        let record = mapper().map_row(&row);
        assert!(!record.fields.contains_key("extra"));
    }

    #[test]
    fn test_infinite_float_becomes_null() {
        let row = InputRow::new(0).with("id", 1i64).with("amount", f64::INFINITY);
        assert_eq!(mapper().map_row(&row).fields["Amount"], Value::Null);
    }

    #[test]
    fn test_record_id_column_is_not_sent() {
        let mapper = FieldMapper::new(vec![
            ColumnConfig::same_name("airtable_id", FieldKind::SingleLineText),
            ColumnConfig::same_name("Name", FieldKind::SingleLineText),
        ])
        .unwrap()
        .with_record_id_column(Some("airtable_id".into()));

        let with_id = InputRow::new(0)
            .with("airtable_id", " recABC ")
            .with("Name", "a");
        let record = mapper.map_row(&with_id);
        assert_eq!(record.record_id.as_deref(), Some("recABC"));
        assert!(!record.fields.contains_key("airtable_id"));

        let without_id = InputRow::new(1).with("airtable_id", "").with("Name", "b");
        assert_eq!(mapper.map_row(&without_id).record_id, None);
    }

    #[test]
    fn test_restrict_to_keeps_configured_order() {
        let restricted = mapper().restrict_to(&["note".into(), "id".into()]);
        assert_eq!(restricted.destination_names(), vec!["ID", "Note"]);
        assert_eq!(restricted.key_fields(), vec!["ID"]);
    }
}
