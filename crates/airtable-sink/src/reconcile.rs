//! Input columns vs. destination table fields.

use crate::mapper::FieldMapper;
use airtable_client::TableSchema;
use sync_core::is_computed_field_type;

/// Result of comparing the mapping with the input and the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Source columns that can be written this run, in configured order.
    pub usable_columns: Vec<String>,
    /// Mapped destination fields the table does not have.
    pub missing_in_table: Vec<String>,
    /// Configured source columns the input does not have.
    pub missing_in_input: Vec<String>,
    /// Input columns without a mapping.
    pub unmapped_input: Vec<String>,
    /// Mapped destination fields whose values the service computes; never written.
    pub computed_fields: Vec<String>,
}

impl SchemaReport {
    pub fn has_drift(&self) -> bool {
        !self.missing_in_table.is_empty() || !self.missing_in_input.is_empty()
    }
}

/// Compare the mapper against the input columns and the table's fields.
///
/// Columns whose destination field is missing or computed are dropped for
/// this run; the table is never altered. Drift is reported through `tracing`.
pub fn reconcile(input_columns: &[String], mapper: &FieldMapper, table: &TableSchema) -> SchemaReport {
    let mut report = SchemaReport::default();

    for column in mapper.columns() {
        let in_input = input_columns.contains(&column.source_name);
        let field = table.field(&column.destination_name);

        if !in_input {
            report.missing_in_input.push(column.source_name.clone());
        }
        let writable = match field {
            None => {
                report.missing_in_table.push(column.destination_name.clone());
                false
            }
            Some(field) if is_computed_field_type(&field.field_type) => {
                report.computed_fields.push(column.destination_name.clone());
                false
            }
            Some(_) => true,
        };
        if in_input && writable {
            report.usable_columns.push(column.source_name.clone());
        }
    }

    let mapped_sources = mapper.source_names();
    report.unmapped_input = input_columns
        .iter()
        .filter(|c| !mapped_sources.contains(c))
        .filter(|c| mapper.record_id_column() != Some(c.as_str()))
        .cloned()
        .collect();

    if !report.missing_in_table.is_empty() {
        tracing::warn!(
            "Fields {:?} are not present in table '{}'; their data will not be written",
            report.missing_in_table,
            table.name
        );
    }
    if !report.missing_in_input.is_empty() {
        tracing::warn!(
            "Configured columns {:?} are missing from the input table",
            report.missing_in_input
        );
    }
    if !report.computed_fields.is_empty() {
        tracing::warn!(
            "Fields {:?} are computed by Airtable; their data will not be written",
            report.computed_fields
        );
    }
    if !report.unmapped_input.is_empty() {
        tracing::debug!("Ignoring unmapped input columns {:?}", report.unmapped_input);
    }
    tracing::debug!("Usable columns: {:?}", report.usable_columns);

    report
}
