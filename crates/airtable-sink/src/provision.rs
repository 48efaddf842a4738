//! Destination table lookup and creation.

use airtable_client::{AirtableApi, FieldDefinition, TableSchema};
use csv_types::CsvValue;
use serde_json::{json, Value};
use sync_core::{ColumnConfig, FieldKind, InputRow, Result, SyncError, VALID_PRIMARY_FIELD_KINDS};

/// Airtable's maximum number precision.
const MAX_PRECISION: u32 = 8;

/// Tables of one base, looked up once per run.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    base_id: String,
    tables: Vec<TableSchema>,
}

impl TableCatalog {
    /// List the base's tables.
    pub async fn load<A: AirtableApi + ?Sized>(api: &A, base_id: &str) -> Result<Self> {
        let tables = api.list_tables(base_id).await.map_err(|e| {
            SyncError::Schema(format!("Failed to list tables of base '{base_id}': {e}"))
        })?;
        tracing::debug!("Base '{}' has {} tables", base_id, tables.len());
        Ok(Self::from_tables(base_id, tables))
    }

    pub fn from_tables(base_id: impl Into<String>, tables: Vec<TableSchema>) -> Self {
        Self {
            base_id: base_id.into(),
            tables,
        }
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// Find a table by exact name.
    pub fn find(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn insert(&mut self, table: TableSchema) {
        self.tables.retain(|t| t.name != table.name);
        self.tables.push(table);
    }
}

/// Return the named table, creating it from `columns` when it does not exist.
///
/// `sample` rows are used to pick number precisions for a new table.
pub async fn provision_table<A: AirtableApi + ?Sized>(
    api: &A,
    catalog: &mut TableCatalog,
    table_name: &str,
    columns: &[ColumnConfig],
    sample: &[InputRow],
) -> Result<TableSchema> {
    if let Some(table) = catalog.find(table_name) {
        tracing::info!("Found existing table '{table_name}'");
        return Ok(table.clone());
    }

    tracing::info!("Table '{table_name}' not found in base, creating it");
    tracing::debug!(
        "Existing tables in base '{}': {:?}",
        catalog.base_id(),
        catalog.table_names()
    );
    if columns.is_empty() {
        return Err(SyncError::Configuration(
            "Column configuration is required for table creation. \
             Configure the columns before running."
                .to_string(),
        ));
    }

    let fields = build_field_definitions(columns, sample);
    let field_names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    tracing::info!("Creating table '{table_name}' with fields {field_names:?}");

    let table = api
        .create_table(catalog.base_id(), table_name, &fields)
        .await
        .map_err(|e| {
            SyncError::Schema(format!(
                "Table creation failed ({e}). Make sure the table '{table_name}' exists in \
                 your Airtable base or create it manually with the fields {field_names:?}"
            ))
        })?;

    tracing::info!("Created table '{}' ({})", table.name, table.id);
    catalog.insert(table.clone());
    Ok(table)
}

/// Field definitions for a new table.
///
/// Key columns come first in configured order, followed by the rest. The
/// first field becomes the primary field and must have a kind the service
/// accepts there; any other kind is created as single line text.
pub fn build_field_definitions(columns: &[ColumnConfig], sample: &[InputRow]) -> Vec<FieldDefinition> {
    let ordered: Vec<&ColumnConfig> = columns
        .iter()
        .filter(|c| c.is_primary_key)
        .chain(columns.iter().filter(|c| !c.is_primary_key))
        .collect();

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, column)| {
            if index == 0 && !column.dtype.is_valid_primary() {
                tracing::warn!(
                    "First field '{}' has type '{}', which Airtable does not accept for a \
                     primary field; creating it as 'singleLineText'. Valid primary types: {}",
                    column.destination_name,
                    column.dtype,
                    VALID_PRIMARY_FIELD_KINDS
                        .iter()
                        .map(FieldKind::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                return FieldDefinition {
                    name: column.destination_name.clone(),
                    field_type: FieldKind::SingleLineText.as_str().to_string(),
                    options: None,
                };
            }

            FieldDefinition {
                name: column.destination_name.clone(),
                field_type: column.dtype.as_str().to_string(),
                options: field_options(column, sample),
            }
        })
        .collect()
}

fn field_options(column: &ColumnConfig, sample: &[InputRow]) -> Option<Value> {
    match column.dtype {
        FieldKind::Number | FieldKind::Percent => {
            let precision = detect_precision(&column.source_name, sample).unwrap_or(0);
            Some(json!({ "precision": precision }))
        }
        FieldKind::Currency => {
            let precision = detect_precision(&column.source_name, sample)
                .filter(|p| *p > 0)
                .unwrap_or(2);
            Some(json!({ "precision": precision, "symbol": "$" }))
        }
        FieldKind::Date => Some(json!({
            "dateFormat": { "name": "iso", "format": "YYYY-MM-DD" }
        })),
        FieldKind::DateTime => Some(json!({
            "dateFormat": { "name": "iso", "format": "YYYY-MM-DD" },
            "timeFormat": { "name": "24hour", "format": "HH:mm" },
            "timeZone": "utc"
        })),
        FieldKind::Duration => Some(json!({ "durationFormat": "h:mm:ss" })),
        FieldKind::SingleSelect | FieldKind::MultipleSelects => Some(json!({ "choices": [] })),
        FieldKind::Checkbox => Some(json!({ "icon": "check", "color": "greenBright" })),
        _ => None,
    }
}

/// Largest number of decimal places among the column's numeric sample values,
/// capped at 8. `None` when the sample holds no numbers.
pub fn detect_precision(source_name: &str, sample: &[InputRow]) -> Option<u32> {
    sample
        .iter()
        .filter_map(|row| row.get(source_name))
        .filter_map(|cell| match cell.as_f64() {
            Some(f) => Some(f),
            None => cell.as_str().and_then(|s| s.trim().parse::<f64>().ok()),
        })
        .filter(|f| f.is_finite())
        .map(|f| decimal_places(f).min(MAX_PRECISION))
        .max()
}

fn decimal_places(value: f64) -> u32 {
    let rendered = CsvValue::from(sync_core::CellValue::Float(value)).into_inner();
    rendered
        .split_once('.')
        .map(|(_, fraction)| fraction.trim_end_matches('0').len() as u32)
        .unwrap_or(0)
}
