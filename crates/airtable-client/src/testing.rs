//! In-memory [`AirtableApi`] for tests.
//!
//! Behaves like the service for the operations the connector uses: unknown
//! fields and computed fields are rejected, upserts match on the merge fields
//! and fail on ambiguous or duplicated keys, and batches above the
//! per-request limit are refused. Every call is recorded, and individual
//! write calls can be made to fail.

use crate::error::RemoteError;
use crate::traits::AirtableApi;
use crate::types::{
    BaseInfo, FieldDefinition, FieldSchema, Fields, RecordUpdate, RemoteRecord, TableHandle,
    TableSchema, UpsertResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use sync_core::config::MAX_RECORDS_PER_REQUEST;
use sync_core::is_computed_field_type;

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    ListBases,
    ListTables {
        base_id: String,
    },
    CreateTable {
        base_id: String,
        name: String,
        fields: Vec<FieldDefinition>,
    },
    ListRecordIds {
        table_id: String,
    },
    BatchCreate {
        table_id: String,
        records: Vec<Fields>,
    },
    BatchUpdate {
        table_id: String,
        records: Vec<RecordUpdate>,
    },
    BatchUpsert {
        table_id: String,
        records: Vec<Fields>,
        key_fields: Vec<String>,
    },
    BatchDelete {
        table_id: String,
        record_ids: Vec<String>,
    },
}

impl ApiCall {
    /// Whether the call writes records (create, update, upsert).
    pub fn is_record_write(&self) -> bool {
        matches!(
            self,
            ApiCall::BatchCreate { .. } | ApiCall::BatchUpdate { .. } | ApiCall::BatchUpsert { .. }
        )
    }
}

struct StoredTable {
    base_id: String,
    schema: TableSchema,
    records: Vec<RemoteRecord>,
}

#[derive(Default)]
struct State {
    bases: Vec<BaseInfo>,
    tables: Vec<StoredTable>,
    calls: Vec<ApiCall>,
    write_failures: HashMap<usize, RemoteError>,
    writes_seen: usize,
    list_failure: Option<RemoteError>,
    create_table_failure: Option<RemoteError>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:06}", self.next_id)
    }

    fn table_mut(&mut self, table_id: &str) -> Result<&mut StoredTable, RemoteError> {
        self.tables
            .iter_mut()
            .find(|t| t.schema.id == table_id)
            .ok_or_else(|| RemoteError::new(Some(404), Some("NOT_FOUND".into()), "NOT_FOUND"))
    }

    /// Consume the failure planned for the current write call, if any.
    fn take_write_failure(&mut self) -> Option<RemoteError> {
        let ordinal = self.writes_seen;
        self.writes_seen += 1;
        self.write_failures.remove(&ordinal)
    }
}

/// In-memory service.
#[derive(Default)]
pub struct InMemoryAirtable {
    state: Mutex<State>,
}

impl InMemoryAirtable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a base.
    pub fn with_base(self, id: &str, name: &str) -> Self {
        self.lock().bases.push(BaseInfo {
            id: id.to_string(),
            name: name.to_string(),
            permission_level: Some("create".to_string()),
        });
        self
    }

    /// Add a table with `(name, type)` fields; the first field is primary.
    pub fn with_table(self, base_id: &str, name: &str, fields: &[(&str, &str)]) -> Self {
        {
            let mut state = self.lock();
            let table_id = state.next_id("tbl");
            let mut schema_fields = Vec::with_capacity(fields.len());
            for (field_name, field_type) in fields {
                let field_id = state.next_id("fld");
                schema_fields.push(FieldSchema {
                    id: field_id,
                    name: field_name.to_string(),
                    field_type: field_type.to_string(),
                    options: None,
                });
            }
            let primary_field_id = schema_fields
                .first()
                .map(|f| f.id.clone())
                .unwrap_or_default();
            state.tables.push(StoredTable {
                base_id: base_id.to_string(),
                schema: TableSchema {
                    id: table_id,
                    name: name.to_string(),
                    primary_field_id,
                    fields: schema_fields,
                },
                records: Vec::new(),
            });
        }
        self
    }

    /// Store records directly in a table, bypassing validation.
    pub fn seed_records(&self, table_name: &str, records: Vec<Fields>) -> Vec<String> {
        let mut state = self.lock();
        let ids: Vec<String> = records.iter().map(|_| state.next_id("rec")).collect();
        if let Some(table) = state.tables.iter_mut().find(|t| t.schema.name == table_name) {
            for (id, fields) in ids.iter().zip(records) {
                table.records.push(RemoteRecord {
                    id: id.clone(),
                    created_time: None,
                    fields,
                });
            }
        }
        ids
    }

    /// Make the `ordinal`-th record write (0-based, counting create, update
    /// and upsert calls) fail with `error`.
    pub fn fail_write(&self, ordinal: usize, error: RemoteError) {
        self.lock().write_failures.insert(ordinal, error);
    }

    /// Make listing record ids fail.
    pub fn fail_list_records(&self, error: RemoteError) {
        self.lock().list_failure = Some(error);
    }

    /// Make table creation fail.
    pub fn fail_create_table(&self, error: RemoteError) {
        self.lock().create_table_failure = Some(error);
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Record write calls made so far, in order.
    pub fn write_calls(&self) -> Vec<ApiCall> {
        self.calls().into_iter().filter(ApiCall::is_record_write).collect()
    }

    /// Records currently stored in the named table.
    pub fn records(&self, table_name: &str) -> Vec<RemoteRecord> {
        self.lock()
            .tables
            .iter()
            .find(|t| t.schema.name == table_name)
            .map(|t| t.records.clone())
            .unwrap_or_default()
    }

    /// Schema of the named table.
    pub fn table(&self, table_name: &str) -> Option<TableSchema> {
        self.lock()
            .tables
            .iter()
            .find(|t| t.schema.name == table_name)
            .map(|t| t.schema.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from other assertions
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn too_many_records(len: usize) -> RemoteError {
    RemoteError::new(
        Some(422),
        Some("INVALID_REQUEST_BODY".into()),
        format!("{len} records in one request, at most {MAX_RECORDS_PER_REQUEST} allowed"),
    )
}

fn validate_fields(schema: &TableSchema, fields: &Fields) -> Result<(), RemoteError> {
    for name in fields.keys() {
        let field = schema.field(name).ok_or_else(|| {
            RemoteError::new(
                Some(422),
                Some("UNKNOWN_FIELD_NAME".into()),
                format!("Unknown field name: \"{name}\""),
            )
        })?;
        if is_computed_field_type(&field.field_type) {
            return Err(RemoteError::new(
                Some(422),
                Some("INVALID_VALUE_FOR_COLUMN".into()),
                format!("Field \"{name}\" cannot accept a value because the field is computed"),
            ));
        }
    }
    Ok(())
}

fn key_of(fields: &Fields, key_fields: &[String]) -> Vec<serde_json::Value> {
    key_fields
        .iter()
        .map(|k| fields.get(k).cloned().unwrap_or(serde_json::Value::Null))
        .collect()
}

#[async_trait::async_trait]
impl AirtableApi for InMemoryAirtable {
    async fn list_bases(&self) -> Result<Vec<BaseInfo>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::ListBases);
        Ok(state.bases.clone())
    }

    async fn list_tables(&self, base_id: &str) -> Result<Vec<TableSchema>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::ListTables {
            base_id: base_id.to_string(),
        });
        if !state.bases.is_empty() && !state.bases.iter().any(|b| b.id == base_id) {
            return Err(RemoteError::new(
                Some(404),
                Some("NOT_FOUND".into()),
                "Could not find what you are looking for",
            ));
        }
        Ok(state
            .tables
            .iter()
            .filter(|t| t.base_id == base_id)
            .map(|t| t.schema.clone())
            .collect())
    }

    async fn create_table(
        &self,
        base_id: &str,
        name: &str,
        fields: &[FieldDefinition],
    ) -> Result<TableSchema, RemoteError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::CreateTable {
            base_id: base_id.to_string(),
            name: name.to_string(),
            fields: fields.to_vec(),
        });
        if let Some(err) = state.create_table_failure.take() {
            return Err(err);
        }
        if state
            .tables
            .iter()
            .any(|t| t.base_id == base_id && t.schema.name == name)
        {
            return Err(RemoteError::new(
                Some(422),
                Some("DUPLICATE_TABLE_NAME".into()),
                format!("A table named \"{name}\" already exists"),
            ));
        }

        let table_id = state.next_id("tbl");
        let mut schema_fields = Vec::with_capacity(fields.len());
        for def in fields {
            let field_id = state.next_id("fld");
            schema_fields.push(FieldSchema {
                id: field_id,
                name: def.name.clone(),
                field_type: def.field_type.clone(),
                options: def.options.clone(),
            });
        }
        let schema = TableSchema {
            id: table_id,
            name: name.to_string(),
            primary_field_id: schema_fields
                .first()
                .map(|f| f.id.clone())
                .unwrap_or_default(),
            fields: schema_fields,
        };
        state.tables.push(StoredTable {
            base_id: base_id.to_string(),
            schema: schema.clone(),
            records: Vec::new(),
        });
        Ok(schema)
    }

    async fn list_record_ids(&self, table: &TableHandle) -> Result<Vec<String>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::ListRecordIds {
            table_id: table.table_id.clone(),
        });
        if let Some(err) = state.list_failure.take() {
            return Err(err);
        }
        Ok(state
            .table_mut(&table.table_id)?
            .records
            .iter()
            .map(|r| r.id.clone())
            .collect())
    }

    async fn batch_create(
        &self,
        table: &TableHandle,
        records: &[Fields],
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::BatchCreate {
            table_id: table.table_id.clone(),
            records: records.to_vec(),
        });
        if let Some(err) = state.take_write_failure() {
            return Err(err);
        }
        if records.len() > MAX_RECORDS_PER_REQUEST {
            return Err(too_many_records(records.len()));
        }
        {
            let stored = state.table_mut(&table.table_id)?;
            for fields in records {
                validate_fields(&stored.schema, fields)?;
            }
        }

        let ids: Vec<String> = records.iter().map(|_| state.next_id("rec")).collect();
        let created: Vec<RemoteRecord> = ids
            .into_iter()
            .zip(records)
            .map(|(id, fields)| RemoteRecord {
                id,
                created_time: None,
                fields: fields.clone(),
            })
            .collect();
        state
            .table_mut(&table.table_id)?
            .records
            .extend(created.iter().cloned());
        Ok(created)
    }

    async fn batch_update(
        &self,
        table: &TableHandle,
        records: &[RecordUpdate],
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::BatchUpdate {
            table_id: table.table_id.clone(),
            records: records.to_vec(),
        });
        if let Some(err) = state.take_write_failure() {
            return Err(err);
        }
        if records.len() > MAX_RECORDS_PER_REQUEST {
            return Err(too_many_records(records.len()));
        }

        let stored = state.table_mut(&table.table_id)?;
        for update in records {
            validate_fields(&stored.schema, &update.fields)?;
            if !stored.records.iter().any(|r| r.id == update.id) {
                return Err(RemoteError::new(
                    Some(422),
                    Some("ROW_DOES_NOT_EXIST".into()),
                    format!("Record ID {} does not exist in this table", update.id),
                ));
            }
        }

        let mut updated = Vec::with_capacity(records.len());
        for update in records {
            if let Some(record) = stored.records.iter_mut().find(|r| r.id == update.id) {
                for (name, value) in &update.fields {
                    record.fields.insert(name.clone(), value.clone());
                }
                updated.push(record.clone());
            }
        }
        Ok(updated)
    }

    async fn batch_upsert(
        &self,
        table: &TableHandle,
        records: &[Fields],
        key_fields: &[String],
    ) -> Result<UpsertResult, RemoteError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::BatchUpsert {
            table_id: table.table_id.clone(),
            records: records.to_vec(),
            key_fields: key_fields.to_vec(),
        });
        if let Some(err) = state.take_write_failure() {
            return Err(err);
        }
        if records.len() > MAX_RECORDS_PER_REQUEST {
            return Err(too_many_records(records.len()));
        }

        // Validate the whole batch before touching anything
        let mut planned: Vec<Option<usize>> = Vec::with_capacity(records.len());
        {
            let stored = state.table_mut(&table.table_id)?;
            let mut seen = HashSet::new();
            for fields in records {
                validate_fields(&stored.schema, fields)?;
                let key = key_of(fields, key_fields);
                if !seen.insert(serde_json::to_string(&key).unwrap_or_default()) {
                    return Err(RemoteError::new(
                        Some(422),
                        Some("INVALID_RECORDS".into()),
                        "Records to upsert must have unique values for the fields to merge on",
                    ));
                }
                let matches: Vec<usize> = stored
                    .records
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| key_of(&r.fields, key_fields) == key)
                    .map(|(i, _)| i)
                    .collect();
                if matches.len() > 1 {
                    return Err(RemoteError::new(
                        Some(422),
                        Some("INVALID_VALUE_FOR_COLUMN".into()),
                        "Multiple existing records match the fields to merge on",
                    ));
                }
                planned.push(matches.first().copied());
            }
        }

        let new_ids: Vec<String> = planned
            .iter()
            .filter(|p| p.is_none())
            .map(|_| state.next_id("rec"))
            .collect();
        let mut new_ids = new_ids.into_iter();

        let stored = state.table_mut(&table.table_id)?;
        let mut result = UpsertResult::default();
        for (fields, target) in records.iter().zip(planned) {
            match target {
                Some(index) => {
                    let record = &mut stored.records[index];
                    for (name, value) in fields {
                        record.fields.insert(name.clone(), value.clone());
                    }
                    result.updated_records.push(record.id.clone());
                    result.records.push(record.clone());
                }
                None => {
                    let record = RemoteRecord {
                        id: new_ids.next().unwrap_or_default(),
                        created_time: None,
                        fields: fields.clone(),
                    };
                    result.created_records.push(record.id.clone());
                    result.records.push(record.clone());
                    stored.records.push(record);
                }
            }
        }
        Ok(result)
    }

    async fn batch_delete(
        &self,
        table: &TableHandle,
        record_ids: &[String],
    ) -> Result<Vec<String>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::BatchDelete {
            table_id: table.table_id.clone(),
            record_ids: record_ids.to_vec(),
        });
        if record_ids.len() > MAX_RECORDS_PER_REQUEST {
            return Err(too_many_records(record_ids.len()));
        }
        let stored = state.table_mut(&table.table_id)?;
        let before: HashSet<String> = stored.records.iter().map(|r| r.id.clone()).collect();
        stored.records.retain(|r| !record_ids.contains(&r.id));
        Ok(record_ids
            .iter()
            .filter(|id| before.contains(*id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn orders() -> (InMemoryAirtable, TableHandle) {
        let api = InMemoryAirtable::new().with_base("app1", "Sales").with_table(
            "app1",
            "Orders",
            &[("Order", "singleLineText"), ("Total", "formula")],
        );
        let schema = api.table("Orders").unwrap();
        let handle = TableHandle::new("app1", &schema);
        (api, handle)
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let (api, table) = orders();
        let keys = vec!["Order".to_string()];

        let first = api
            .batch_upsert(&table, &[fields(json!({"Order": "A"}))], &keys)
            .await
            .unwrap();
        assert_eq!(first.created_records.len(), 1);

        let second = api
            .batch_upsert(&table, &[fields(json!({"Order": "A"}))], &keys)
            .await
            .unwrap();
        assert_eq!(second.updated_records, first.created_records);
        assert_eq!(api.records("Orders").len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_duplicate_keys_in_batch() {
        let (api, table) = orders();
        let err = api
            .batch_upsert(
                &table,
                &[fields(json!({"Order": "A"})), fields(json!({"Order": "A"}))],
                &["Order".to_string()],
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_type.as_deref(), Some("INVALID_RECORDS"));
        assert!(api.records("Orders").is_empty());
    }

    #[tokio::test]
    async fn test_computed_field_rejected() {
        let (api, table) = orders();
        let err = api
            .batch_create(&table, &[fields(json!({"Order": "A", "Total": "1"}))])
            .await
            .unwrap_err();
        assert!(err.message.contains("computed"));
    }

    #[tokio::test]
    async fn test_planned_write_failure() {
        let (api, table) = orders();
        api.fail_write(1, RemoteError::transport("boom"));

        assert!(api.batch_create(&table, &[fields(json!({"Order": "A"}))]).await.is_ok());
        assert!(api.batch_create(&table, &[fields(json!({"Order": "B"}))]).await.is_err());
        assert!(api.batch_create(&table, &[fields(json!({"Order": "C"}))]).await.is_ok());
        assert_eq!(api.write_calls().len(), 3);
        assert_eq!(api.records("Orders").len(), 2);
    }
}
