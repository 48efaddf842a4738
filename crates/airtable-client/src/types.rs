//! Wire types of the Airtable Web API.

use serde::{Deserialize, Serialize};

/// Field values of one record, keyed by field name.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A base visible to the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "permissionLevel", default, skip_serializing_if = "Option::is_none")]
    pub permission_level: Option<String>,
}

/// A field as reported by the metadata API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Remote type name, e.g. `singleLineText` or `formula`
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

/// A table and its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "primaryFieldId", default)]
    pub primary_field_id: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl TableSchema {
    /// Names of all fields, in table order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary field, if the service reported one.
    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.id == self.primary_field_id)
    }
}

/// A field to create along with a new table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

/// A record returned by the record API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: Fields,
}

/// A record update addressed by remote id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub id: String,
    pub fields: Fields,
}

/// Response of a batch upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpsertResult {
    #[serde(default)]
    pub records: Vec<RemoteRecord>,
    #[serde(rename = "createdRecords", default)]
    pub created_records: Vec<String>,
    #[serde(rename = "updatedRecords", default)]
    pub updated_records: Vec<String>,
}

/// Reference to the destination table for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    pub base_id: String,
    pub table_id: String,
    pub name: String,
}

impl TableHandle {
    /// Handle for a table of the given base.
    pub fn new(base_id: impl Into<String>, table: &TableSchema) -> Self {
        Self {
            base_id: base_id.into(),
            table_id: table.id.clone(),
            name: table.name.clone(),
        }
    }
}
