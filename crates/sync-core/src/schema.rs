//! Column mapping and load semantics.
//!
//! A `ColumnConfig` ties one source column to one destination field and says
//! which kind the field is written as. `LoadType` picks the write strategy
//! for the whole run.

use crate::types::FieldKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One configured source column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Column name in the input table
    pub source_name: String,

    /// Field name in the destination table
    pub destination_name: String,

    /// Kind the destination field is written as
    pub dtype: FieldKind,

    /// Whether this field takes part in upsert matching
    #[serde(rename = "upsert_key", alias = "pk", alias = "is_primary_key", default)]
    pub is_primary_key: bool,
}

impl ColumnConfig {
    /// Create a non-key column.
    pub fn new(
        source_name: impl Into<String>,
        destination_name: impl Into<String>,
        dtype: FieldKind,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            destination_name: destination_name.into(),
            dtype,
            is_primary_key: false,
        }
    }

    /// Create a column whose source and destination names are the same.
    pub fn same_name(name: impl Into<String>, dtype: FieldKind) -> Self {
        let name = name.into();
        Self::new(name.clone(), name, dtype)
    }

    /// Mark this column as an upsert key.
    pub fn key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }
}

/// Destination names of the columns marked as upsert keys, in configured order.
pub fn key_field_names(columns: &[ColumnConfig]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| c.destination_name.clone())
        .collect()
}

/// Write strategy of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadType {
    /// Empty the destination table, then create every record
    #[serde(rename = "Full Load")]
    FullLoad,

    /// Upsert every record by the configured key fields
    #[serde(rename = "Incremental Load")]
    IncrementalLoad,

    /// Create every record
    #[default]
    #[serde(rename = "Append")]
    Append,
}

impl LoadType {
    /// The configuration spelling of this load type.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::FullLoad => "Full Load",
            LoadType::IncrementalLoad => "Incremental Load",
            LoadType::Append => "Append",
        }
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "full load" | "full" => Ok(LoadType::FullLoad),
            "incremental load" | "incremental" => Ok(LoadType::IncrementalLoad),
            "append" => Ok(LoadType::Append),
            _ => Err(format!("Unknown load type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_config_deserialize_aliases() {
        let json = r#"{"source_name":"id","destination_name":"ID","dtype":"number","upsert_key":true}"#;
        let col: ColumnConfig = serde_json::from_str(json).unwrap();
        assert!(col.is_primary_key);
        assert_eq!(col.dtype, FieldKind::Number);

        let json = r#"{"source_name":"id","destination_name":"ID","dtype":"number","pk":true}"#;
        let col: ColumnConfig = serde_json::from_str(json).unwrap();
        assert!(col.is_primary_key);

        let json = r#"{"source_name":"n","destination_name":"Name","dtype":"singleLineText"}"#;
        let col: ColumnConfig = serde_json::from_str(json).unwrap();
        assert!(!col.is_primary_key);
    }

    #[test]
    fn test_unknown_dtype_is_rejected() {
        let json = r#"{"source_name":"a","destination_name":"a","dtype":"hologram"}"#;
        assert!(serde_json::from_str::<ColumnConfig>(json).is_err());
    }

    #[test]
    fn test_load_type_spelling() {
        let lt: LoadType = serde_json::from_str("\"Incremental Load\"").unwrap();
        assert_eq!(lt, LoadType::IncrementalLoad);
        assert_eq!(serde_json::to_string(&LoadType::FullLoad).unwrap(), "\"Full Load\"");
        assert!(serde_json::from_str::<LoadType>("\"Merge\"").is_err());

        assert_eq!("full-load".parse::<LoadType>().unwrap(), LoadType::FullLoad);
        assert_eq!("Append".parse::<LoadType>().unwrap(), LoadType::Append);
        assert!("merge".parse::<LoadType>().is_err());
    }

    #[test]
    fn test_key_field_names_keep_order() {
        let cols = vec![
            ColumnConfig::same_name("b", FieldKind::Number).key(),
            ColumnConfig::same_name("a", FieldKind::SingleLineText),
            ColumnConfig::same_name("c", FieldKind::Email).key(),
        ];
        assert_eq!(key_field_names(&cols), vec!["b", "c"]);
    }
}
