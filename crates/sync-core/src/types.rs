//! Destination field kinds.
//!
//! `FieldKind` is the closed vocabulary of Airtable field types a configured
//! column may be written as. The serialized spelling is the one the Airtable
//! metadata API uses (`singleLineText`, `multipleSelects`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target field kind of a configured column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// Single line of text
    SingleLineText,
    /// Long text
    MultilineText,
    /// Number with configurable precision
    Number,
    /// Currency amount
    Currency,
    /// Percentage
    Percent,
    /// Boolean checkbox
    Checkbox,
    /// Calendar date
    Date,
    /// Date with time of day
    DateTime,
    /// Duration in seconds
    Duration,
    /// One option from a choice list
    SingleSelect,
    /// Several options from a choice list
    MultipleSelects,
    /// E-mail address
    Email,
    /// URL
    Url,
    /// Phone number
    PhoneNumber,
    /// Auto-incrementing number assigned by the service
    AutoNumber,
}

/// Kinds Airtable accepts for the first (primary) field of a table.
pub const VALID_PRIMARY_FIELD_KINDS: [FieldKind; 5] = [
    FieldKind::SingleLineText,
    FieldKind::Email,
    FieldKind::Url,
    FieldKind::PhoneNumber,
    FieldKind::AutoNumber,
];

/// Remote field types whose values are computed by the service and reject writes.
const COMPUTED_FIELD_TYPES: &[&str] = &[
    "formula",
    "rollup",
    "count",
    "lookup",
    "multipleLookupValues",
    "autoNumber",
    "createdTime",
    "lastModifiedTime",
    "createdBy",
    "lastModifiedBy",
    "button",
];

/// Check whether a remote field type name denotes a read-only, computed field.
pub fn is_computed_field_type(type_name: &str) -> bool {
    COMPUTED_FIELD_TYPES.contains(&type_name)
}

impl FieldKind {
    /// The Airtable type name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::SingleLineText => "singleLineText",
            FieldKind::MultilineText => "multilineText",
            FieldKind::Number => "number",
            FieldKind::Currency => "currency",
            FieldKind::Percent => "percent",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::DateTime => "dateTime",
            FieldKind::Duration => "duration",
            FieldKind::SingleSelect => "singleSelect",
            FieldKind::MultipleSelects => "multipleSelects",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::PhoneNumber => "phoneNumber",
            FieldKind::AutoNumber => "autoNumber",
        }
    }

    /// Kinds whose values are always sent as strings.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            FieldKind::SingleLineText
                | FieldKind::MultilineText
                | FieldKind::Email
                | FieldKind::Url
                | FieldKind::PhoneNumber
        )
    }

    /// Number, currency and percent.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Number | FieldKind::Currency | FieldKind::Percent
        )
    }

    /// Whether the service assigns the values of this kind, so input data for
    /// it is never written.
    pub fn is_computed(&self) -> bool {
        is_computed_field_type(self.as_str())
    }

    /// Whether Airtable accepts this kind for a table's primary field.
    pub fn is_valid_primary(&self) -> bool {
        VALID_PRIMARY_FIELD_KINDS.contains(self)
    }

    /// Map an upstream storage column type onto a field kind.
    ///
    /// Unrecognized types default to [`FieldKind::SingleLineText`].
    pub fn from_source_type(source_type: &str) -> FieldKind {
        match source_type.to_ascii_uppercase().as_str() {
            "STRING" => FieldKind::SingleLineText,
            "INTEGER" | "NUMERIC" | "FLOAT" => FieldKind::Number,
            "BOOLEAN" => FieldKind::Checkbox,
            "DATE" => FieldKind::Date,
            "TIMESTAMP" => FieldKind::DateTime,
            _ => FieldKind::SingleLineText,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "singleLineText" => FieldKind::SingleLineText,
            "multilineText" => FieldKind::MultilineText,
            "number" => FieldKind::Number,
            "currency" => FieldKind::Currency,
            "percent" => FieldKind::Percent,
            "checkbox" => FieldKind::Checkbox,
            "date" => FieldKind::Date,
            "dateTime" => FieldKind::DateTime,
            "duration" => FieldKind::Duration,
            "singleSelect" => FieldKind::SingleSelect,
            "multipleSelects" => FieldKind::MultipleSelects,
            "email" => FieldKind::Email,
            "url" => FieldKind::Url,
            "phoneNumber" => FieldKind::PhoneNumber,
            "autoNumber" => FieldKind::AutoNumber,
            other => return Err(format!("Unknown field kind: {other}")),
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_spelling_matches_airtable() {
        let json = serde_json::to_string(&FieldKind::MultipleSelects).unwrap();
        assert_eq!(json, "\"multipleSelects\"");

        let kind: FieldKind = serde_json::from_str("\"phoneNumber\"").unwrap();
        assert_eq!(kind, FieldKind::PhoneNumber);

        for kind in VALID_PRIMARY_FIELD_KINDS {
            assert_eq!(kind.as_str().parse::<FieldKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_from_source_type() {
        assert_eq!(FieldKind::from_source_type("STRING"), FieldKind::SingleLineText);
        assert_eq!(FieldKind::from_source_type("INTEGER"), FieldKind::Number);
        assert_eq!(FieldKind::from_source_type("numeric"), FieldKind::Number);
        assert_eq!(FieldKind::from_source_type("FLOAT"), FieldKind::Number);
        assert_eq!(FieldKind::from_source_type("BOOLEAN"), FieldKind::Checkbox);
        assert_eq!(FieldKind::from_source_type("DATE"), FieldKind::Date);
        assert_eq!(FieldKind::from_source_type("TIMESTAMP"), FieldKind::DateTime);
        assert_eq!(FieldKind::from_source_type("VARIANT"), FieldKind::SingleLineText);
    }

    #[test]
    fn test_kind_groups() {
        assert!(FieldKind::Email.is_text_like());
        assert!(!FieldKind::Number.is_text_like());
        assert!(FieldKind::Percent.is_numeric());
        assert!(!FieldKind::Duration.is_numeric());
        assert!(FieldKind::AutoNumber.is_valid_primary());
        assert!(!FieldKind::Checkbox.is_valid_primary());
    }

    #[test]
    fn test_computed_field_types() {
        assert!(is_computed_field_type("formula"));
        assert!(is_computed_field_type("lastModifiedTime"));
        assert!(!is_computed_field_type("singleLineText"));
        assert!(FieldKind::AutoNumber.is_computed());
        assert!(!FieldKind::Number.is_computed());
    }
}
