//! Remote failures and their classification.

use serde::Deserialize;
use thiserror::Error;

/// A failed call to the Airtable API.
///
/// `error_type` carries the service's error code (e.g. `INVALID_RECORDS`)
/// when the response body had one. Transport and decoding failures have
/// neither a status nor an error type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{message}", describe_code(.status, .error_type))]
pub struct RemoteError {
    pub status: Option<u16>,
    pub error_type: Option<String>,
    pub message: String,
}

fn describe_code(status: &Option<u16>, error_type: &Option<String>) -> String {
    match (status, error_type) {
        (Some(status), Some(code)) => format!("HTTP {status} {code}: "),
        (Some(status), None) => format!("HTTP {status}: "),
        (None, Some(code)) => format!("{code}: "),
        (None, None) => String::new(),
    }
}

/// Failure categories the synchronizer reacts to differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorCategory {
    /// A write targeted a field whose value the service computes.
    ComputedFieldWrite { field: String },
    /// An upsert key matched more than one existing record.
    NonUniqueMatchKey,
    /// One upsert batch held several records with the same key.
    DuplicateKeyInBatch,
    Other,
}

impl RemoteError {
    pub fn new(status: Option<u16>, error_type: Option<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type,
            message: message.into(),
        }
    }

    /// Error for a failure below HTTP (connection, TLS, timeout).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, None, message)
    }

    /// Error built from a non-success response.
    ///
    /// Understands both `{"error": {"type": ..., "message": ...}}` and
    /// `{"error": "NOT_FOUND"}` bodies; anything else keeps the raw body as
    /// the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: ErrorBody,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ErrorBody {
            Detailed {
                #[serde(rename = "type")]
                error_type: String,
                #[serde(default)]
                message: Option<String>,
            },
            Code(String),
        }

        match serde_json::from_str::<Envelope>(body) {
            Ok(Envelope {
                error: ErrorBody::Detailed {
                    error_type,
                    message,
                },
            }) => {
                let message = message.unwrap_or_else(|| error_type.clone());
                Self::new(Some(status), Some(error_type), message)
            }
            Ok(Envelope {
                error: ErrorBody::Code(code),
            }) => Self::new(Some(status), Some(code.clone()), code),
            Err(_) => {
                let body = body.trim();
                let message = if body.is_empty() {
                    format!("empty response body (HTTP {status})")
                } else {
                    body.to_string()
                };
                Self::new(Some(status), None, message)
            }
        }
    }

    /// Whether the service reported the table or base as missing.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
            || matches!(
                self.error_type.as_deref(),
                Some("NOT_FOUND") | Some("TABLE_NOT_FOUND") | Some("MODEL_ID_NOT_FOUND")
            )
    }

    /// Whether the token was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
            || matches!(
                self.error_type.as_deref(),
                Some("AUTHENTICATION_REQUIRED") | Some("INVALID_PERMISSIONS_OR_MODEL_NOT_FOUND")
            )
    }

    /// Classify the failure.
    ///
    /// A computed-field rejection is recognized from the message, since the
    /// service reports it under a generic code. Otherwise the error code
    /// decides, and the message is only inspected when no code is known.
    pub fn category(&self) -> RemoteErrorCategory {
        if let Some(field) = computed_field_name(&self.message) {
            return RemoteErrorCategory::ComputedFieldWrite { field };
        }

        self.error_type
            .as_deref()
            .and_then(category_for_code)
            .unwrap_or_else(|| classify_message(&self.message))
    }
}

fn category_for_code(code: &str) -> Option<RemoteErrorCategory> {
    match code {
        "INVALID_VALUE_FOR_COLUMN" => Some(RemoteErrorCategory::NonUniqueMatchKey),
        "INVALID_RECORDS" => Some(RemoteErrorCategory::DuplicateKeyInBatch),
        _ => None,
    }
}

fn classify_message(message: &str) -> RemoteErrorCategory {
    if message.contains("INVALID_VALUE_FOR_COLUMN") {
        RemoteErrorCategory::NonUniqueMatchKey
    } else if message.contains("INVALID_RECORDS") {
        RemoteErrorCategory::DuplicateKeyInBatch
    } else {
        RemoteErrorCategory::Other
    }
}

/// Extract the field name from messages such as
/// `Field "Total" cannot accept a value because the field is computed`.
fn computed_field_name(message: &str) -> Option<String> {
    if !message.to_lowercase().contains("computed") {
        return None;
    }

    let quoted = message
        .split_once('"')
        .and_then(|(_, rest)| rest.split_once('"'))
        .map(|(name, _)| name.to_string())
        .filter(|name| !name.is_empty());

    Some(quoted.unwrap_or_else(|| "unknown".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_detailed_body() {
        let err = RemoteError::from_response(
            422,
            r#"{"error":{"type":"INVALID_RECORDS","message":"Duplicate merge key"}}"#,
        );
        assert_eq!(err.status, Some(422));
        assert_eq!(err.error_type.as_deref(), Some("INVALID_RECORDS"));
        assert_eq!(err.message, "Duplicate merge key");
        assert_eq!(err.to_string(), "HTTP 422 INVALID_RECORDS: Duplicate merge key");
    }

    #[test]
    fn test_from_response_code_only_body() {
        let err = RemoteError::from_response(404, r#"{"error":"NOT_FOUND"}"#);
        assert_eq!(err.error_type.as_deref(), Some("NOT_FOUND"));
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_from_response_unstructured_body() {
        let err = RemoteError::from_response(502, "Bad Gateway");
        assert_eq!(err.error_type, None);
        assert_eq!(err.message, "Bad Gateway");

        let err = RemoteError::from_response(500, "");
        assert!(err.message.contains("empty response body"));
    }

    #[test]
    fn test_category_by_code() {
        let err = RemoteError::new(Some(422), Some("INVALID_VALUE_FOR_COLUMN".into()), "x");
        assert_eq!(err.category(), RemoteErrorCategory::NonUniqueMatchKey);

        let err = RemoteError::new(Some(422), Some("INVALID_RECORDS".into()), "x");
        assert_eq!(err.category(), RemoteErrorCategory::DuplicateKeyInBatch);

        let err = RemoteError::new(Some(422), Some("UNKNOWN_FIELD_NAME".into()), "x");
        assert_eq!(err.category(), RemoteErrorCategory::Other);
    }

    #[test]
    fn test_category_computed_field_wins_over_code() {
        let err = RemoteError::new(
            Some(422),
            Some("INVALID_VALUE_FOR_COLUMN".into()),
            r#"Field "Total" cannot accept a value because the field is computed"#,
        );
        assert_eq!(
            err.category(),
            RemoteErrorCategory::ComputedFieldWrite {
                field: "Total".into()
            }
        );

        let err = RemoteError::transport("field is computed");
        assert_eq!(
            err.category(),
            RemoteErrorCategory::ComputedFieldWrite {
                field: "unknown".into()
            }
        );
    }

    #[test]
    fn test_category_message_fallback_without_code() {
        let err = RemoteError::transport("upstream said INVALID_RECORDS");
        assert_eq!(err.category(), RemoteErrorCategory::DuplicateKeyInBatch);

        // A known code is not overridden by the message
        let err = RemoteError::new(
            Some(422),
            Some("INVALID_RECORDS".into()),
            "INVALID_VALUE_FOR_COLUMN mentioned",
        );
        assert_eq!(err.category(), RemoteErrorCategory::DuplicateKeyInBatch);

        assert_eq!(
            RemoteError::transport("connection reset").category(),
            RemoteErrorCategory::Other
        );
    }
}
