use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum GuardplotError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error(
        "Ordering violation: transaction #{current_seq} issued at {current_ms}ms \
         precedes transaction #{previous_seq} issued at {previous_ms}ms"
    )]
    OrderingViolation {
        previous_seq: u64,
        previous_ms: f64,
        current_seq: u64,
        current_ms: f64,
    },

    #[error("Missing field '{field}' in transaction #{row}")]
    MissingField { field: String, row: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl GuardplotError {
    /// Whether this error must abort the whole run.
    ///
    /// Empty groups are skipped and a missing export column only fails the
    /// CSV step; everything else is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GuardplotError::EmptyInput(_) | GuardplotError::MissingField { .. }
        )
    }
}

impl Serialize for GuardplotError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_display() {
        let err = GuardplotError::Format("missing key 'config'".to_string());
        assert_eq!(err.to_string(), "Format error: missing key 'config'");
    }

    #[test]
    fn empty_input_display_names_group() {
        let err = GuardplotError::EmptyInput("group 'all_clients' has no transactions".to_string());
        assert_eq!(
            err.to_string(),
            "Empty input: group 'all_clients' has no transactions"
        );
    }

    #[test]
    fn ordering_violation_display() {
        let err = GuardplotError::OrderingViolation {
            previous_seq: 1,
            previous_ms: 100.0,
            current_seq: 2,
            current_ms: 50.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("#2 issued at 50ms"));
        assert!(msg.contains("#1 issued at 100ms"));
    }

    #[test]
    fn missing_field_display() {
        let err = GuardplotError::MissingField {
            field: "url".to_string(),
            row: "7".to_string(),
        };
        assert_eq!(err.to_string(), "Missing field 'url' in transaction #7");
    }

    #[test]
    fn io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GuardplotError = io_err.into();
        let msg = err.to_string();
        assert!(msg.contains("IO error"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn serde_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not valid json").unwrap_err();
        let err: GuardplotError = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn fatality_classification() {
        assert!(GuardplotError::Format("x".to_string()).is_fatal());
        assert!(GuardplotError::OrderingViolation {
            previous_seq: 1,
            previous_ms: 2.0,
            current_seq: 3,
            current_ms: 1.0,
        }
        .is_fatal());
        assert!(!GuardplotError::EmptyInput("t1".to_string()).is_fatal());
        assert!(!GuardplotError::MissingField {
            field: "url".to_string(),
            row: "1".to_string(),
        }
        .is_fatal());
    }

    #[test]
    fn serialize_produces_string() {
        let err = GuardplotError::Format("bad".to_string());
        let json = serde_json::to_string(&err).expect("serialize should succeed");
        assert_eq!(json, "\"Format error: bad\"");
    }
}
