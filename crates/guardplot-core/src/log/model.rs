use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// LogShape
// ---------------------------------------------------------------------------

/// The on-disk layout a log was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogShape {
    /// Newline-delimited flat JSON records carrying `server_side_delay`.
    Legacy,
    /// A single object with `transactions`, `apiguard_config` and `config`.
    Current,
}

impl std::fmt::Display for LogShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogShape::Legacy => "legacy",
            LogShape::Current => "current",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// One request/response pair issued by a client thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    /// Canonical position across all threads.
    pub global_sequence_number: u64,
    pub thread_id: String,
    /// Position within the issuing thread.
    pub thread_sequence_number: u64,
    /// Wall-clock time (ms) at which the client decided to send.
    pub request_issue_time_ms: Option<f64>,
    pub response_time_ms: Option<f64>,
    pub url: Option<String>,
    /// Client-side timer delay. Zero means the timer was not used.
    pub client_measured_delay_ms: Option<f64>,
    pub server_reported_delay_ms: Option<f64>,
    /// The server's live estimate of this client's request rate.
    pub current_requests_per_minute: Option<f64>,
    /// The record exactly as it appeared in the log, used for tabular export.
    #[serde(default, skip_serializing)]
    pub raw: Value,
}

// ---------------------------------------------------------------------------
// LogDocument
// ---------------------------------------------------------------------------

/// A fully loaded log: every transaction plus the two echoed config blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LogDocument {
    pub shape: LogShape,
    pub transactions: Vec<Transaction>,
    /// `apiguard_config` from the log, echoed verbatim. `null` for legacy logs.
    pub server_config: Value,
    /// `config` from the log, echoed verbatim. `null` for legacy logs.
    pub client_config: Value,
}

impl LogDocument {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_display() {
        assert_eq!(LogShape::Legacy.to_string(), "legacy");
        assert_eq!(LogShape::Current.to_string(), "current");
    }

    #[test]
    fn shape_serializes_snake_case() {
        let json = serde_json::to_string(&LogShape::Current).expect("serialize");
        assert_eq!(json, "\"current\"");
    }

    #[test]
    fn transaction_serialization_omits_raw_record() {
        let tx = Transaction {
            global_sequence_number: 1,
            thread_id: "t1".to_string(),
            thread_sequence_number: 1,
            request_issue_time_ms: Some(100.0),
            response_time_ms: None,
            url: None,
            client_measured_delay_ms: None,
            server_reported_delay_ms: Some(4.0),
            current_requests_per_minute: None,
            raw: serde_json::json!({ "secret": true }),
        };
        let json = serde_json::to_string(&tx).expect("serialize");
        assert!(json.contains("\"thread_id\":\"t1\""));
        assert!(!json.contains("secret"));
    }
}
