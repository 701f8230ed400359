use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::GuardplotError;
use crate::log::lookup::lookup_any;
use crate::log::model::{LogDocument, LogShape, Transaction};

/// Thread id assigned to legacy records that do not name one.
pub const LEGACY_THREAD_ID: &str = "main";

/// Keys that mark a single JSON object as a current-format log.
const CURRENT_SHAPE_KEYS: [&str; 3] = ["transactions", "apiguard_config", "config"];

// Source keys for each transaction attribute, in fallback order.
const SEQUENCE_KEYS: &[&str] = &["sequence_number"];
const THREAD_ID_KEYS: &[&str] = &["thread_id"];
const THREAD_SEQUENCE_KEYS: &[&str] = &["thread_sequence_number"];
const ISSUE_TIME_KEYS: &[&str] = &["make_request_at_ms", "request_timestamp_ms"];
const RESPONSE_TIME_KEYS: &[&str] = &["response_timestamp_ms"];
const URL_KEYS: &[&str] = &["url"];
const CLIENT_DELAY_KEYS: &[&str] = &["delay_ms"];
const SERVER_DELAY_KEYS: &[&str] = &["server_side_delay"];
const RATE_KEYS: &[&str] = &["current_req_per_min"];

/// Read a load-test log from disk and parse it with [`parse_log`].
pub async fn read_log(path: impl AsRef<Path>) -> Result<LogDocument, GuardplotError> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_log(&content)
}

/// Parse the text of a load-test log in either supported shape.
///
/// A single JSON object carrying any of `transactions`, `apiguard_config` or
/// `config` is treated as a current-format log and must be complete. Anything
/// else is read line by line as a legacy log, skipping lines that do not parse.
/// Text that names a current-format key but is neither valid JSON nor yields
/// any legacy record is a broken current-format log and fails to parse.
pub fn parse_log(content: &str) -> Result<LogDocument, GuardplotError> {
    if content.trim_start().starts_with('{') {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(root)) if CURRENT_SHAPE_KEYS.iter().any(|k| root.contains_key(*k)) => {
                return parse_current(root);
            }
            Ok(_) => {}
            Err(err) => {
                let doc = parse_legacy(content);
                if doc.is_empty() && names_current_shape_key(content) {
                    return Err(GuardplotError::Format(format!(
                        "current-format log is not valid JSON: {err}"
                    )));
                }
                return Ok(doc);
            }
        }
    }
    Ok(parse_legacy(content))
}

fn names_current_shape_key(content: &str) -> bool {
    CURRENT_SHAPE_KEYS
        .iter()
        .any(|key| content.contains(&format!("\"{key}\"")))
}

fn parse_current(mut root: Map<String, Value>) -> Result<LogDocument, GuardplotError> {
    let records = match root.remove("transactions") {
        Some(Value::Array(records)) => records,
        Some(_) => {
            return Err(GuardplotError::Format(
                "'transactions' must be an array".to_string(),
            ))
        }
        None => {
            return Err(GuardplotError::Format(
                "missing required key 'transactions'".to_string(),
            ))
        }
    };
    let server_config = root.remove("apiguard_config").ok_or_else(|| {
        GuardplotError::Format("missing required key 'apiguard_config'".to_string())
    })?;
    let client_config = root
        .remove("config")
        .ok_or_else(|| GuardplotError::Format("missing required key 'config'".to_string()))?;

    let transactions = records
        .into_iter()
        .enumerate()
        .map(|(index, raw)| parse_transaction(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::with_capacity(transactions.len());
    for tx in &transactions {
        if !seen.insert(tx.global_sequence_number) {
            return Err(GuardplotError::Format(format!(
                "duplicate sequence_number {}",
                tx.global_sequence_number
            )));
        }
    }

    tracing::debug!(count = transactions.len(), "parsed current-format log");

    Ok(LogDocument {
        shape: LogShape::Current,
        transactions,
        server_config,
        client_config,
    })
}

fn parse_transaction(index: usize, raw: Value) -> Result<Transaction, GuardplotError> {
    if !raw.is_object() {
        return Err(GuardplotError::Format(format!(
            "transaction {index} is not a JSON object"
        )));
    }

    let global_sequence_number = required_u64(&raw, SEQUENCE_KEYS, index)?;
    let thread_id = match lookup_any(&raw, THREAD_ID_KEYS) {
        Some(value) => thread_id_from(value).ok_or_else(|| {
            GuardplotError::Format(format!(
                "transaction {index}: 'thread_id' must be a string or integer"
            ))
        })?,
        None => {
            return Err(GuardplotError::Format(format!(
                "transaction {index}: missing required field 'thread_id'"
            )))
        }
    };
    let thread_sequence_number = required_u64(&raw, THREAD_SEQUENCE_KEYS, index)?;

    Ok(Transaction {
        global_sequence_number,
        thread_id,
        thread_sequence_number,
        request_issue_time_ms: optional_f64(&raw, ISSUE_TIME_KEYS, index)?,
        response_time_ms: optional_f64(&raw, RESPONSE_TIME_KEYS, index)?,
        url: optional_string(&raw, URL_KEYS, index)?,
        client_measured_delay_ms: optional_f64(&raw, CLIENT_DELAY_KEYS, index)?,
        server_reported_delay_ms: optional_f64(&raw, SERVER_DELAY_KEYS, index)?,
        current_requests_per_minute: optional_f64(&raw, RATE_KEYS, index)?,
        raw,
    })
}

fn parse_legacy(content: &str) -> LogDocument {
    let mut transactions = Vec::new();
    let mut skipped = 0usize;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match legacy_transaction(line, transactions.len() as u64 + 1) {
            Some(tx) => transactions.push(tx),
            None => skipped += 1,
        }
    }

    tracing::debug!(
        kept = transactions.len(),
        skipped,
        "parsed legacy line-delimited log"
    );

    LogDocument {
        shape: LogShape::Legacy,
        transactions,
        server_config: Value::Null,
        client_config: Value::Null,
    }
}

/// Build a transaction from one legacy line, or `None` if the line is unusable.
///
/// `position` is the 1-based position among kept records and stands in for
/// sequence numbers the record does not carry.
fn legacy_transaction(line: &str, position: u64) -> Option<Transaction> {
    let raw: Value = serde_json::from_str(line).ok()?;
    if !raw.is_object() {
        return None;
    }
    let server_delay = lookup_any(&raw, SERVER_DELAY_KEYS)?.as_f64()?;

    // Legacy records are best-effort: a field of the wrong type is treated as absent.
    let lenient_f64 = |keys: &[&str]| lookup_any(&raw, keys).and_then(Value::as_f64);

    Some(Transaction {
        global_sequence_number: lookup_any(&raw, SEQUENCE_KEYS)
            .and_then(Value::as_u64)
            .unwrap_or(position),
        thread_id: lookup_any(&raw, THREAD_ID_KEYS)
            .and_then(thread_id_from)
            .unwrap_or_else(|| LEGACY_THREAD_ID.to_string()),
        thread_sequence_number: lookup_any(&raw, THREAD_SEQUENCE_KEYS)
            .and_then(Value::as_u64)
            .unwrap_or(position),
        request_issue_time_ms: lenient_f64(ISSUE_TIME_KEYS),
        response_time_ms: lenient_f64(RESPONSE_TIME_KEYS),
        url: lookup_any(&raw, URL_KEYS)
            .and_then(Value::as_str)
            .map(str::to_string),
        client_measured_delay_ms: lenient_f64(CLIENT_DELAY_KEYS),
        server_reported_delay_ms: Some(server_delay),
        current_requests_per_minute: lenient_f64(RATE_KEYS),
        raw,
    })
}

// ---------------------------------------------------------------------------
// Field coercion helpers
// ---------------------------------------------------------------------------

fn thread_id_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn required_u64(raw: &Value, keys: &[&str], index: usize) -> Result<u64, GuardplotError> {
    match lookup_any(raw, keys) {
        Some(value) => value.as_u64().ok_or_else(|| {
            GuardplotError::Format(format!(
                "transaction {index}: '{}' must be a non-negative integer",
                keys[0]
            ))
        }),
        None => Err(GuardplotError::Format(format!(
            "transaction {index}: missing required field '{}'",
            keys[0]
        ))),
    }
}

fn optional_f64(raw: &Value, keys: &[&str], index: usize) -> Result<Option<f64>, GuardplotError> {
    match lookup_any(raw, keys) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            GuardplotError::Format(format!(
                "transaction {index}: '{}' must be a number",
                keys[0]
            ))
        }),
    }
}

fn optional_string(
    raw: &Value,
    keys: &[&str],
    index: usize,
) -> Result<Option<String>, GuardplotError> {
    match lookup_any(raw, keys) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(GuardplotError::Format(format!(
            "transaction {index}: '{}' must be a string",
            keys[0]
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn current_log(transactions: Value) -> String {
        json!({
            "transactions": transactions,
            "apiguard_config": { "max_requests_per_minute": 600 },
            "config": { "threads": 2 },
        })
        .to_string()
    }

    // -----------------------------------------------------------------------
    // Current shape
    // -----------------------------------------------------------------------

    #[test]
    fn current_shape_reads_nested_fields() {
        let text = current_log(json!([
            {
                "sequence_number": 1,
                "thread_id": "t1",
                "thread_sequence_number": 1,
                "request": {
                    "url": "http://api/x",
                    "make_request_at_ms": 1000.5,
                    "request_timestamp_ms": 1001,
                    "delay_ms": 0,
                },
                "response": {
                    "response_timestamp_ms": 1040,
                    "server_side_delay": 42,
                    "current_req_per_min": 120.0,
                },
            }
        ]));

        let doc = parse_log(&text).expect("current log should parse");
        assert_eq!(doc.shape, LogShape::Current);
        assert_eq!(doc.len(), 1);

        let tx = &doc.transactions[0];
        assert_eq!(tx.global_sequence_number, 1);
        assert_eq!(tx.thread_id, "t1");
        assert_eq!(tx.request_issue_time_ms, Some(1000.5));
        assert_eq!(tx.response_time_ms, Some(1040.0));
        assert_eq!(tx.url.as_deref(), Some("http://api/x"));
        assert_eq!(tx.client_measured_delay_ms, Some(0.0));
        assert_eq!(tx.server_reported_delay_ms, Some(42.0));
        assert_eq!(tx.current_requests_per_minute, Some(120.0));
        assert_eq!(doc.server_config["max_requests_per_minute"], 600);
        assert_eq!(doc.client_config["threads"], 2);
    }

    #[test]
    fn issue_time_falls_back_to_request_timestamp() {
        let text = current_log(json!([
            { "sequence_number": 3, "thread_id": 9, "thread_sequence_number": 1,
              "request": { "request_timestamp_ms": 250 } }
        ]));
        let doc = parse_log(&text).expect("should parse");
        assert_eq!(doc.transactions[0].request_issue_time_ms, Some(250.0));
        assert_eq!(doc.transactions[0].thread_id, "9");
    }

    #[test]
    fn config_blobs_are_echoed_verbatim() {
        let text = json!({
            "transactions": [],
            "apiguard_config": [1, "two", null],
            "config": "opaque",
        })
        .to_string();
        let doc = parse_log(&text).expect("should parse");
        assert_eq!(doc.server_config, json!([1, "two", null]));
        assert_eq!(doc.client_config, json!("opaque"));
        assert!(doc.is_empty());
    }

    #[test]
    fn missing_config_key_is_format_error() {
        let text = json!({ "transactions": [], "apiguard_config": {} }).to_string();
        let err = parse_log(&text).unwrap_err();
        assert!(matches!(err, GuardplotError::Format(ref m) if m.contains("'config'")));
    }

    #[test]
    fn truncated_current_log_is_format_error() {
        let text = "{\n \"apiguard_config\": {},\n \"config\": {},\n \"transactions\": [\n {\"sequence_number\": 1,\n";
        let err = parse_log(text).unwrap_err();
        assert!(matches!(err, GuardplotError::Format(ref m) if m.contains("not valid JSON")));
        assert!(err.is_fatal());
    }

    #[test]
    fn duplicate_sequence_number_is_format_error() {
        let text = current_log(json!([
            { "sequence_number": 4, "thread_id": "a", "thread_sequence_number": 1 },
            { "sequence_number": 4, "thread_id": "b", "thread_sequence_number": 1 },
        ]));
        let err = parse_log(&text).unwrap_err();
        assert!(matches!(err, GuardplotError::Format(ref m) if m.contains("duplicate sequence_number 4")));
    }

    #[test]
    fn missing_transactions_key_is_format_error() {
        let text = json!({ "apiguard_config": {}, "config": {} }).to_string();
        let err = parse_log(&text).unwrap_err();
        assert!(matches!(err, GuardplotError::Format(ref m) if m.contains("'transactions'")));
    }

    #[test]
    fn non_array_transactions_is_format_error() {
        let text = json!({ "transactions": {}, "apiguard_config": {}, "config": {} }).to_string();
        assert!(matches!(parse_log(&text), Err(GuardplotError::Format(_))));
    }

    #[test]
    fn transaction_without_thread_id_is_format_error() {
        let text = current_log(json!([{ "sequence_number": 1, "thread_sequence_number": 1 }]));
        let err = parse_log(&text).unwrap_err();
        assert!(err.to_string().contains("thread_id"));
    }

    #[test]
    fn wrongly_typed_number_is_format_error() {
        let text = current_log(json!([
            { "sequence_number": 1, "thread_id": "a", "thread_sequence_number": 1,
              "server_side_delay": "slow" }
        ]));
        let err = parse_log(&text).unwrap_err();
        assert!(err.to_string().contains("server_side_delay"));
    }

    // -----------------------------------------------------------------------
    // Legacy shape
    // -----------------------------------------------------------------------

    #[test]
    fn legacy_lines_are_read_and_malformed_ones_skipped() {
        let text = concat!(
            "{\"server_side_delay\": 12.5}\n",
            "this is not json\n",
            "\n",
            "{\"server_side_delay\": 30, \"url\": \"http://api\"}\n",
            "{\"other\": 1}\n",
            "[1, 2]\n",
            "{\"server_side_delay\": null}\n",
        );
        let doc = parse_log(text).expect("legacy log never fails");
        assert_eq!(doc.shape, LogShape::Legacy);
        assert_eq!(doc.len(), 2);

        let delays: Vec<_> = doc
            .transactions
            .iter()
            .map(|t| t.server_reported_delay_ms)
            .collect();
        assert_eq!(delays, vec![Some(12.5), Some(30.0)]);

        assert_eq!(doc.transactions[1].global_sequence_number, 2);
        assert_eq!(doc.transactions[1].thread_sequence_number, 2);
        assert_eq!(doc.transactions[1].thread_id, LEGACY_THREAD_ID);
        assert_eq!(doc.transactions[1].url.as_deref(), Some("http://api"));
        assert!(doc.server_config.is_null());
        assert!(doc.client_config.is_null());
    }

    #[test]
    fn single_legacy_record_is_not_mistaken_for_current_shape() {
        let doc = parse_log("{\"server_side_delay\": 7}").expect("should parse");
        assert_eq!(doc.shape, LogShape::Legacy);
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn empty_input_yields_empty_legacy_document() {
        let doc = parse_log("").expect("should parse");
        assert_eq!(doc.shape, LogShape::Legacy);
        assert!(doc.is_empty());
    }

    // -----------------------------------------------------------------------
    // read_log
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn read_log_from_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("run.json");
        let text = current_log(json!([
            { "sequence_number": 1, "thread_id": "a", "thread_sequence_number": 1 }
        ]));
        tokio::fs::write(&path, text)
            .await
            .expect("writing log should succeed");

        let doc = read_log(&path).await.expect("read_log should succeed");
        assert_eq!(doc.len(), 1);
    }

    #[tokio::test]
    async fn read_log_error_for_nonexistent_file() {
        let result = read_log("/nonexistent/path/run.json").await;
        assert!(matches!(result, Err(GuardplotError::Io(_))));
    }
}
