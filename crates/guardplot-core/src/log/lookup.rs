use serde_json::Value;

/// A place inside a raw transaction object where a field may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    /// The transaction object itself.
    TopLevel,
    /// The nested `request` object.
    Request,
    /// The nested `response` object.
    Response,
}

/// Resolution order used for every field.
pub const LOOKUP_ORDER: [LookupSource; 3] = [
    LookupSource::TopLevel,
    LookupSource::Request,
    LookupSource::Response,
];

impl LookupSource {
    fn scope<'a>(self, record: &'a Value) -> Option<&'a Value> {
        match self {
            LookupSource::TopLevel => Some(record),
            LookupSource::Request => record.get("request"),
            LookupSource::Response => record.get("response"),
        }
    }
}

/// Resolve `key` against `record`, trying each source in [`LOOKUP_ORDER`].
///
/// A key that is present with a JSON `null` value counts as found.
pub fn lookup<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    LOOKUP_ORDER
        .iter()
        .filter_map(|source| source.scope(record))
        .find_map(|scope| scope.get(key))
}

/// Resolve the first of `keys` that is present anywhere in `record`.
///
/// Keys are tried in order; each key is tried across all sources before
/// falling back to the next key.
pub fn lookup_any<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| lookup(record, key))
}

/// Render a raw JSON value as a flat table cell.
///
/// Strings are written without quotes, `null` becomes an empty cell and
/// everything else uses its JSON text.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
