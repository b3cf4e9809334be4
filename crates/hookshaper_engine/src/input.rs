//! Raw sample payloads to a single normalized value.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Largest integer a JavaScript number represents exactly
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-?(\d+\.?|\.\d+|\d+\.\d+)([eE][-+]?\d+)?\s*$").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Json,
    Csv,
}

impl InputKind {
    /// CSV for `.csv` files, JSON for everything else
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputKind::Csv,
            _ => InputKind::Json,
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Json => write!(f, "json"),
            InputKind::Csv => write!(f, "csv"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid CSV: row {row} has {found} fields but the header has {expected}")]
    TooManyFields {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Sample payload handed to a generated handler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedInput {
    /// A single JSON object
    Record(Map<String, Value>),
    /// Tabular rows, in source order
    RowSequence(Vec<Map<String, Value>>),
    /// Any other JSON document (array, scalar)
    Document(Value),
}

impl NormalizedInput {
    pub fn to_value(&self) -> Value {
        match self {
            NormalizedInput::Record(map) => Value::Object(map.clone()),
            NormalizedInput::RowSequence(rows) => {
                Value::Array(rows.iter().cloned().map(Value::Object).collect())
            }
            NormalizedInput::Document(value) => value.clone(),
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            NormalizedInput::RowSequence(_) => InputKind::Csv,
            NormalizedInput::Record(_) | NormalizedInput::Document(_) => InputKind::Json,
        }
    }

    /// Payloads to forward individually: one per row for tabular input,
    /// the whole document otherwise
    pub fn delivery_items(&self) -> Vec<Value> {
        match self {
            NormalizedInput::RowSequence(rows) => {
                rows.iter().cloned().map(Value::Object).collect()
            }
            other => vec![other.to_value()],
        }
    }
}

/// Parse raw sample text into a [`NormalizedInput`]
///
/// CSV input drops rows whose fields are all empty and coerces numeric and
/// boolean looking fields. Coercion is best effort, consumers must not rely
/// on it.
///
/// # Errors
/// * `ParseError::Json` - `kind` is JSON and `raw` is not valid JSON text
/// * `ParseError::Csv` / `ParseError::TooManyFields` - the CSV is structurally invalid
pub fn normalize(raw: &str, kind: InputKind) -> Result<NormalizedInput, ParseError> {
    match kind {
        InputKind::Json => {
            let value: Value = serde_json::from_str(raw)?;
            Ok(match value {
                Value::Object(map) => NormalizedInput::Record(map),
                other => NormalizedInput::Document(other),
            })
        }
        InputKind::Csv => parse_csv(raw).map(NormalizedInput::RowSequence),
    }
}

/// Header names of a CSV sample, in column order
///
/// # Errors
/// Returns an error if the header row cannot be read
pub fn csv_headers(raw: &str) -> Result<Vec<String>, ParseError> {
    let mut reader = csv_reader(raw);
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

fn csv_reader(raw: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_bytes())
}

fn parse_csv(raw: &str) -> Result<Vec<Map<String, Value>>, ParseError> {
    let mut reader = csv_reader(raw);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(ParseError::TooManyFields {
                row: idx + 1,
                found: record.len(),
                expected: headers.len(),
            });
        }

        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(key, field)| (key.to_string(), coerce_field(field)))
            .collect();

        if row.values().all(is_blank) {
            dropped += 1;
            continue;
        }
        rows.push(row);
    }

    debug!(row_count = rows.len(), dropped, "Parsed CSV input");
    Ok(rows)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Tabular-to-JSON coercion: empty to null, booleans, then numbers
fn coerce_field(field: &str) -> Value {
    match field {
        "" => Value::Null,
        "true" | "TRUE" => Value::Bool(true),
        "false" | "FALSE" => Value::Bool(false),
        _ if NUMERIC.is_match(field) => coerce_number(field.trim())
            .unwrap_or_else(|| Value::String(field.to_string())),
        _ => Value::String(field.to_string()),
    }
}

fn coerce_number(field: &str) -> Option<Value> {
    if !field.contains(['.', 'e', 'E']) {
        // integers beyond the exact range stay strings (card numbers, ids)
        return field
            .parse::<i64>()
            .ok()
            .filter(|int| (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(int))
            .map(Value::from);
    }
    let float = field.parse::<f64>().ok()?;
    if !float.is_finite() {
        return None;
    }
    serde_json::Number::from_f64(float).map(Value::Number)
}
