//! Run records and the immutable table they are loaded into.
//!
//! A run record describes one invocation attempt of the email-summarization service. The
//! `tokensTotal` field doubles as the cache marker: `0` means the response came from the local
//! cache and no model call happened, anything above zero means the model was invoked.
//!
//! The table is read once and never mutated. Every grouping the analysis needs (single vs multi,
//! cache-served vs LLM-invoked, per batch size) is a borrowed iterator over the same rows.

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, instrument};

use crate::errors::{Error, Result};

const REQUIRED_FIELDS: [&str; 3] = ["success", "batchSize", "tokensTotal"];

/// One service invocation attempt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub success: bool,
    /// Number of emails the user selected for this interaction (1 = single-email)
    pub batch_size: i64,
    /// `0` marks a cache-served run
    pub tokens_total: f64,
    #[serde(default)]
    pub tokens_per_email: Option<f64>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    /// Emails per second
    #[serde(default)]
    pub throughput: Option<f64>,
    #[serde(default)]
    pub queue_wait_ms: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RunRecord {
    pub fn is_cache_served(&self) -> bool {
        self.tokens_total == 0.0
    }

    pub fn is_llm_invoked(&self) -> bool {
        self.tokens_total > 0.0
    }

    pub fn category(&self) -> EmailCategory {
        EmailCategory::for_batch_size(self.batch_size)
    }

    /// Parse one element of the input sequence. `index` is only used for error messages.
    fn from_json(index: usize, value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| Error::DataFormat {
            message: format!("record {index} is a {}, expected an object", json_type_name(value)),
        })?;

        for field in REQUIRED_FIELDS {
            if obj.get(field).is_none_or(Value::is_null) {
                return Err(Error::MissingField {
                    index,
                    field: field.to_string(),
                });
            }
        }

        let success: bool = field(obj, index, "success")?.unwrap_or_default();
        let batch_size = integer_field(obj, index, "batchSize")?;
        let tokens_total: f64 = field(obj, index, "tokensTotal")?.unwrap_or_default();
        if !tokens_total.is_finite() || tokens_total < 0.0 {
            return Err(Error::InvalidField {
                index,
                field: "tokensTotal".to_string(),
                message: format!("expected a non-negative number, got {tokens_total}"),
            });
        }

        Ok(Self {
            success,
            batch_size,
            tokens_total,
            tokens_per_email: field(obj, index, "tokensPerEmail")?,
            latency_ms: field(obj, index, "latencyMs")?,
            throughput: field(obj, index, "throughput")?,
            queue_wait_ms: field(obj, index, "queueWaitMs")?,
            error: field(obj, index, "error")?,
        })
    }
}

/// Deserialize an optional field; missing and `null` both map to `None`.
fn field<T: DeserializeOwned>(obj: &Map<String, Value>, index: usize, name: &str) -> Result<Option<T>> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| Error::InvalidField {
            index,
            field: name.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Integers may arrive as `2` or `2.0` depending on the producer.
fn integer_field(obj: &Map<String, Value>, index: usize, name: &str) -> Result<i64> {
    let value = obj.get(name).unwrap_or(&Value::Null);
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64).map(|f| f as i64))
        .ok_or_else(|| Error::InvalidField {
            index,
            field: name.to_string(),
            message: format!("expected an integer, got {value}"),
        })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Single-email (`batchSize == 1`) versus everything else.
///
/// Batch sizes below one are not rejected; they land in `Multi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailCategory {
    Single,
    Multi,
}

impl EmailCategory {
    pub const ALL: [EmailCategory; 2] = [EmailCategory::Single, EmailCategory::Multi];

    pub fn for_batch_size(batch_size: i64) -> Self {
        if batch_size == 1 { EmailCategory::Single } else { EmailCategory::Multi }
    }

    /// Capitalised label used on chart axes
    pub fn label(self) -> &'static str {
        match self {
            EmailCategory::Single => "Single",
            EmailCategory::Multi => "Multi",
        }
    }
}

/// Immutable, input-ordered collection of run records.
#[derive(Debug, Clone, Default)]
pub struct RunTable {
    records: Vec<RunRecord>,
}

impl RunTable {
    pub fn new(records: Vec<RunRecord>) -> Self {
        Self { records }
    }

    /// Read and parse the input file
    #[instrument(err)]
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let table = Self::from_json_str(&contents)?;
        info!(records = table.len(), "Loaded run records from {}", path.display());
        Ok(table)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(contents).map_err(|e| Error::DataFormat {
            message: format!("input is not valid JSON: {e}"),
        })?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| Error::DataFormat {
            message: format!("expected a sequence of records, got a {}", json_type_name(value)),
        })?;

        let records = items
            .iter()
            .enumerate()
            .map(|(index, item)| RunRecord::from_json(index, item))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records })
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunRecord> + '_ {
        self.records.iter()
    }

    pub fn llm_invoked(&self) -> impl Iterator<Item = &RunRecord> + '_ {
        self.iter().filter(|r| r.is_llm_invoked())
    }

    pub fn cache_served(&self) -> impl Iterator<Item = &RunRecord> + '_ {
        self.iter().filter(|r| r.is_cache_served())
    }

    pub fn in_category(&self, category: EmailCategory) -> impl Iterator<Item = &RunRecord> + '_ {
        self.iter().filter(move |r| r.category() == category)
    }

    pub fn with_batch_size(&self, batch_size: i64) -> impl Iterator<Item = &RunRecord> + '_ {
        self.iter().filter(move |r| r.batch_size == batch_size)
    }

    pub fn failed(&self) -> impl Iterator<Item = &RunRecord> + '_ {
        self.iter().filter(|r| !r.success)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &RunRecord> + '_ {
        self.iter().filter(|r| r.success)
    }
}
