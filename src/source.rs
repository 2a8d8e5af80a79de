//! Raw record sources
//!
//! The core never fetches anything itself. A [`RecordSource`] hands it the
//! already-materialized raw collection for one data kind. This module ships
//! a directory-backed source with an explicit kind-to-file mapping and an
//! in-memory source, plus the parser that turns export file contents into a
//! list of raw records.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::IngestError;
use crate::types::DataKind;

/// Envelope keys that wrap the record array in some exports
const ENVELOPE_KEYS: &[&str] = &["heartRateValues", "data", "readings"];

/// Trait for raw record providers
pub trait RecordSource {
    /// Fetch the raw records for one data kind
    fn fetch(&self, kind: DataKind) -> Result<Vec<Value>, IngestError>;
}

/// File name for each data kind, relative to a source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub sleep: PathBuf,
    pub activity: PathBuf,
    pub heart_rate: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            sleep: PathBuf::from("sleep-data.json"),
            activity: PathBuf::from("activities-data.json"),
            heart_rate: PathBuf::from("heart-rate-data.json"),
        }
    }
}

impl SourcePaths {
    pub fn for_kind(&self, kind: DataKind) -> &Path {
        match kind {
            DataKind::Sleep => &self.sleep,
            DataKind::Activity => &self.activity,
            DataKind::HeartRate => &self.heart_rate,
        }
    }
}

/// Reads export files from a local directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    paths: SourcePaths,
}

impl DirectorySource {
    /// Create a source using the default export file names
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_paths(root, SourcePaths::default())
    }

    pub fn with_paths(root: impl Into<PathBuf>, paths: SourcePaths) -> Self {
        Self {
            root: root.into(),
            paths,
        }
    }

    /// Full path of the file backing a data kind
    pub fn path_for(&self, kind: DataKind) -> PathBuf {
        self.root.join(self.paths.for_kind(kind))
    }
}

impl RecordSource for DirectorySource {
    fn fetch(&self, kind: DataKind) -> Result<Vec<Value>, IngestError> {
        let path = self.path_for(kind);
        if !path.is_file() {
            return Err(IngestError::DataUnavailable(format!(
                "{} data file not found: {}",
                kind,
                path.display()
            )));
        }

        debug!(%kind, path = %path.display(), "reading export file");
        let contents = fs::read_to_string(&path)?;
        parse_collection(&contents, kind)
    }
}

/// Holds pre-fetched raw collections
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collections: HashMap<DataKind, Vec<Value>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, kind: DataKind, records: Vec<Value>) -> Self {
        self.collections.insert(kind, records);
        self
    }
}

impl RecordSource for MemorySource {
    fn fetch(&self, kind: DataKind) -> Result<Vec<Value>, IngestError> {
        self.collections
            .get(&kind)
            .cloned()
            .ok_or_else(|| IngestError::DataUnavailable(format!("no {kind} data loaded")))
    }
}

/// Parse export file contents into raw records.
///
/// Accepts a JSON array, an envelope object carrying the array under one of
/// the known keys, a single record object, or NDJSON. Heart-rate samples
/// stored as `[timestamp, bpm]` pairs are expanded into objects.
pub fn parse_collection(text: &str, kind: DataKind) -> Result<Vec<Value>, IngestError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let items = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(object)) => unwrap_envelope(object, kind),
        Ok(other) => {
            return Err(IngestError::DataUnavailable(format!(
                "expected an array of {kind} records, found {}",
                json_type(&other)
            )))
        }
        // A broken array is one malformed document, not NDJSON
        Err(e) if trimmed.starts_with('[') => return Err(e.into()),
        // Not a single document; try one record per line
        Err(_) => parse_ndjson(trimmed)?,
    };

    Ok(match kind {
        DataKind::HeartRate => items.into_iter().map(expand_heart_rate_pair).collect(),
        _ => items,
    })
}

/// Parse NDJSON (newline-delimited JSON) into raw records
pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Value>, IngestError> {
    let mut records = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => records.push(value),
            Err(e) => {
                return Err(IngestError::DataUnavailable(format!(
                    "failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(records)
}

/// Take the record array out of an envelope object. An object without one
/// is a single record (a one-line NDJSON file parses this way).
fn unwrap_envelope(mut object: Map<String, Value>, kind: DataKind) -> Vec<Value> {
    let key = ENVELOPE_KEYS
        .iter()
        .find(|key| matches!(object.get(**key), Some(Value::Array(_))));

    if let Some(key) = key {
        if let Some(Value::Array(items)) = object.remove(*key) {
            debug!(%kind, envelope = *key, "unwrapped record array");
            return items;
        }
    }
    vec![Value::Object(object)]
}

fn expand_heart_rate_pair(item: Value) -> Value {
    match item {
        Value::Array(pair) if pair.len() == 2 => {
            let mut pair = pair.into_iter();
            let mut record = Map::new();
            record.insert("timestamp".to_string(), pair.next().unwrap_or(Value::Null));
            record.insert("heartRate".to_string(), pair.next().unwrap_or(Value::Null));
            Value::Object(record)
        }
        other => other,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
