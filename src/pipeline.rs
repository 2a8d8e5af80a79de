//! Pipeline orchestration
//!
//! This module provides the public API for wear-ingest: pick a device, hand
//! over raw records (or a source that can fetch them) and get canonical
//! records back.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::IngestConfig;
use crate::devices::DeviceModel;
use crate::error::IngestError;
use crate::processor::{BatchProcessor, CanonicalBatch, SkippedRecord};
use crate::source::{parse_collection, DirectorySource, RecordSource};
use crate::types::DataKind;

/// Map a raw collection of one kind with the given device's mapper.
///
/// # Example
/// ```ignore
/// let batch = normalize(DeviceModel::Forerunner235, DataKind::Sleep, &raw_records);
/// ```
pub fn normalize(model: DeviceModel, kind: DataKind, raw: &[Value]) -> CanonicalBatch {
    BatchProcessor::for_device(model).process_kind(kind, raw)
}

/// Convert raw export JSON to a JSON array of canonical records.
///
/// # Arguments
/// * `model` - Device that produced the export
/// * `kind` - Data kind held by the export
/// * `raw_json` - Export file contents (array, envelope object or NDJSON)
pub fn normalize_json(
    model: DeviceModel,
    kind: DataKind,
    raw_json: &str,
) -> Result<String, IngestError> {
    let raw = parse_collection(raw_json, kind)?;
    let batch = normalize(model, kind, &raw);
    Ok(serde_json::to_string(&batch)?)
}

/// Result of ingesting one data kind
#[derive(Debug, Clone, Serialize)]
pub struct KindReport {
    pub kind: DataKind,
    pub device: DeviceModel,
    /// Raw records fetched from the source
    pub total: usize,
    pub records: CanonicalBatch,
    pub skipped: Vec<SkippedRecord>,
}

/// Fetches raw collections from a source and maps them for one device
pub struct Ingestor<S: RecordSource> {
    source: S,
    processor: BatchProcessor<'static>,
}

impl Ingestor<DirectorySource> {
    /// Directory-backed ingestor described by a configuration
    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.source(), config.device)
    }
}

impl<S: RecordSource> Ingestor<S> {
    pub fn new(source: S, model: DeviceModel) -> Self {
        Self {
            source,
            processor: BatchProcessor::for_device(model),
        }
    }

    pub fn device(&self) -> DeviceModel {
        self.processor.device()
    }

    /// Fetch and map one data kind
    pub fn ingest(&self, kind: DataKind) -> Result<KindReport, IngestError> {
        let raw = self.source.fetch(kind)?;
        let (records, skipped) = self.processor.process_kind_with_report(kind, &raw);

        info!(
            device = %self.device(),
            %kind,
            fetched = raw.len(),
            mapped = records.len(),
            "ingested"
        );

        Ok(KindReport {
            kind,
            device: self.device(),
            total: raw.len(),
            records,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use serde_json::json;

    fn sample_sleep_json() -> &'static str {
        r#"[
            {
                "deepSleepSeconds": 7200,
                "lightSleepSeconds": 14400,
                "awakeSleepSeconds": 1800,
                "sleepMovement": [0.1, 0.2, 0.3],
                "date": "2024-03-15T22:00:00",
                "remSleepSeconds": 0,
                "sleepScore": null,
                "stressLevel": null
            },
            {
                "deepSleepSeconds": 5400,
                "remSleepSeconds": 3600
            }
        ]"#
    }

    #[test]
    fn test_normalize_json_sleep() {
        let output = normalize_json(DeviceModel::Forerunner235, DataKind::Sleep, sample_sleep_json())
            .unwrap();

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            value,
            json!([{
                "deep_sleep_seconds": 7200,
                "light_sleep_seconds": 14400,
                "awake_sleep_seconds": 1800,
                "sleep_movement": [0.1, 0.2, 0.3],
                "date": "2024-03-15T22:00:00"
            }])
        );
        assert!(!output.contains("rem"));
        assert!(!output.contains("score"));
        assert!(!output.contains("stress"));
    }

    #[test]
    fn test_normalize_json_heart_rate_pairs() {
        let raw = r#"{"heartRateValues": [[1710515400000, 75], [1710515520000, null]]}"#;
        let output = normalize_json(DeviceModel::Forerunner235, DataKind::HeartRate, raw).unwrap();

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value, json!([{ "heart_rate": 75, "timestamp": 1710515400000i64 }]));
    }

    #[test]
    fn test_normalize_json_invalid_json() {
        let result = normalize_json(DeviceModel::Forerunner235, DataKind::Activity, "not valid json");
        assert!(result.is_err());
    }

    #[test]
    fn test_ingestor_reports_skips() {
        let source = MemorySource::new().with_records(
            DataKind::HeartRate,
            vec![
                json!({ "heartRate": 75, "timestamp": 1710515400000i64, "hrvStatus": null }),
                json!({ "heartRate": 75 }),
            ],
        );
        let ingestor = Ingestor::new(source, DeviceModel::Forerunner235);

        let report = ingestor.ingest(DataKind::HeartRate).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);

        assert!(matches!(
            ingestor.ingest(DataKind::Sleep),
            Err(IngestError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_ingestor_from_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sleep-data.json"), sample_sleep_json()).unwrap();

        let config = IngestConfig {
            data_dir: dir.path().to_path_buf(),
            ..IngestConfig::default()
        };
        let report = Ingestor::from_config(&config).ingest(DataKind::Sleep).unwrap();

        assert_eq!(report.device, DeviceModel::Forerunner235);
        assert_eq!(report.total, 2);
        assert_eq!(report.records.len(), 1);
    }
}
