//! Batch processing
//!
//! Applies one device mapper across a collection of raw records of a single
//! kind. Records that fail to map are dropped; everything that maps comes
//! back in input order.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::devices::{DeviceMapper, DeviceModel};
use crate::error::FieldError;
use crate::types::{ActivityRecord, DataKind, HeartRateRecord, SleepRecord};

/// A raw record that was dropped from a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Position in the input collection
    pub index: usize,
    /// Why the mapper rejected it
    #[serde(serialize_with = "serialize_reason")]
    pub reason: FieldError,
}

fn serialize_reason<S: serde::Serializer>(reason: &FieldError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

/// Mapped records plus the entries that were skipped
#[derive(Debug, Clone)]
pub struct BatchOutcome<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRecord>,
}

impl<T> BatchOutcome<T> {
    /// Number of raw records the batch was built from
    pub fn total(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}

/// Canonical records of one kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CanonicalBatch {
    Sleep(Vec<SleepRecord>),
    Activity(Vec<ActivityRecord>),
    HeartRate(Vec<HeartRateRecord>),
}

impl CanonicalBatch {
    pub fn kind(&self) -> DataKind {
        match self {
            CanonicalBatch::Sleep(_) => DataKind::Sleep,
            CanonicalBatch::Activity(_) => DataKind::Activity,
            CanonicalBatch::HeartRate(_) => DataKind::HeartRate,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CanonicalBatch::Sleep(r) => r.len(),
            CanonicalBatch::Activity(r) => r.len(),
            CanonicalBatch::HeartRate(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stateless batch processor bound to one device mapper
#[derive(Clone, Copy)]
pub struct BatchProcessor<'a> {
    mapper: &'a dyn DeviceMapper,
}

impl BatchProcessor<'static> {
    /// Create a processor for a supported hardware model
    pub fn for_device(model: DeviceModel) -> Self {
        Self {
            mapper: model.mapper(),
        }
    }
}

impl<'a> BatchProcessor<'a> {
    /// Create a processor around any mapper implementation
    pub fn with_mapper(mapper: &'a dyn DeviceMapper) -> Self {
        Self { mapper }
    }

    pub fn device(&self) -> DeviceModel {
        self.mapper.model()
    }

    pub fn process_sleep(&self, raw: &[Value]) -> Vec<SleepRecord> {
        self.process_sleep_with_report(raw).records
    }

    pub fn process_activity(&self, raw: &[Value]) -> Vec<ActivityRecord> {
        self.process_activity_with_report(raw).records
    }

    pub fn process_heart_rate(&self, raw: &[Value]) -> Vec<HeartRateRecord> {
        self.process_heart_rate_with_report(raw).records
    }

    pub fn process_sleep_with_report(&self, raw: &[Value]) -> BatchOutcome<SleepRecord> {
        self.run(DataKind::Sleep, raw, |item| self.mapper.map_sleep(item))
    }

    pub fn process_activity_with_report(&self, raw: &[Value]) -> BatchOutcome<ActivityRecord> {
        self.run(DataKind::Activity, raw, |item| self.mapper.map_activity(item))
    }

    pub fn process_heart_rate_with_report(&self, raw: &[Value]) -> BatchOutcome<HeartRateRecord> {
        self.run(DataKind::HeartRate, raw, |item| {
            self.mapper.map_heart_rate(item)
        })
    }

    /// Map a batch of the given kind
    pub fn process_kind(&self, kind: DataKind, raw: &[Value]) -> CanonicalBatch {
        self.process_kind_with_report(kind, raw).0
    }

    /// Map a batch of the given kind, also returning the skipped entries
    pub fn process_kind_with_report(
        &self,
        kind: DataKind,
        raw: &[Value],
    ) -> (CanonicalBatch, Vec<SkippedRecord>) {
        match kind {
            DataKind::Sleep => {
                let outcome = self.process_sleep_with_report(raw);
                (CanonicalBatch::Sleep(outcome.records), outcome.skipped)
            }
            DataKind::Activity => {
                let outcome = self.process_activity_with_report(raw);
                (CanonicalBatch::Activity(outcome.records), outcome.skipped)
            }
            DataKind::HeartRate => {
                let outcome = self.process_heart_rate_with_report(raw);
                (CanonicalBatch::HeartRate(outcome.records), outcome.skipped)
            }
        }
    }

    fn run<T, F>(&self, kind: DataKind, raw: &[Value], map: F) -> BatchOutcome<T>
    where
        T: Send,
        F: Fn(&Value) -> Result<T, FieldError> + Send + Sync,
    {
        let results = map_all(raw, map);

        let mut records = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(reason) => {
                    debug!(device = %self.device(), %kind, index, %reason, "skipping raw record");
                    skipped.push(SkippedRecord { index, reason });
                }
            }
        }

        info!(
            device = %self.device(),
            %kind,
            total = raw.len(),
            mapped = records.len(),
            skipped = skipped.len(),
            "batch processed"
        );

        BatchOutcome { records, skipped }
    }
}

#[cfg(not(feature = "parallel"))]
fn map_all<T, F>(raw: &[Value], map: F) -> Vec<Result<T, FieldError>>
where
    T: Send,
    F: Fn(&Value) -> Result<T, FieldError> + Send + Sync,
{
    raw.iter().map(map).collect()
}

// Indexed collect keeps input order
#[cfg(feature = "parallel")]
fn map_all<T, F>(raw: &[Value], map: F) -> Vec<Result<T, FieldError>>
where
    T: Send,
    F: Fn(&Value) -> Result<T, FieldError> + Send + Sync,
{
    use rayon::prelude::*;

    raw.par_iter().map(map).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{CapabilityProfile, Forerunner235Mapper};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sleep(deep: u64, date: &str) -> Value {
        json!({
            "deepSleepSeconds": deep,
            "lightSleepSeconds": 14400,
            "awakeSleepSeconds": 1800,
            "sleepMovement": [0.1, 0.2, 0.3],
            "date": date,
            "remSleepSeconds": 5400
        })
    }

    fn activity(id: u64) -> Value {
        json!({
            "activityId": id,
            "activityName": format!("Run {id}"),
            "startTimeLocal": "2024-03-15T06:30:00",
            "startTimeGMT": "2024-03-15T13:30:00",
            "distance": 5000.0,
            "duration": 1800.0,
            "averageHR": 145,
            "maxHR": 165,
            "calories": 300,
            "steps": 6000,
            "averageSpeed": 2.78,
            "maxSpeed": 3.5,
            "averageRunningCadenceInStepsPerMinute": 170.0,
            "maxRunningCadenceInStepsPerMinute": 180.0
        })
    }

    fn heart_rate(bpm: u32, ts: i64) -> Value {
        json!({ "heartRate": bpm, "timestamp": ts, "bodyBattery": 80 })
    }

    #[test]
    fn test_process_sleep_preserves_order() {
        let raw = vec![
            sleep(3600, "2024-03-13T22:00:00"),
            sleep(7200, "2024-03-14T22:00:00"),
            sleep(5400, "2024-03-15T22:00:00"),
        ];

        let records = BatchProcessor::for_device(DeviceModel::Forerunner235).process_sleep(&raw);
        let deep: Vec<u64> = records.iter().map(|r| r.deep_sleep_seconds()).collect();
        assert_eq!(deep, vec![3600, 7200, 5400]);
    }

    #[test]
    fn test_invalid_record_drops_exactly_one() {
        let processor = BatchProcessor::for_device(DeviceModel::Forerunner235);
        let valid: Vec<Value> = (1..=4).map(activity).collect();
        assert_eq!(processor.process_activity(&valid).len(), 4);

        let mut with_invalid = valid.clone();
        with_invalid[2].as_object_mut().unwrap().remove("activityId");

        let outcome = processor.process_activity_with_report(&with_invalid);
        let ids: Vec<u64> = outcome.records.iter().map(|r| r.activity_id()).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(
            outcome.skipped,
            vec![SkippedRecord {
                index: 2,
                reason: FieldError::Missing("activityId")
            }]
        );
        assert_eq!(outcome.total(), 4);
    }

    #[test]
    fn test_heart_rate_batch_skips_unusable_entries() {
        let raw = vec![
            heart_rate(60, 1_710_515_400_000),
            json!({ "heartRate": 75 }),
            json!("garbage"),
            json!({ "heartRate": null, "timestamp": 1_710_515_460_000i64 }),
            heart_rate(62, 1_710_515_520_000),
        ];

        let outcome =
            BatchProcessor::for_device(DeviceModel::Forerunner235).process_heart_rate_with_report(&raw);

        let bpm: Vec<u32> = outcome.records.iter().map(|r| r.heart_rate()).collect();
        assert_eq!(bpm, vec![60, 62]);
        let skipped: Vec<usize> = outcome.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_batch() {
        let processor = BatchProcessor::for_device(DeviceModel::Forerunner235);
        let batch = processor.process_kind(DataKind::Sleep, &[]);
        assert!(batch.is_empty());
        assert_eq!(batch.kind(), DataKind::Sleep);
    }

    #[test]
    fn test_process_kind_dispatch() {
        let processor = BatchProcessor::for_device(DeviceModel::Forerunner235);
        let raw = vec![heart_rate(70, 1_710_515_400_000), heart_rate(71, 1_710_515_401_000)];

        let (batch, skipped) = processor.process_kind_with_report(DataKind::HeartRate, &raw);
        assert_eq!(batch.kind(), DataKind::HeartRate);
        assert_eq!(batch.len(), 2);
        assert!(skipped.is_empty());

        // Heart-rate samples fed to the sleep mapper are all missing a date
        let (batch, skipped) = processor.process_kind_with_report(DataKind::Sleep, &raw);
        assert!(batch.is_empty());
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn test_canonical_batch_serializes_as_plain_array() {
        let processor = BatchProcessor::for_device(DeviceModel::Forerunner235);
        let batch = processor.process_kind(DataKind::HeartRate, &[heart_rate(75, 1_710_515_400_000)]);

        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value, json!([{ "heart_rate": 75, "timestamp": 1_710_515_400_000i64 }]));
    }

    #[test]
    fn test_skipped_record_serializes_reason_text() {
        let skipped = SkippedRecord {
            index: 3,
            reason: FieldError::Missing("date"),
        };
        let value = serde_json::to_value(&skipped).unwrap();
        assert_eq!(value, json!({ "index": 3, "reason": "Missing required field: date" }));
    }

    struct RejectAll;

    impl DeviceMapper for RejectAll {
        fn model(&self) -> DeviceModel {
            DeviceModel::Forerunner235
        }

        fn capabilities(&self) -> &'static CapabilityProfile {
            Forerunner235Mapper.capabilities()
        }

        fn map_sleep(&self, _raw: &Value) -> Result<SleepRecord, FieldError> {
            Err(FieldError::NotAnObject)
        }

        fn map_activity(&self, _raw: &Value) -> Result<ActivityRecord, FieldError> {
            Err(FieldError::NotAnObject)
        }

        fn map_heart_rate(&self, _raw: &Value) -> Result<HeartRateRecord, FieldError> {
            Err(FieldError::NotAnObject)
        }
    }

    #[test]
    fn test_with_custom_mapper() {
        let mapper = RejectAll;
        let processor = BatchProcessor::with_mapper(&mapper);
        let raw = vec![sleep(1, "2024-03-15T22:00:00")];

        let outcome = processor.process_sleep_with_report(&raw);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_mapping_preserves_order() {
        // Every seventh sample lacks its timestamp
        let raw: Vec<Value> = (1..=20_000i64)
            .map(|i| {
                if i % 7 == 0 {
                    json!({ "heartRate": 60 })
                } else {
                    json!({ "heartRate": 60 + i % 100, "timestamp": i })
                }
            })
            .collect();

        let processor = BatchProcessor::for_device(DeviceModel::Forerunner235);
        let outcome = processor.process_heart_rate_with_report(&raw);

        let timestamps: Vec<i64> = outcome.records.iter().map(|r| r.timestamp()).collect();
        let expected: Vec<i64> = (1..=20_000i64).filter(|i| i % 7 != 0).collect();
        assert_eq!(timestamps, expected);

        let skipped: Vec<usize> = outcome.skipped.iter().map(|s| s.index).collect();
        let expected: Vec<usize> = (1..=20_000usize).filter(|i| i % 7 == 0).map(|i| i - 1).collect();
        assert_eq!(skipped, expected);
    }
}
