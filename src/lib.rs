//! wear-ingest - Device-aware normalization of fitness-tracker exports
//!
//! Raw export records (sleep, activity, heart rate) go through a
//! deterministic pipeline: record source → device capability mapper →
//! canonical record. Each supported hardware model has its own mapper that
//! reads only the fields the device measures, defaults the ones it may omit
//! and rejects records that miss required values.
//!
//! ## Modules
//!
//! - **Schema** (`types`): canonical sleep, activity and heart-rate records
//! - **Devices** (`devices`): per-model capability mappers and profiles
//! - **Processor** (`processor`): order-preserving batch mapping
//! - **Sources** (`source`): fetch interface and export file parsing

pub mod config;
pub mod devices;
pub mod error;
pub mod fields;
pub mod pipeline;
pub mod processor;
pub mod source;
pub mod types;

pub use config::IngestConfig;
pub use devices::{CapabilityProfile, DeviceMapper, DeviceModel, Support};
pub use error::{FieldError, IngestError};
pub use pipeline::{normalize, normalize_json, Ingestor, KindReport};
pub use processor::{BatchOutcome, BatchProcessor, CanonicalBatch, SkippedRecord};
pub use source::{DirectorySource, MemorySource, RecordSource, SourcePaths};
pub use types::{ActivityRecord, DataKind, HeartRateRecord, SleepRecord};

/// Crate version, reported by the CLI
pub const INGEST_VERSION: &str = env!("CARGO_PKG_VERSION");
