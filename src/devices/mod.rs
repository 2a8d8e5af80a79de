//! Device capability mappers
//!
//! Each supported hardware model gets one mapper. A mapper knows which keys
//! its device writes into an export file and how to turn them into canonical
//! records; everything else in a raw record is ignored.

mod forerunner235;

pub use forerunner235::Forerunner235Mapper;

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{FieldError, IngestError};
use crate::types::{ActivityRecord, DataKind, HeartRateRecord, SleepRecord};

/// Trait for device capability mappers
pub trait DeviceMapper: Send + Sync {
    /// Hardware model this mapper covers
    fn model(&self) -> DeviceModel;

    /// Static description of what the device reports
    fn capabilities(&self) -> &'static CapabilityProfile;

    /// Map one raw sleep record
    fn map_sleep(&self, raw: &Value) -> Result<SleepRecord, FieldError>;

    /// Map one raw activity record
    fn map_activity(&self, raw: &Value) -> Result<ActivityRecord, FieldError>;

    /// Map one raw heart-rate record
    fn map_heart_rate(&self, raw: &Value) -> Result<HeartRateRecord, FieldError>;
}

/// Supported hardware models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceModel {
    Forerunner235,
}

static FORERUNNER_235: Forerunner235Mapper = Forerunner235Mapper;

impl DeviceModel {
    pub const ALL: [DeviceModel; 1] = [DeviceModel::Forerunner235];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceModel::Forerunner235 => "forerunner235",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeviceModel::Forerunner235 => "Garmin Forerunner 235",
        }
    }

    /// The mapper implementing this model's capabilities
    pub fn mapper(&self) -> &'static dyn DeviceMapper {
        match self {
            DeviceModel::Forerunner235 => &FORERUNNER_235,
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceModel {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();

        match normalized.as_str() {
            "fr235" | "forerunner235" | "garminforerunner235" => Ok(DeviceModel::Forerunner235),
            _ => Err(IngestError::UnsupportedDevice(s.trim().to_string())),
        }
    }
}

/// How well a device reports a given field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    /// Always reported; the record is rejected without it
    Full,
    /// Reported with limited accuracy; may be unknown
    Limited,
    /// Expected but filled with a default when the export omits it
    Defaulted,
}

/// A raw key read by a mapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSupport {
    pub key: &'static str,
    pub support: Support,
}

impl FieldSupport {
    pub const fn full(key: &'static str) -> Self {
        Self {
            key,
            support: Support::Full,
        }
    }

    pub const fn limited(key: &'static str) -> Self {
        Self {
            key,
            support: Support::Limited,
        }
    }

    pub const fn defaulted(key: &'static str) -> Self {
        Self {
            key,
            support: Support::Defaulted,
        }
    }
}

/// Fields a device covers for one data kind
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KindCapabilities {
    /// Raw keys the mapper reads
    pub reads: &'static [FieldSupport],
    /// Raw keys known to appear in exports that the device cannot measure
    pub ignores: &'static [&'static str],
}

impl KindCapabilities {
    pub fn reads_key(&self, key: &str) -> bool {
        self.reads.iter().any(|f| f.key == key)
    }
}

/// Capability profile of a hardware model
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CapabilityProfile {
    pub sleep: KindCapabilities,
    pub activity: KindCapabilities,
    pub heart_rate: KindCapabilities,
}

impl CapabilityProfile {
    pub fn for_kind(&self, kind: DataKind) -> &KindCapabilities {
        match kind {
            DataKind::Sleep => &self.sleep,
            DataKind::Activity => &self.activity,
            DataKind::HeartRate => &self.heart_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_model_from_str() {
        for name in ["fr235", "FR235", "forerunner235", "Forerunner-235", "forerunner_235"] {
            assert_eq!(name.parse::<DeviceModel>().unwrap(), DeviceModel::Forerunner235);
        }

        let err = "fenix7".parse::<DeviceModel>().unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedDevice(name) if name == "fenix7"));
    }

    #[test]
    fn test_every_model_resolves_to_its_mapper() {
        for model in DeviceModel::ALL {
            assert_eq!(model.mapper().model(), model);
            assert_eq!(model.to_string().parse::<DeviceModel>().unwrap(), model);
        }
    }

    #[test]
    fn test_profiles_never_read_an_ignored_key() {
        for model in DeviceModel::ALL {
            let profile = model.mapper().capabilities();
            for kind in DataKind::ALL {
                let caps = profile.for_kind(kind);
                for ignored in caps.ignores {
                    assert!(!caps.reads_key(ignored), "{model} {kind} reads {ignored}");
                }
            }
        }
    }
}
