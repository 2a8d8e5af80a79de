//! Canonical record schema
//!
//! The three record kinds every device mapper produces. Each type carries the
//! complete and exclusive field set for its kind: concepts a device might
//! report but the schema does not model (REM sleep, sleep scores, HRV status,
//! running dynamics) have no field to land in.
//!
//! Records are value objects. Fields are private, invariants are checked once
//! in the constructor, and nothing mutates a record after that.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FieldError, IngestError};

/// Kind of data carried by an export file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Sleep,
    Activity,
    HeartRate,
}

impl DataKind {
    pub const ALL: [DataKind; 3] = [DataKind::Sleep, DataKind::Activity, DataKind::HeartRate];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Sleep => "sleep",
            DataKind::Activity => "activity",
            DataKind::HeartRate => "heart_rate",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sleep" => Ok(DataKind::Sleep),
            "activity" | "activities" => Ok(DataKind::Activity),
            "heart_rate" | "heart-rate" | "heartrate" | "hr" => Ok(DataKind::HeartRate),
            other => Err(IngestError::UnsupportedKind(other.to_string())),
        }
    }
}

/// One night of sleep as reported by the device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepRecord {
    deep_sleep_seconds: u64,
    light_sleep_seconds: u64,
    awake_sleep_seconds: u64,
    /// Movement time series, in device order
    sleep_movement: Vec<f64>,
    date: NaiveDateTime,
}

impl SleepRecord {
    pub fn new(
        deep_sleep_seconds: u64,
        light_sleep_seconds: u64,
        awake_sleep_seconds: u64,
        sleep_movement: Vec<f64>,
        date: NaiveDateTime,
    ) -> Result<Self, FieldError> {
        if sleep_movement.iter().any(|v| !v.is_finite()) {
            return Err(FieldError::OutOfRange {
                field: "sleep_movement",
                reason: "samples must be finite",
            });
        }

        Ok(Self {
            deep_sleep_seconds,
            light_sleep_seconds,
            awake_sleep_seconds,
            sleep_movement,
            date,
        })
    }

    pub fn deep_sleep_seconds(&self) -> u64 {
        self.deep_sleep_seconds
    }

    pub fn light_sleep_seconds(&self) -> u64 {
        self.light_sleep_seconds
    }

    pub fn awake_sleep_seconds(&self) -> u64 {
        self.awake_sleep_seconds
    }

    pub fn sleep_movement(&self) -> &[f64] {
        &self.sleep_movement
    }

    pub fn date(&self) -> NaiveDateTime {
        self.date
    }
}

/// Raw values for an [`ActivityRecord`], checked by `ActivityRecord::try_from`
#[derive(Debug, Clone)]
pub struct ActivityFields {
    pub activity_id: u64,
    pub activity_name: String,
    pub start_time_local: NaiveDateTime,
    pub start_time_gmt: DateTime<Utc>,
    pub distance: f64,
    pub duration: f64,
    pub average_hr: u32,
    pub max_hr: u32,
    pub calories: u32,
    pub steps: u32,
    pub average_speed: f64,
    pub max_speed: f64,
    pub elevation_gain: Option<f64>,
    pub elevation_loss: Option<f64>,
    pub average_running_cadence: f64,
    pub max_running_cadence: f64,
    pub stride_length: Option<f64>,
}

/// A recorded workout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    activity_id: u64,
    activity_name: String,
    start_time_local: NaiveDateTime,
    start_time_gmt: DateTime<Utc>,
    /// Meters
    distance: f64,
    /// Seconds
    duration: f64,
    average_hr: u32,
    max_hr: u32,
    calories: u32,
    steps: u32,
    /// Meters per second
    average_speed: f64,
    max_speed: f64,
    /// Meters; barometric accuracy varies per device, so this may be unknown
    elevation_gain: Option<f64>,
    elevation_loss: Option<f64>,
    /// Steps per minute
    average_running_cadence: f64,
    max_running_cadence: f64,
    /// Meters
    stride_length: Option<f64>,
}

impl TryFrom<ActivityFields> for ActivityRecord {
    type Error = FieldError;

    fn try_from(f: ActivityFields) -> Result<Self, Self::Error> {
        if f.activity_id == 0 {
            return Err(FieldError::OutOfRange {
                field: "activity_id",
                reason: "must be positive",
            });
        }
        if f.activity_name.trim().is_empty() {
            return Err(FieldError::OutOfRange {
                field: "activity_name",
                reason: "must not be empty",
            });
        }

        non_negative("distance", f.distance)?;
        non_negative("duration", f.duration)?;
        non_negative("average_speed", f.average_speed)?;
        non_negative("max_speed", f.max_speed)?;
        finite("average_running_cadence", f.average_running_cadence)?;
        finite("max_running_cadence", f.max_running_cadence)?;
        if let Some(v) = f.elevation_gain {
            non_negative("elevation_gain", v)?;
        }
        if let Some(v) = f.elevation_loss {
            non_negative("elevation_loss", v)?;
        }
        if let Some(v) = f.stride_length {
            non_negative("stride_length", v)?;
        }

        Ok(Self {
            activity_id: f.activity_id,
            activity_name: f.activity_name,
            start_time_local: f.start_time_local,
            start_time_gmt: f.start_time_gmt,
            distance: f.distance,
            duration: f.duration,
            average_hr: f.average_hr,
            max_hr: f.max_hr,
            calories: f.calories,
            steps: f.steps,
            average_speed: f.average_speed,
            max_speed: f.max_speed,
            elevation_gain: f.elevation_gain,
            elevation_loss: f.elevation_loss,
            average_running_cadence: f.average_running_cadence,
            max_running_cadence: f.max_running_cadence,
            stride_length: f.stride_length,
        })
    }
}

impl ActivityRecord {
    pub fn activity_id(&self) -> u64 {
        self.activity_id
    }

    pub fn activity_name(&self) -> &str {
        &self.activity_name
    }

    pub fn start_time_local(&self) -> NaiveDateTime {
        self.start_time_local
    }

    pub fn start_time_gmt(&self) -> DateTime<Utc> {
        self.start_time_gmt
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn average_hr(&self) -> u32 {
        self.average_hr
    }

    pub fn max_hr(&self) -> u32 {
        self.max_hr
    }

    pub fn calories(&self) -> u32 {
        self.calories
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn average_speed(&self) -> f64 {
        self.average_speed
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn elevation_gain(&self) -> Option<f64> {
        self.elevation_gain
    }

    pub fn elevation_loss(&self) -> Option<f64> {
        self.elevation_loss
    }

    pub fn average_running_cadence(&self) -> f64 {
        self.average_running_cadence
    }

    pub fn max_running_cadence(&self) -> f64 {
        self.max_running_cadence
    }

    pub fn stride_length(&self) -> Option<f64> {
        self.stride_length
    }
}

/// A single heart-rate sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeartRateRecord {
    /// Beats per minute
    heart_rate: u32,
    /// Unix epoch milliseconds
    timestamp: i64,
}

impl HeartRateRecord {
    pub fn new(heart_rate: u32, timestamp: i64) -> Result<Self, FieldError> {
        if heart_rate == 0 {
            return Err(FieldError::OutOfRange {
                field: "heart_rate",
                reason: "must be positive",
            });
        }
        if timestamp <= 0 {
            return Err(FieldError::OutOfRange {
                field: "timestamp",
                reason: "must be positive",
            });
        }

        Ok(Self {
            heart_rate,
            timestamp,
        })
    }

    pub fn heart_rate(&self) -> u32 {
        self.heart_rate
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), FieldError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FieldError::OutOfRange {
            field,
            reason: "must be finite",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), FieldError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(FieldError::OutOfRange {
            field,
            reason: "must be non-negative",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap()
    }

    fn activity_fields() -> ActivityFields {
        ActivityFields {
            activity_id: 12345,
            activity_name: "Morning Run".to_string(),
            start_time_local: date(),
            start_time_gmt: Utc.with_ymd_and_hms(2024, 3, 15, 13, 30, 0).unwrap(),
            distance: 5000.0,
            duration: 1800.0,
            average_hr: 145,
            max_hr: 165,
            calories: 300,
            steps: 6000,
            average_speed: 2.78,
            max_speed: 3.5,
            elevation_gain: Some(50.0),
            elevation_loss: None,
            average_running_cadence: 170.0,
            max_running_cadence: 180.0,
            stride_length: None,
        }
    }

    #[test]
    fn test_data_kind_from_str() {
        assert_eq!("sleep".parse::<DataKind>().unwrap(), DataKind::Sleep);
        assert_eq!("Activities".parse::<DataKind>().unwrap(), DataKind::Activity);
        assert_eq!("heart-rate".parse::<DataKind>().unwrap(), DataKind::HeartRate);
        assert_eq!("hr".parse::<DataKind>().unwrap(), DataKind::HeartRate);
        assert!(matches!(
            "steps".parse::<DataKind>(),
            Err(IngestError::UnsupportedKind(k)) if k == "steps"
        ));
    }

    #[test]
    fn test_sleep_record_accessors() {
        let record = SleepRecord::new(7200, 14400, 1800, vec![0.1, 0.2], date()).unwrap();
        assert_eq!(record.deep_sleep_seconds(), 7200);
        assert_eq!(record.light_sleep_seconds(), 14400);
        assert_eq!(record.awake_sleep_seconds(), 1800);
        assert_eq!(record.sleep_movement(), &[0.1, 0.2]);
        assert_eq!(record.date(), date());
    }

    #[test]
    fn test_sleep_record_rejects_non_finite_movement() {
        let result = SleepRecord::new(0, 0, 0, vec![f64::NAN], date());
        assert!(matches!(result, Err(FieldError::OutOfRange { field: "sleep_movement", .. })));
    }

    #[test]
    fn test_activity_record_validation() {
        assert!(ActivityRecord::try_from(activity_fields()).is_ok());

        let mut zero_id = activity_fields();
        zero_id.activity_id = 0;
        assert!(ActivityRecord::try_from(zero_id).is_err());

        let mut blank_name = activity_fields();
        blank_name.activity_name = "  ".to_string();
        assert!(ActivityRecord::try_from(blank_name).is_err());

        let mut negative_distance = activity_fields();
        negative_distance.distance = -1.0;
        assert_eq!(
            ActivityRecord::try_from(negative_distance).unwrap_err(),
            FieldError::OutOfRange {
                field: "distance",
                reason: "must be non-negative"
            }
        );

        let mut negative_elevation = activity_fields();
        negative_elevation.elevation_loss = Some(-3.0);
        assert!(ActivityRecord::try_from(negative_elevation).is_err());
    }

    #[test]
    fn test_heart_rate_record_validation() {
        let record = HeartRateRecord::new(75, 1_710_515_400_000).unwrap();
        assert_eq!(record.heart_rate(), 75);
        assert_eq!(record.timestamp(), 1_710_515_400_000);

        assert!(HeartRateRecord::new(0, 1_710_515_400_000).is_err());
        assert!(HeartRateRecord::new(75, 0).is_err());
        assert!(HeartRateRecord::new(75, -5).is_err());
    }

    #[test]
    fn test_serialized_sleep_record_has_exact_field_set() {
        let record = SleepRecord::new(1, 2, 3, vec![], date()).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "awake_sleep_seconds",
                "date",
                "deep_sleep_seconds",
                "light_sleep_seconds",
                "sleep_movement"
            ]
        );
    }
}
