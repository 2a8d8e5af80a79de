//! Garmin Forerunner 235 mapper
//!
//! The FR235 has an optical wrist HR sensor, GPS and an accelerometer but no
//! barometer, no HRV sensor and no running-dynamics pod support. Sleep is
//! staged as deep/light/awake only.

use serde::Deserialize;
use serde_json::Value;

use super::{CapabilityProfile, DeviceMapper, DeviceModel, FieldSupport, KindCapabilities};
use crate::error::FieldError;
use crate::fields::{self, required, Count};
use crate::types::{ActivityFields, ActivityRecord, HeartRateRecord, SleepRecord};

/// Forerunner 235 payload mapper
pub struct Forerunner235Mapper;

static PROFILE: CapabilityProfile = CapabilityProfile {
    sleep: KindCapabilities {
        reads: &[
            FieldSupport::defaulted("deepSleepSeconds"),
            FieldSupport::defaulted("lightSleepSeconds"),
            FieldSupport::defaulted("awakeSleepSeconds"),
            FieldSupport::defaulted("sleepMovement"),
            FieldSupport::full("date"),
        ],
        ignores: &["remSleepSeconds", "sleepScore", "stressLevel"],
    },
    activity: KindCapabilities {
        reads: &[
            FieldSupport::full("activityId"),
            FieldSupport::full("activityName"),
            FieldSupport::full("startTimeLocal"),
            FieldSupport::full("startTimeGMT"),
            FieldSupport::full("distance"),
            FieldSupport::full("duration"),
            FieldSupport::full("averageHR"),
            FieldSupport::full("maxHR"),
            FieldSupport::full("calories"),
            FieldSupport::full("steps"),
            FieldSupport::full("averageSpeed"),
            FieldSupport::full("maxSpeed"),
            FieldSupport::limited("elevationGain"),
            FieldSupport::limited("elevationLoss"),
            FieldSupport::full("averageRunningCadenceInStepsPerMinute"),
            FieldSupport::full("maxRunningCadenceInStepsPerMinute"),
            FieldSupport::limited("strideLength"),
        ],
        ignores: &["groundContactTime", "verticalOscillation", "runningPower"],
    },
    heart_rate: KindCapabilities {
        reads: &[FieldSupport::full("heartRate"), FieldSupport::full("timestamp")],
        ignores: &["hrvStatus", "stressLevel", "bodyBattery", "pulseOx"],
    },
};

impl DeviceMapper for Forerunner235Mapper {
    fn model(&self) -> DeviceModel {
        DeviceModel::Forerunner235
    }

    fn capabilities(&self) -> &'static CapabilityProfile {
        &PROFILE
    }

    fn map_sleep(&self, raw: &Value) -> Result<SleepRecord, FieldError> {
        let sleep: Fr235Sleep = fields::decode(raw)?;
        let date = required(sleep.date, "date")?;

        SleepRecord::new(
            sleep.deep_sleep_seconds.get(),
            sleep.light_sleep_seconds.get(),
            sleep.awake_sleep_seconds.get(),
            sleep
                .sleep_movement
                .into_iter()
                .map(MovementSample::level)
                .collect(),
            fields::naive_datetime("date", &date)?,
        )
    }

    fn map_activity(&self, raw: &Value) -> Result<ActivityRecord, FieldError> {
        let a: Fr235Activity = fields::decode(raw)?;

        ActivityRecord::try_from(ActivityFields {
            activity_id: required(a.activity_id, "activityId")?.get(),
            activity_name: required(a.activity_name, "activityName")?,
            start_time_local: fields::naive_datetime(
                "startTimeLocal",
                &required(a.start_time_local, "startTimeLocal")?,
            )?,
            start_time_gmt: fields::utc_datetime(
                "startTimeGMT",
                &required(a.start_time_gmt, "startTimeGMT")?,
            )?,
            distance: required(a.distance, "distance")?,
            duration: required(a.duration, "duration")?,
            average_hr: required(a.average_hr, "averageHR")?.to_u32("average_hr")?,
            max_hr: required(a.max_hr, "maxHR")?.to_u32("max_hr")?,
            calories: required(a.calories, "calories")?.to_u32("calories")?,
            steps: required(a.steps, "steps")?.to_u32("steps")?,
            average_speed: required(a.average_speed, "averageSpeed")?,
            max_speed: required(a.max_speed, "maxSpeed")?,
            // No barometer: elevation is GPS-derived and often missing
            elevation_gain: a.elevation_gain,
            elevation_loss: a.elevation_loss,
            average_running_cadence: required(
                a.average_running_cadence,
                "averageRunningCadenceInStepsPerMinute",
            )?,
            max_running_cadence: required(
                a.max_running_cadence,
                "maxRunningCadenceInStepsPerMinute",
            )?,
            stride_length: a.stride_length,
        })
    }

    fn map_heart_rate(&self, raw: &Value) -> Result<HeartRateRecord, FieldError> {
        let hr: Fr235HeartRate = fields::decode(raw)?;

        HeartRateRecord::new(
            required(hr.heart_rate, "heartRate")?.to_u32("heart_rate")?,
            required(hr.timestamp, "timestamp")?.to_i64("timestamp")?,
        )
    }
}

// Forerunner 235 export structures. Keys not listed here are ignored.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fr235Sleep {
    #[serde(default)]
    deep_sleep_seconds: Count,
    #[serde(default)]
    light_sleep_seconds: Count,
    #[serde(default)]
    awake_sleep_seconds: Count,
    #[serde(default)]
    sleep_movement: Vec<MovementSample>,
    date: Option<String>,
}

/// Movement sample, either a plain level or a Garmin Connect interval
/// (`{"startGMT": .., "endGMT": .., "activityLevel": 0.4}`)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MovementSample {
    Level(f64),
    Interval {
        #[serde(rename = "activityLevel")]
        activity_level: f64,
    },
}

impl MovementSample {
    fn level(self) -> f64 {
        match self {
            MovementSample::Level(level) => level,
            MovementSample::Interval { activity_level } => activity_level,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fr235Activity {
    activity_id: Option<Count>,
    activity_name: Option<String>,
    start_time_local: Option<String>,
    #[serde(rename = "startTimeGMT")]
    start_time_gmt: Option<String>,
    distance: Option<f64>,
    duration: Option<f64>,
    #[serde(rename = "averageHR")]
    average_hr: Option<Count>,
    #[serde(rename = "maxHR")]
    max_hr: Option<Count>,
    calories: Option<Count>,
    steps: Option<Count>,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
    elevation_gain: Option<f64>,
    elevation_loss: Option<f64>,
    #[serde(rename = "averageRunningCadenceInStepsPerMinute")]
    average_running_cadence: Option<f64>,
    #[serde(rename = "maxRunningCadenceInStepsPerMinute")]
    max_running_cadence: Option<f64>,
    stride_length: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fr235HeartRate {
    heart_rate: Option<Count>,
    timestamp: Option<Count>,
}
