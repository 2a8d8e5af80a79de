//! Value coercion shared by device mappers
//!
//! Mappers describe each raw payload as a private `Deserialize` struct and
//! turn it into a canonical record at the boundary. This module holds what
//! those structs have in common: decoding with [`FieldError`] reporting, the
//! exporter's integer habits ([`Count`]) and ISO-8601 date-time parsing.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserialize, Deserializer, Unexpected, Visitor};
use serde_json::Value;
use std::fmt;

use crate::error::FieldError;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// %z takes both +02:00 and +0200
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// Decode a raw record into a payload struct.
///
/// Only JSON objects are accepted; serde would otherwise read an array
/// positionally into the struct fields.
pub fn decode<'a, T: Deserialize<'a>>(raw: &'a Value) -> Result<T, FieldError> {
    if !raw.is_object() {
        return Err(FieldError::NotAnObject);
    }
    Ok(T::deserialize(raw)?)
}

/// Unwrap a field that must be present and non-null
pub fn required<T>(value: Option<T>, key: &'static str) -> Result<T, FieldError> {
    value.ok_or(FieldError::Missing(key))
}

/// Non-negative integer as written by exporters.
///
/// Accepts JSON integers and integral floats (`7200.0`). Fractional,
/// negative and out-of-range numbers, strings and null are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Count(pub u64);

impl Count {
    pub fn get(self) -> u64 {
        self.0
    }

    pub fn to_u32(self, field: &'static str) -> Result<u32, FieldError> {
        u32::try_from(self.0).map_err(|_| FieldError::OutOfRange {
            field,
            reason: "exceeds 32-bit range",
        })
    }

    pub fn to_i64(self, field: &'static str) -> Result<i64, FieldError> {
        i64::try_from(self.0).map_err(|_| FieldError::OutOfRange {
            field,
            reason: "exceeds 64-bit signed range",
        })
    }
}

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CountVisitor)
    }
}

struct CountVisitor;

impl<'de> Visitor<'de> for CountVisitor {
    type Value = Count;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Count, E> {
        Ok(Count(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Count, E> {
        u64::try_from(v)
            .map(Count)
            .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Count, E> {
        // u64::MAX as f64 rounds up to 2^64, so the bound is strict
        if v.is_finite() && v.fract() == 0.0 && v >= 0.0 && v < u64::MAX as f64 {
            Ok(Count(v as u64))
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }
}

/// Date-time read as wall-clock time; offsets are kept local, not converted
pub fn naive_datetime(key: &'static str, text: &str) -> Result<NaiveDateTime, FieldError> {
    parse_naive_datetime(text).ok_or_else(|| FieldError::InvalidDate {
        key,
        value: text.to_string(),
    })
}

/// Date-time read as an absolute UTC instant
pub fn utc_datetime(key: &'static str, text: &str) -> Result<DateTime<Utc>, FieldError> {
    parse_utc_datetime(text).ok_or_else(|| FieldError::InvalidDate {
        key,
        value: text.to_string(),
    })
}

/// Parse an ISO-8601 date or date-time into its wall-clock value
pub fn parse_naive_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Some(dt) = parse_offset_datetime(text) {
        return Some(dt.naive_local());
    }

    let text = text.trim();
    parse_naive_formats(text)
        .or_else(|| {
            // Hour only, e.g. 2024-03-15T22
            (text.len() == 13)
                .then(|| format!("{text}:00"))
                .and_then(|padded| parse_naive_formats(&padded))
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse an ISO-8601 date or date-time as UTC; naive input is taken as UTC
pub fn parse_utc_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Some(dt) = parse_offset_datetime(text) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_naive_datetime(text).map(|naive| naive.and_utc())
}

fn parse_offset_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
    })
}

fn parse_naive_formats(text: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}
