//! Glucose reading types.
//!
//! A reading enters the system as a [`ProviderReading`] (from the provider
//! or the fallback generator), is persisted as a [`NewGlucoseReading`], and
//! comes back from storage as an immutable [`GlucoseReading`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, PatientId, Timestamp};

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

/// Direction of glucose change reported alongside a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    None,
    DoubleUp,
    SingleUp,
    FortyFiveUp,
    Flat,
    FortyFiveDown,
    SingleDown,
    DoubleDown,
    NotComputable,
    RateOutOfRange,
}

impl Trend {
    /// All trends in Dexcom's numeric order (0..=9).
    const ORDERED: [Trend; 10] = [
        Trend::None,
        Trend::DoubleUp,
        Trend::SingleUp,
        Trend::FortyFiveUp,
        Trend::Flat,
        Trend::FortyFiveDown,
        Trend::SingleDown,
        Trend::DoubleDown,
        Trend::NotComputable,
        Trend::RateOutOfRange,
    ];

    /// Stored name, e.g. `"FORTY_FIVE_UP"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::None => "NONE",
            Trend::DoubleUp => "DOUBLE_UP",
            Trend::SingleUp => "SINGLE_UP",
            Trend::FortyFiveUp => "FORTY_FIVE_UP",
            Trend::Flat => "FLAT",
            Trend::FortyFiveDown => "FORTY_FIVE_DOWN",
            Trend::SingleDown => "SINGLE_DOWN",
            Trend::DoubleDown => "DOUBLE_DOWN",
            Trend::NotComputable => "NOT_COMPUTABLE",
            Trend::RateOutOfRange => "RATE_OUT_OF_RANGE",
        }
    }

    /// Map a legacy numeric trend code (0..=9).
    pub fn from_code(code: u8) -> Option<Trend> {
        Self::ORDERED.get(usize::from(code)).copied()
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trend {
    type Err = CoreError;

    /// Accepts stored names (`FORTY_FIVE_UP`), provider names
    /// (`FortyFiveUp`) and numeric codes (`"3"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Trend::from_code(code)
                .ok_or_else(|| CoreError::Validation(format!("unknown trend code {code}")));
        }

        let normalized: String = trimmed
            .chars()
            .filter(|c| *c != '_' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ORDERED
            .iter()
            .copied()
            .find(|t| t.as_str().replace('_', "").to_ascii_lowercase() == normalized)
            .ok_or_else(|| CoreError::Validation(format!("unknown trend '{trimmed}'")))
    }
}

// ---------------------------------------------------------------------------
// ReadingSource
// ---------------------------------------------------------------------------

/// Where a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingSource {
    /// Fetched from the external glucose-data provider.
    Provider,
    /// Generated because the provider yielded nothing.
    Synthetic,
}

impl ReadingSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingSource::Provider => "provider",
            ReadingSource::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for ReadingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provider" => Ok(ReadingSource::Provider),
            "synthetic" => Ok(ReadingSource::Synthetic),
            other => Err(CoreError::Validation(format!(
                "unknown reading source '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// MeasuredAt
// ---------------------------------------------------------------------------

/// The instant a measurement was taken, as reported by its producer.
///
/// Providers do not always attach zone information. A naive value is
/// interpreted in a fixed reference offset; a zoned value is converted
/// and never reinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasuredAt {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl MeasuredAt {
    /// Resolve to a UTC instant, reading naive values in `reference`.
    pub fn normalize(self, reference: FixedOffset) -> Timestamp {
        match self {
            MeasuredAt::Zoned(dt) => dt.with_timezone(&Utc),
            // A fixed offset has no gaps or folds, so this is always single.
            MeasuredAt::Naive(naive) => match reference.from_local_datetime(&naive).single() {
                Some(dt) => dt.with_timezone(&Utc),
                None => Utc.from_utc_datetime(&naive),
            },
        }
    }
}

impl From<Timestamp> for MeasuredAt {
    fn from(ts: Timestamp) -> Self {
        MeasuredAt::Zoned(ts.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for MeasuredAt {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        MeasuredAt::Zoned(dt)
    }
}

impl From<NaiveDateTime> for MeasuredAt {
    fn from(naive: NaiveDateTime) -> Self {
        MeasuredAt::Naive(naive)
    }
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// A reading as produced by the provider adapter or the fallback generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReading {
    /// Glucose value in mg/dL.
    pub value: i32,
    pub trend: Trend,
    pub measured_at: MeasuredAt,
}

/// DTO for persisting a new reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGlucoseReading {
    pub patient_id: PatientId,
    pub value: i32,
    pub trend: Trend,
    pub source: ReadingSource,
    /// When the measurement was taken (UTC).
    pub measured_at: Timestamp,
}

impl NewGlucoseReading {
    pub fn from_provider_reading(
        patient_id: PatientId,
        reading: &ProviderReading,
        source: ReadingSource,
        reference: FixedOffset,
    ) -> Self {
        Self {
            patient_id,
            value: reading.value,
            trend: reading.trend,
            source,
            measured_at: reading.measured_at.normalize(reference),
        }
    }
}

/// A persisted, immutable glucose reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlucoseReading {
    pub id: DbId,
    pub patient_id: PatientId,
    pub value: i32,
    pub trend: Trend,
    pub source: ReadingSource,
    pub measured_at: Timestamp,
    /// When the system stored the reading.
    pub recorded_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
