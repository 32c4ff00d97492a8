//! Glucose reading rows (append-only).

use glucowatch_core::error::CoreError;
use glucowatch_core::glucose::GlucoseReading;
use glucowatch_core::types::{DbId, PatientId, Timestamp};
use sqlx::FromRow;

/// A row from `glucose_readings`. Trend and source are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct GlucoseReadingRow {
    pub id: DbId,
    pub patient_id: PatientId,
    pub value: i32,
    pub trend: String,
    pub source: String,
    pub measured_at: Timestamp,
    pub recorded_at: Timestamp,
}

impl TryFrom<GlucoseReadingRow> for GlucoseReading {
    type Error = CoreError;

    fn try_from(row: GlucoseReadingRow) -> Result<Self, Self::Error> {
        Ok(GlucoseReading {
            id: row.id,
            patient_id: row.patient_id,
            value: row.value,
            trend: row.trend.parse()?,
            source: row.source.parse()?,
            measured_at: row.measured_at,
            recorded_at: row.recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use glucowatch_core::glucose::{ReadingSource, Trend};

    fn row(trend: &str, source: &str) -> GlucoseReadingRow {
        let now = Utc::now();
        GlucoseReadingRow {
            id: 1,
            patient_id: PatientId::nil(),
            value: 110,
            trend: trend.into(),
            source: source.into(),
            measured_at: now,
            recorded_at: now,
        }
    }

    #[test]
    fn converts_stored_text_columns() {
        let reading = GlucoseReading::try_from(row("SINGLE_DOWN", "synthetic")).unwrap();
        assert_eq!(reading.trend, Trend::SingleDown);
        assert_eq!(reading.source, ReadingSource::Synthetic);
        assert_eq!(reading.value, 110);
    }

    #[test]
    fn unknown_source_is_an_error() {
        assert!(GlucoseReading::try_from(row("FLAT", "mock")).is_err());
    }
}
