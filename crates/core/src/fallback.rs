//! Synthetic readings substituted when the provider yields nothing.

use std::ops::RangeInclusive;

use rand::Rng;

use crate::error::CoreError;
use crate::glucose::{MeasuredAt, ProviderReading, Trend};
use crate::types::{PatientId, Timestamp};

/// Lowest synthetic value (mg/dL).
pub const DEFAULT_FALLBACK_MIN: i32 = 10;

/// Highest synthetic value (mg/dL).
pub const DEFAULT_FALLBACK_MAX: i32 = 250;

/// Produces a substitute reading so a run never stalls on the provider.
///
/// Every call yields a new, independent reading; nothing is cached or
/// deduplicated between calls.
pub trait FallbackGenerator: Send + Sync {
    fn generate(&self, patient_id: PatientId, now: Timestamp) -> ProviderReading;
}

/// Uniformly random values within a range, trend `FLAT`, measured `now`.
#[derive(Debug, Clone)]
pub struct RandomFallback {
    range: RangeInclusive<i32>,
}

impl RandomFallback {
    pub fn new(min: i32, max: i32) -> Result<Self, CoreError> {
        if min > max {
            return Err(CoreError::Validation(format!(
                "fallback minimum ({min}) exceeds maximum ({max})"
            )));
        }
        Ok(Self { range: min..=max })
    }
}

impl Default for RandomFallback {
    fn default() -> Self {
        Self {
            range: DEFAULT_FALLBACK_MIN..=DEFAULT_FALLBACK_MAX,
        }
    }
}

impl FallbackGenerator for RandomFallback {
    fn generate(&self, _patient_id: PatientId, now: Timestamp) -> ProviderReading {
        ProviderReading {
            value: rand::rng().random_range(self.range.clone()),
            trend: Trend::Flat,
            measured_at: MeasuredAt::from(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    #[test]
    fn values_stay_within_range() {
        let generator = RandomFallback::new(100, 110).unwrap();
        let now = Utc::now();
        for _ in 0..200 {
            let reading = generator.generate(PatientId::nil(), now);
            assert!((100..=110).contains(&reading.value));
            assert_eq!(reading.trend, Trend::Flat);
            assert_eq!(reading.measured_at, MeasuredAt::from(now));
        }
    }

    #[test]
    fn single_value_range_is_allowed() {
        let generator = RandomFallback::new(120, 120).unwrap();
        assert_eq!(generator.generate(PatientId::nil(), Utc::now()).value, 120);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(RandomFallback::new(250, 10).is_err());
    }
}
