//! Per-patient clinical thresholds.

use serde::Serialize;

use crate::error::CoreError;

/// Low threshold applied when a patient has no explicit setting (mg/dL).
pub const DEFAULT_LOW_THRESHOLD: i32 = 70;

/// High threshold applied when a patient has no explicit setting (mg/dL).
pub const DEFAULT_HIGH_THRESHOLD: i32 = 200;

/// Alerting bounds for one patient, in mg/dL.
///
/// Construction enforces `low < high`, so a value can never be both
/// below the low bound and above the high bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClinicalThresholds {
    low: i32,
    high: i32,
}

impl ClinicalThresholds {
    pub fn new(low: i32, high: i32) -> Result<Self, CoreError> {
        if low >= high {
            return Err(CoreError::Validation(format!(
                "low threshold ({low}) must be below high threshold ({high})"
            )));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> i32 {
        self.low
    }

    pub fn high(&self) -> i32 {
        self.high
    }

    /// The patient's own thresholds if set, otherwise `defaults`.
    pub fn resolve(explicit: Option<ClinicalThresholds>, defaults: ClinicalThresholds) -> Self {
        explicit.unwrap_or(defaults)
    }
}

impl Default for ClinicalThresholds {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_THRESHOLD,
            high: DEFAULT_HIGH_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_70_and_200() {
        let t = ClinicalThresholds::default();
        assert_eq!((t.low(), t.high()), (70, 200));
    }

    #[test]
    fn rejects_inverted_or_equal_bounds() {
        assert!(ClinicalThresholds::new(180, 80).is_err());
        assert!(ClinicalThresholds::new(100, 100).is_err());
        assert!(ClinicalThresholds::new(80, 180).is_ok());
    }

    #[test]
    fn resolve_prefers_explicit_setting() {
        let custom = ClinicalThresholds::new(80, 180).unwrap();
        let defaults = ClinicalThresholds::default();
        assert_eq!(ClinicalThresholds::resolve(Some(custom), defaults), custom);
        assert_eq!(ClinicalThresholds::resolve(None, defaults), defaults);
    }
}
