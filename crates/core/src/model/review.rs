use chrono::{DateTime, Utc};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur while decoding review inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("invalid confidence level: {0}")]
    InvalidConfidence(u8),
}

//
// ─── CONFIDENCE ───────────────────────────────────────────────────────────────
//

/// Learner's self-reported certainty at answer time.
///
/// `Unset` is the "nothing picked yet" placeholder used by input forms. It is
/// rejected by the scheduler: a grade needs a real confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Confidence {
    #[default]
    Unset,
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Levels a learner can actually pick, in ascending order.
    pub const SELECTABLE: [Confidence; 3] = [Confidence::Low, Confidence::Medium, Confidence::High];

    /// Converts a numeric level (0-3) to a `Confidence`.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidConfidence` if the value is not in the range 0-3.
    pub fn from_level(value: u8) -> Result<Self, ReviewError> {
        match value {
            0 => Ok(Self::Unset),
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            _ => Err(ReviewError::InvalidConfidence(value)),
        }
    }

    /// Numeric level used in persisted records.
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Confidence::Unset => 0,
            Confidence::Low => 1,
            Confidence::Medium => 2,
            Confidence::High => 3,
        }
    }

    #[must_use]
    pub fn is_set(self) -> bool {
        !matches!(self, Confidence::Unset)
    }
}

//
// ─── HISTORY ──────────────────────────────────────────────────────────────────
//

/// One grading event in a question's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub correct: bool,
    pub confidence: Confidence,
}

impl HistoryEntry {
    #[must_use]
    pub fn new(date: DateTime<Utc>, correct: bool, confidence: Confidence) -> Self {
        Self {
            date,
            correct,
            confidence,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_confidence_conversion_works() {
        assert_eq!(Confidence::from_level(0).unwrap(), Confidence::Unset);
        assert_eq!(Confidence::from_level(3).unwrap(), Confidence::High);
        let err = Confidence::from_level(4).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidConfidence(4)));
    }

    #[test]
    fn level_round_trips_through_from_level() {
        for c in Confidence::SELECTABLE {
            assert_eq!(Confidence::from_level(c.level()).unwrap(), c);
            assert!(c.is_set());
        }
        assert!(!Confidence::default().is_set());
    }
}
