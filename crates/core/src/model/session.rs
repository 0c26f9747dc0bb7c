use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Confidence, HistoryEntry};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many answers for a single session: {len}")]
    TooManyAnswers { len: usize },
}

/// Aggregate summary for a finished study session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total: u32,
    correct: u32,
    low: u32,
    medium: u32,
    high: u32,
}

impl SessionSummary {
    /// Build a summary from the grading events recorded during a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `SessionSummaryError::TooManyAnswers` if the answer count cannot fit in `u32`.
    pub fn from_answers(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        answers: &[HistoryEntry],
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        let total = u32::try_from(answers.len())
            .map_err(|_| SessionSummaryError::TooManyAnswers { len: answers.len() })?;

        let mut correct = 0_u32;
        let mut low = 0_u32;
        let mut medium = 0_u32;
        let mut high = 0_u32;

        for answer in answers {
            if answer.correct {
                correct = correct.saturating_add(1);
            }
            match answer.confidence {
                Confidence::Low => low = low.saturating_add(1),
                Confidence::Medium => medium = medium.saturating_add(1),
                Confidence::High => high = high.saturating_add(1),
                Confidence::Unset => {}
            }
        }

        Ok(Self {
            started_at,
            completed_at,
            total,
            correct,
            low,
            medium,
            high,
        })
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn low_confidence(&self) -> u32 {
        self.low
    }

    #[must_use]
    pub fn medium_confidence(&self) -> u32 {
        self.medium
    }

    #[must_use]
    pub fn high_confidence(&self) -> u32 {
        self.high
    }

    /// Share of correct answers as a rounded percentage; 0 for an empty session.
    #[must_use]
    pub fn score_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.correct * 200 + self.total) / (self.total * 2)
    }
}
