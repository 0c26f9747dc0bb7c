use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{Confidence, HistoryEntry, MasteryBox, ProgressItem, ProgressMap, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("a confidence level must be chosen before grading")]
    UnsetConfidence,
    #[error("box level must be in 0..=5, got {provided}")]
    BoxOutOfRange { provided: i64 },
}

//
// ─── INTERVALS ─────────────────────────────────────────────────────────────────
//

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Review interval per box, in milliseconds. Non-decreasing in box index.
///
/// Box 0 is due immediately; boxes 1..=5 wait 1, 3, 7, 14 and 30 days.
pub const INTERVALS_MS: [i64; 6] = [
    0,
    MS_PER_DAY,
    3 * MS_PER_DAY,
    7 * MS_PER_DAY,
    14 * MS_PER_DAY,
    30 * MS_PER_DAY,
];

/// Review interval for a box.
#[must_use]
pub fn interval(box_level: MasteryBox) -> Duration {
    Duration::milliseconds(INTERVALS_MS[box_level.index()])
}

//
// ─── TRANSITIONS ───────────────────────────────────────────────────────────────
//

/// Box reached after one answer.
///
/// - incorrect: back to box 0 whatever the confidence
/// - correct + high: up one box, capped at 5
/// - correct + medium: unchanged
/// - correct + low: down one box, floored at 0
///
/// The last rule treats a lucky guess as a partial miss. It is a product
/// decision, not a general spaced-repetition rule.
///
/// # Errors
///
/// Returns `SchedulerError::UnsetConfidence` for `Confidence::Unset`.
pub fn next_box(
    current: MasteryBox,
    correct: bool,
    confidence: Confidence,
) -> Result<MasteryBox, SchedulerError> {
    let next = match (correct, confidence) {
        (_, Confidence::Unset) => return Err(SchedulerError::UnsetConfidence),
        (false, _) => MasteryBox::RESET,
        (true, Confidence::High) => current.promote(),
        (true, Confidence::Medium) => current,
        (true, Confidence::Low) => current.demote(),
    };
    Ok(next)
}

/// Default item for a question that has never been graded: box 0, due `now`.
#[must_use]
pub fn create_default_progress(question_id: QuestionId, now: DateTime<Utc>) -> ProgressItem {
    ProgressItem::new(question_id, now)
}

/// Apply one grading event and return the next item.
///
/// `item` is left untouched; the caller replaces the map entry with the result.
/// The new item has `last_reviewed_at = now`, `next_review_at = now + interval`
/// and one more history entry.
///
/// # Errors
///
/// Returns `SchedulerError::UnsetConfidence` if no confidence level was chosen.
///
/// # Examples
///
/// ```
/// # use revise_core::model::{Confidence, QuestionId};
/// # use revise_core::scheduler::{apply_grade, create_default_progress};
/// # use revise_core::time::fixed_now;
/// let now = fixed_now();
/// let item = create_default_progress(QuestionId::new("q1"), now);
/// let next = apply_grade(&item, true, Confidence::High, now)?;
///
/// assert_eq!(next.box_level().level(), 1);
/// assert_eq!(next.next_review_at(), now + chrono::Duration::days(1));
/// assert_eq!(next.history().len(), 1);
/// # Ok::<(), revise_core::scheduler::SchedulerError>(())
/// ```
pub fn apply_grade(
    item: &ProgressItem,
    correct: bool,
    confidence: Confidence,
    now: DateTime<Utc>,
) -> Result<ProgressItem, SchedulerError> {
    let next = next_box(item.box_level(), correct, confidence)?;
    let entry = HistoryEntry::new(now, correct, confidence);
    Ok(item.graded(next, now + interval(next), entry))
}

/// Whether an item is eligible for review at `now`.
#[must_use]
pub fn is_due(item: &ProgressItem, now: DateTime<Utc>) -> bool {
    now >= item.next_review_at()
}

/// Due check against a progress map; questions without an item are always due.
#[must_use]
pub fn is_question_due(progress: &ProgressMap, question_id: &QuestionId, now: DateTime<Utc>) -> bool {
    progress.get(question_id).is_none_or(|item| is_due(item, now))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
