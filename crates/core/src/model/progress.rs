use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

use crate::model::ids::QuestionId;
use crate::model::review::HistoryEntry;
use crate::scheduler::SchedulerError;

//
// ─── MASTERY BOX ───────────────────────────────────────────────────────────────
//

/// Leitner box level, always within `0..=5`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MasteryBox(u8);

impl MasteryBox {
    /// Lowest box: new or just missed, due immediately.
    pub const RESET: MasteryBox = MasteryBox(0);
    /// Highest box.
    pub const MAX: MasteryBox = MasteryBox(5);

    /// Creates a box level.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::BoxOutOfRange` for values above 5.
    pub fn new(level: u8) -> Result<Self, SchedulerError> {
        if level > Self::MAX.0 {
            return Err(SchedulerError::BoxOutOfRange {
                provided: i64::from(level),
            });
        }
        Ok(Self(level))
    }

    /// Repairs a persisted level by clamping it into `0..=5`.
    #[must_use]
    pub fn clamped(raw: i64) -> Self {
        let level = raw.clamp(0, i64::from(Self::MAX.0));
        Self(u8::try_from(level).unwrap_or(Self::MAX.0))
    }

    #[must_use]
    pub fn level(self) -> u8 {
        self.0
    }

    /// One box up, capped at `MAX`.
    #[must_use]
    pub fn promote(self) -> Self {
        Self((self.0 + 1).min(Self::MAX.0))
    }

    /// One box down, floored at `RESET`.
    #[must_use]
    pub fn demote(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Debug for MasteryBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasteryBox({})", self.0)
    }
}

impl fmt::Display for MasteryBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── PROGRESS ITEM ─────────────────────────────────────────────────────────────
//

/// Scheduling state of one attempted question.
///
/// Items are values: grading produces a new item via the scheduler, the input
/// is never modified. `history` only ever grows, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressItem {
    question_id: QuestionId,
    box_level: MasteryBox,
    next_review_at: DateTime<Utc>,
    last_reviewed_at: Option<DateTime<Utc>>,
    history: Vec<HistoryEntry>,
}

impl ProgressItem {
    /// Fresh item for a never-graded question: box 0, due at `now`, no history.
    #[must_use]
    pub fn new(question_id: QuestionId, now: DateTime<Utc>) -> Self {
        Self {
            question_id,
            box_level: MasteryBox::RESET,
            next_review_at: now,
            last_reviewed_at: None,
            history: Vec::new(),
        }
    }

    /// Rehydrate an item from persisted storage.
    #[must_use]
    pub fn from_persisted(
        question_id: QuestionId,
        box_level: MasteryBox,
        next_review_at: DateTime<Utc>,
        last_reviewed_at: Option<DateTime<Utc>>,
        history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            question_id,
            box_level,
            next_review_at,
            last_reviewed_at,
            history,
        }
    }

    /// Copy of this item after one grading event.
    pub(crate) fn graded(
        &self,
        box_level: MasteryBox,
        next_review_at: DateTime<Utc>,
        entry: HistoryEntry,
    ) -> Self {
        let mut history = Vec::with_capacity(self.history.len() + 1);
        history.extend_from_slice(&self.history);
        history.push(entry);

        Self {
            question_id: self.question_id.clone(),
            box_level,
            next_review_at,
            last_reviewed_at: Some(entry.date),
            history,
        }
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    #[must_use]
    pub fn box_level(&self) -> MasteryBox {
        self.box_level
    }

    #[must_use]
    pub fn next_review_at(&self) -> DateTime<Utc> {
        self.next_review_at
    }

    /// `None` when the item has never been graded.
    #[must_use]
    pub fn last_reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.last_reviewed_at
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

//
// ─── PROGRESS MAP / APP STATE ──────────────────────────────────────────────────
//

/// Per-learner scheduling state, one entry per attempted question.
pub type ProgressMap = HashMap<QuestionId, ProgressItem>;

/// Everything the persistence layer stores for a learner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub progress: ProgressMap,
}

impl AppState {
    #[must_use]
    pub fn new(progress: ProgressMap) -> Self {
        Self { progress }
    }

    /// Current item for a question, if it was ever graded.
    #[must_use]
    pub fn item(&self, id: &QuestionId) -> Option<&ProgressItem> {
        self.progress.get(id)
    }

    /// Returns a new state with `item` replacing any entry for the same question.
    #[must_use]
    pub fn with_item(&self, item: ProgressItem) -> Self {
        let mut progress = self.progress.clone();
        progress.insert(item.question_id().clone(), item);
        Self { progress }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::review::Confidence;
    use crate::time::fixed_now;

    #[test]
    fn box_rejects_levels_above_max() {
        assert!(MasteryBox::new(5).is_ok());
        let err = MasteryBox::new(6).unwrap_err();
        assert!(matches!(err, SchedulerError::BoxOutOfRange { provided: 6 }));
    }

    #[test]
    fn clamped_repairs_corrupt_levels() {
        assert_eq!(MasteryBox::clamped(-3), MasteryBox::RESET);
        assert_eq!(MasteryBox::clamped(9), MasteryBox::MAX);
        assert_eq!(MasteryBox::clamped(2).level(), 2);
    }

    #[test]
    fn promote_and_demote_saturate() {
        assert_eq!(MasteryBox::MAX.promote(), MasteryBox::MAX);
        assert_eq!(MasteryBox::RESET.demote(), MasteryBox::RESET);
        assert_eq!(MasteryBox::RESET.promote().level(), 1);
    }

    #[test]
    fn new_item_is_box_zero_and_never_reviewed() {
        let now = fixed_now();
        let item = ProgressItem::new(QuestionId::new("q1"), now);
        assert_eq!(item.box_level(), MasteryBox::RESET);
        assert_eq!(item.next_review_at(), now);
        assert_eq!(item.last_reviewed_at(), None);
        assert!(item.history().is_empty());
    }

    #[test]
    fn with_item_leaves_original_state_untouched() {
        let now = fixed_now();
        let state = AppState::default();
        let item = ProgressItem::new(QuestionId::new("q1"), now).graded(
            MasteryBox::RESET.promote(),
            now,
            HistoryEntry::new(now, true, Confidence::High),
        );

        let next = state.with_item(item.clone());

        assert!(state.progress.is_empty());
        assert_eq!(next.item(&QuestionId::new("q1")), Some(&item));
    }
}
