//! Persisted shape of a learner's state.
//!
//! The JSON layout is `{ "progress": { "<id>": { questionId, box, nextReviewDate,
//! lastReviewed, history: [{ date, correct, confidence }] } } }` with epoch
//! millisecond timestamps, `lastReviewed = 0` for never and confidence as its
//! numeric level. Every backend (SQLite blob, remote document) stores this shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use revise_core::model::{
    AppState, Confidence, HistoryEntry, MasteryBox, ProgressItem, ProgressMap, QuestionId,
};
use revise_core::time::{from_millis, to_millis};

use crate::repository::StorageError;

const NEVER_REVIEWED: i64 = 0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(default)]
    pub progress: BTreeMap<String, ProgressRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub question_id: String,
    #[serde(rename = "box")]
    pub box_level: i64,
    pub next_review_date: i64,
    #[serde(default)]
    pub last_reviewed: i64,
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
}

/// Document as read, before each entry is checked on its own.
#[derive(Deserialize)]
struct RawStateRecord {
    #[serde(default)]
    progress: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub date: i64,
    pub correct: bool,
    pub confidence: u8,
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

impl StateRecord {
    #[must_use]
    pub fn from_state(state: &AppState) -> Self {
        let progress = state
            .progress
            .iter()
            .map(|(id, item)| (id.as_str().to_owned(), ProgressRecord::from_item(item)))
            .collect();
        Self { progress }
    }

    /// Convert the record back into domain state, repairing each item on its own.
    ///
    /// Out-of-range boxes are clamped into `0..=5`. History entries with an
    /// unusable confidence level or date are dropped. An unreadable
    /// `nextReviewDate` puts the item back in box 0, due at `loaded_at`; an
    /// unreadable `lastReviewed` reads as never reviewed.
    #[must_use]
    pub fn into_state(self, loaded_at: DateTime<Utc>) -> AppState {
        let progress: ProgressMap = self
            .progress
            .into_iter()
            .map(|(key, record)| {
                let id = QuestionId::new(key);
                (id.clone(), record.into_item(id, loaded_at))
            })
            .collect();
        AppState::new(progress)
    }

    /// Parse the JSON document form.
    ///
    /// Entries that do not have the progress item shape are dropped with a
    /// warning so the rest of the document still loads.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the document itself is malformed.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        let raw: RawStateRecord = serde_json::from_str(raw).map_err(ser)?;
        let mut progress = BTreeMap::new();
        for (key, value) in raw.progress {
            match serde_json::from_value::<ProgressRecord>(value) {
                Ok(record) => {
                    progress.insert(key, record);
                }
                Err(err) => {
                    tracing::warn!(question = %key, error = %err, "dropped unreadable progress entry");
                }
            }
        }
        Ok(Self { progress })
    }

    /// Render the JSON document form.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(ser)
    }
}

impl ProgressRecord {
    #[must_use]
    pub fn from_item(item: &ProgressItem) -> Self {
        Self {
            question_id: item.question_id().as_str().to_owned(),
            box_level: i64::from(item.box_level().level()),
            next_review_date: to_millis(item.next_review_at()),
            last_reviewed: item.last_reviewed_at().map_or(NEVER_REVIEWED, to_millis),
            history: item
                .history()
                .iter()
                .map(|entry| HistoryRecord {
                    date: to_millis(entry.date),
                    correct: entry.correct,
                    confidence: entry.confidence.level(),
                })
                .collect(),
        }
    }

    fn into_item(self, id: QuestionId, loaded_at: DateTime<Utc>) -> ProgressItem {
        let mut box_level = MasteryBox::clamped(self.box_level);
        if i64::from(box_level.level()) != self.box_level {
            tracing::warn!(
                question = %id,
                stored = self.box_level,
                repaired = %box_level,
                "clamped out-of-range box in saved progress"
            );
        }

        let next_review_at = match from_millis(self.next_review_date) {
            Some(at) => at,
            None => {
                tracing::warn!(
                    question = %id,
                    stored = self.next_review_date,
                    "unreadable nextReviewDate, rescheduling as due now"
                );
                box_level = MasteryBox::RESET;
                loaded_at
            }
        };
        let last_reviewed_at = match self.last_reviewed {
            NEVER_REVIEWED => None,
            ms => {
                let at = from_millis(ms);
                if at.is_none() {
                    tracing::warn!(
                        question = %id,
                        stored = ms,
                        "unreadable lastReviewed, treating as never reviewed"
                    );
                }
                at
            }
        };

        let stored = self.history.len();
        let history: Vec<HistoryEntry> = self
            .history
            .into_iter()
            .filter_map(HistoryRecord::into_entry)
            .collect();
        if history.len() != stored {
            tracing::warn!(
                question = %id,
                dropped = stored - history.len(),
                "dropped unreadable history entries"
            );
        }

        ProgressItem::from_persisted(id, box_level, next_review_at, last_reviewed_at, history)
    }
}

impl HistoryRecord {
    fn into_entry(self) -> Option<HistoryEntry> {
        let confidence = Confidence::from_level(self.confidence)
            .ok()
            .filter(|c| c.is_set())?;
        let date = from_millis(self.date)?;
        Some(HistoryEntry::new(date, self.correct, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use revise_core::scheduler::{apply_grade, create_default_progress};
    use revise_core::time::{FIXED_TEST_MILLIS, fixed_now};

    fn graded_state() -> AppState {
        let t = fixed_now();
        let item = create_default_progress(QuestionId::new("q1"), t);
        let item = apply_grade(&item, true, Confidence::High, t).unwrap();
        let item = apply_grade(&item, false, Confidence::Low, t + Duration::milliseconds(1_234)).unwrap();
        let untouched = create_default_progress(QuestionId::new("q2"), t);
        AppState::default().with_item(item).with_item(untouched)
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = graded_state();
        let json = StateRecord::from_state(&state).to_json().unwrap();
        let back = StateRecord::from_json(&json).unwrap().into_state(fixed_now());
        assert_eq!(back, state);
    }

    #[test]
    fn never_reviewed_is_written_as_zero() {
        let state = graded_state();
        let record = StateRecord::from_state(&state);
        let q2 = &record.progress["q2"];
        assert_eq!(q2.last_reviewed, 0);
        assert_eq!(q2.next_review_date, FIXED_TEST_MILLIS);
        assert_eq!(record.progress["q1"].history[1].confidence, 1);
    }

    #[test]
    fn reads_the_browser_layout() {
        let raw = r#"{"progress":{"q9":{"questionId":"q9","box":2,
            "nextReviewDate":1700000000000,"lastReviewed":1699990000000,
            "history":[{"date":1699990000000,"correct":true,"confidence":3}]}}}"#;
        let state = StateRecord::from_json(raw).unwrap().into_state(fixed_now());
        let item = state.item(&QuestionId::new("q9")).unwrap();
        assert_eq!(item.box_level().level(), 2);
        assert_eq!(item.history()[0].confidence, Confidence::High);
        assert!(item.last_reviewed_at().is_some());
    }

    #[test]
    fn corrupt_boxes_and_history_are_repaired() {
        let raw = r#"{"progress":{"q1":{"box":9,"nextReviewDate":0,"lastReviewed":0,
            "history":[{"date":5,"correct":true,"confidence":7},
                       {"date":6,"correct":false,"confidence":0},
                       {"date":7,"correct":false,"confidence":2}]},
            "q2":{"box":-4,"nextReviewDate":0}}}"#;
        let state = StateRecord::from_json(raw).unwrap().into_state(fixed_now());

        let q1 = state.item(&QuestionId::new("q1")).unwrap();
        assert_eq!(q1.box_level(), MasteryBox::MAX);
        assert_eq!(q1.history().len(), 1);
        assert_eq!(q1.history()[0].confidence, Confidence::Medium);

        let q2 = state.item(&QuestionId::new("q2")).unwrap();
        assert_eq!(q2.box_level(), MasteryBox::RESET);
        assert!(q2.history().is_empty());
    }

    #[test]
    fn one_unreadable_item_does_not_lose_the_others() {
        let raw = r#"{"progress":{
            "good":{"questionId":"good","box":3,"nextReviewDate":1700000000000,
                    "lastReviewed":1699990000000,
                    "history":[{"date":1699990000000,"correct":true,"confidence":3}]},
            "bad":{"questionId":"bad","box":4,"nextReviewDate":9000000000000000,
                   "lastReviewed":-9000000000000000,
                   "history":[{"date":1699990000000,"correct":true,"confidence":2}]},
            "mangled":{"box":"three","nextReviewDate":null}}}"#;
        let loaded_at = fixed_now() + Duration::days(2);

        let state = StateRecord::from_json(raw).unwrap().into_state(loaded_at);

        assert_eq!(state.progress.len(), 2);
        let good = state.item(&QuestionId::new("good")).unwrap();
        assert_eq!(good.box_level().level(), 3);
        assert_eq!(good.next_review_at(), fixed_now());

        let bad = state.item(&QuestionId::new("bad")).unwrap();
        assert_eq!(bad.box_level(), MasteryBox::RESET);
        assert_eq!(bad.next_review_at(), loaded_at);
        assert_eq!(bad.last_reviewed_at(), None);
        assert_eq!(bad.history().len(), 1);

        assert!(state.item(&QuestionId::new("mangled")).is_none());
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = StateRecord::from_json("{not json").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
