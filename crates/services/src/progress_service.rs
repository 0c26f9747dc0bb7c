use chrono::{DateTime, Utc};

use revise_core::{
    model::{AppState, Confidence, ProgressItem, QuestionId},
    scheduler::{apply_grade, create_default_progress},
    time::Clock,
};
use storage::{RemoteSync, TieredStore};

use crate::error::ProgressError;

//
// ─── PERSIST STATUS ────────────────────────────────────────────────────────────
//

/// How far a graded answer got towards durable storage.
///
/// The in-memory state reflects the answer in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    /// Written to the local store; `remote` tells what happened to the mirror.
    Saved { remote: RemoteSync },
    /// The local write failed; the state only lives in memory until the next save.
    LocalFailed(String),
}

impl PersistStatus {
    /// True when the local store holds the new state.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistStatus::Saved { .. })
    }
}

/// Result of grading one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    pub item: ProgressItem,
    pub persist: PersistStatus,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Single owner of the learner's `AppState`.
///
/// Every grading event is a read-modify-write: read the current item (or the
/// default for a new question), compute the next item, swap in a new state with
/// the replaced entry, then hand that state to the store. Mutation needs
/// `&mut self`, so writes are serialized by construction.
pub struct ProgressService {
    clock: Clock,
    store: TieredStore,
    state: AppState,
}

impl ProgressService {
    /// Load saved state from `store` and take ownership of it.
    ///
    /// Returns the remote sync status of the load alongside the service.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the local store cannot be read.
    pub async fn open(clock: Clock, store: TieredStore) -> Result<(Self, RemoteSync), ProgressError> {
        let loaded = store.load().await?;
        tracing::debug!(
            items = loaded.state.progress.len(),
            remote = ?loaded.remote,
            "loaded learner progress"
        );
        Ok((
            Self {
                clock,
                store,
                state: loaded.state,
            },
            loaded.remote,
        ))
    }

    /// Service over an already-loaded state.
    #[must_use]
    pub fn from_state(clock: Clock, store: TieredStore, state: AppState) -> Self {
        Self {
            clock,
            store,
            state,
        }
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[must_use]
    pub fn item(&self, id: &QuestionId) -> Option<&ProgressItem> {
        self.state.item(id)
    }

    /// Grade an answer to `question_id` and persist the new state.
    ///
    /// A failed save is logged and reported in [`GradeOutcome::persist`]; it never
    /// undoes the in-memory update.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Scheduler` for `Confidence::Unset`; state is left unchanged.
    pub async fn record_grade(
        &mut self,
        question_id: &QuestionId,
        correct: bool,
        confidence: Confidence,
    ) -> Result<GradeOutcome, ProgressError> {
        let now = self.clock.now();
        let item = match self.state.item(question_id) {
            Some(existing) => apply_grade(existing, correct, confidence, now)?,
            None => apply_grade(
                &create_default_progress(question_id.clone(), now),
                correct,
                confidence,
                now,
            )?,
        };

        self.state = self.state.with_item(item.clone());
        let persist = self.persist().await;

        tracing::debug!(
            question = %question_id,
            correct,
            confidence = ?confidence,
            box_level = %item.box_level(),
            "graded answer"
        );

        Ok(GradeOutcome { item, persist })
    }

    /// Write the current state through the store.
    pub async fn persist(&self) -> PersistStatus {
        match self.store.save(&self.state).await {
            Ok(report) => PersistStatus::Saved {
                remote: report.remote,
            },
            Err(err) => {
                tracing::warn!(error = %err, "saving progress failed, keeping in-memory state");
                PersistStatus::LocalFailed(err.to_string())
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use revise_core::model::MasteryBox;
    use revise_core::scheduler::SchedulerError;
    use revise_core::time::{fixed_clock, fixed_now};
    use std::sync::Arc;
    use storage::{InMemoryStateStore, StateStore, StorageError};

    struct FailingStore;

    #[async_trait]
    impl StateStore for FailingStore {
        async fn load_state(&self) -> Result<Option<AppState>, StorageError> {
            Ok(None)
        }

        async fn save_state(&self, _state: &AppState) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk full".into()))
        }
    }

    async fn service_with(local: InMemoryStateStore) -> ProgressService {
        let store = TieredStore::local_only(Arc::new(local));
        let (service, remote) = ProgressService::open(fixed_clock(), store).await.unwrap();
        assert_eq!(remote, RemoteSync::Disabled);
        service
    }

    #[tokio::test]
    async fn first_grade_synthesizes_default_item() {
        let local = InMemoryStateStore::new();
        let mut service = service_with(local.clone()).await;
        let q = QuestionId::new("q1");

        let outcome = service.record_grade(&q, true, Confidence::High).await.unwrap();

        assert_eq!(outcome.item.box_level().level(), 1);
        assert_eq!(outcome.item.history().len(), 1);
        assert_eq!(outcome.item.last_reviewed_at(), Some(fixed_now()));
        assert!(outcome.persist.is_saved());
        assert_eq!(service.item(&q), Some(&outcome.item));

        let saved = local.load_state().await.unwrap().unwrap();
        assert_eq!(saved.item(&q), Some(&outcome.item));
    }

    #[tokio::test]
    async fn later_grades_build_on_the_stored_item() {
        let mut service = service_with(InMemoryStateStore::new()).await;
        let q = QuestionId::new("q1");

        service.record_grade(&q, true, Confidence::High).await.unwrap();
        service.clock_mut().advance(Duration::days(1));
        let outcome = service.record_grade(&q, true, Confidence::High).await.unwrap();

        assert_eq!(outcome.item.box_level().level(), 2);
        assert_eq!(outcome.item.history().len(), 2);
        assert_eq!(
            outcome.item.next_review_at(),
            fixed_now() + Duration::days(1) + Duration::days(3)
        );
    }

    #[tokio::test]
    async fn unset_confidence_leaves_state_untouched() {
        let mut service = service_with(InMemoryStateStore::new()).await;
        let err = service
            .record_grade(&QuestionId::new("q1"), true, Confidence::Unset)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProgressError::Scheduler(SchedulerError::UnsetConfidence)
        ));
        assert!(service.state().progress.is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_in_memory_update() {
        let store = TieredStore::local_only(Arc::new(FailingStore));
        let mut service = ProgressService::from_state(fixed_clock(), store, AppState::default());
        let q = QuestionId::new("q1");

        let outcome = service.record_grade(&q, false, Confidence::Medium).await.unwrap();

        assert!(matches!(outcome.persist, PersistStatus::LocalFailed(_)));
        assert_eq!(
            service.item(&q).map(ProgressItem::box_level),
            Some(MasteryBox::RESET)
        );
    }

    #[tokio::test]
    async fn open_restores_saved_state() {
        let local = InMemoryStateStore::new();
        {
            let mut service = service_with(local.clone()).await;
            service
                .record_grade(&QuestionId::new("q1"), true, Confidence::High)
                .await
                .unwrap();
        }

        let reopened = service_with(local).await;
        assert_eq!(reopened.state().progress.len(), 1);
    }
}
