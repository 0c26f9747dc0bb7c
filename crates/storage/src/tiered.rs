use std::sync::Arc;

use revise_core::model::{AppState, ProgressItem};

use crate::repository::{StateStore, StorageError};

/// Outcome of the remote half of a load or save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSync {
    /// No remote store configured.
    Disabled,
    Synced,
    /// The remote call failed; local state was used or written regardless.
    Failed(String),
}

impl RemoteSync {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, RemoteSync::Failed(_))
    }
}

/// State returned by [`TieredStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub state: AppState,
    pub remote: RemoteSync,
}

/// Result of [`TieredStore::save`]. The local write always succeeded when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub remote: RemoteSync,
}

/// Local store plus an optional remote mirror.
///
/// Precedence:
/// - load reads local, then merges the remote document in per question
///   (see [`merge_states`]); a failed remote load degrades to local only.
/// - save writes local first and returns its error; the remote write is best
///   effort and its failure is only reported.
#[derive(Clone)]
pub struct TieredStore {
    local: Arc<dyn StateStore>,
    remote: Option<Arc<dyn StateStore>>,
}

impl TieredStore {
    #[must_use]
    pub fn local_only(local: Arc<dyn StateStore>) -> Self {
        Self {
            local,
            remote: None,
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn StateStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Load the learner's state.
    ///
    /// # Errors
    ///
    /// Returns the local store's error; remote errors never fail the load.
    pub async fn load(&self) -> Result<LoadedState, StorageError> {
        let local = self.local.load_state().await?.unwrap_or_default();

        let Some(remote) = &self.remote else {
            return Ok(LoadedState {
                state: local,
                remote: RemoteSync::Disabled,
            });
        };

        match remote.load_state().await {
            Ok(Some(remote_state)) => Ok(LoadedState {
                state: merge_states(local, remote_state),
                remote: RemoteSync::Synced,
            }),
            Ok(None) => Ok(LoadedState {
                state: local,
                remote: RemoteSync::Synced,
            }),
            Err(err) => {
                tracing::warn!(error = %err, "remote load failed, continuing with local state");
                Ok(LoadedState {
                    state: local,
                    remote: RemoteSync::Failed(err.to_string()),
                })
            }
        }
    }

    /// Persist the learner's state.
    ///
    /// # Errors
    ///
    /// Returns the local store's error. The remote write is skipped in that case.
    pub async fn save(&self, state: &AppState) -> Result<SaveReport, StorageError> {
        self.local.save_state(state).await?;

        let Some(remote) = &self.remote else {
            return Ok(SaveReport {
                remote: RemoteSync::Disabled,
            });
        };

        let remote = match remote.save_state(state).await {
            Ok(()) => RemoteSync::Synced,
            Err(err) => {
                tracing::warn!(error = %err, "remote sync failed, local state kept");
                RemoteSync::Failed(err.to_string())
            }
        };
        Ok(SaveReport { remote })
    }
}

/// Merge a remote state into the local one.
///
/// Keys from both sides are kept. When both sides hold an item for the same
/// question, the one reviewed more recently wins; ties go to local.
#[must_use]
pub fn merge_states(local: AppState, remote: AppState) -> AppState {
    let mut progress = local.progress;
    for (id, remote_item) in remote.progress {
        let keep_local = progress
            .get(&id)
            .is_some_and(|local_item| !remote_is_newer(local_item, &remote_item));
        if !keep_local {
            progress.insert(id, remote_item);
        }
    }
    AppState::new(progress)
}

fn remote_is_newer(local: &ProgressItem, remote: &ProgressItem) -> bool {
    remote.last_reviewed_at() > local.last_reviewed_at()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStateStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use revise_core::model::{Confidence, QuestionId};
    use revise_core::scheduler::{apply_grade, create_default_progress};
    use revise_core::time::fixed_now;

    struct BrokenStore;

    #[async_trait]
    impl StateStore for BrokenStore {
        async fn load_state(&self) -> Result<Option<AppState>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn save_state(&self, _state: &AppState) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    fn graded(id: &str, minutes: i64, confidence: Confidence) -> ProgressItem {
        let at = fixed_now() + Duration::minutes(minutes);
        apply_grade(
            &create_default_progress(QuestionId::new(id), fixed_now()),
            true,
            confidence,
            at,
        )
        .unwrap()
    }

    #[test]
    fn merge_prefers_most_recent_review() {
        let local = AppState::default()
            .with_item(graded("a", 10, Confidence::High))
            .with_item(graded("b", 1, Confidence::High));
        let remote = AppState::default()
            .with_item(graded("a", 5, Confidence::Medium))
            .with_item(graded("b", 20, Confidence::Medium))
            .with_item(graded("c", 1, Confidence::High));

        let merged = merge_states(local, remote);

        let a = merged.item(&QuestionId::new("a")).unwrap();
        assert_eq!(a.box_level().level(), 1);
        let b = merged.item(&QuestionId::new("b")).unwrap();
        assert_eq!(b.box_level().level(), 0);
        assert!(merged.item(&QuestionId::new("c")).is_some());
    }

    #[test]
    fn merge_ties_go_to_local() {
        let local = AppState::default().with_item(graded("a", 3, Confidence::High));
        let remote = AppState::default().with_item(graded("a", 3, Confidence::Medium));
        let merged = merge_states(local.clone(), remote);
        assert_eq!(merged, local);
    }

    #[tokio::test]
    async fn remote_failures_never_fail_local_persistence() {
        let local = InMemoryStateStore::new();
        let store = TieredStore::local_only(Arc::new(local.clone())).with_remote(Arc::new(BrokenStore));
        let state = AppState::default().with_item(graded("a", 0, Confidence::High));

        let report = store.save(&state).await.unwrap();
        assert!(report.remote.is_failed());
        assert_eq!(local.load_state().await.unwrap(), Some(state.clone()));

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.state, state);
        assert!(loaded.remote.is_failed());
    }

    #[tokio::test]
    async fn local_failure_is_returned() {
        let store = TieredStore::local_only(Arc::new(BrokenStore))
            .with_remote(Arc::new(InMemoryStateStore::new()));
        assert!(store.save(&AppState::default()).await.is_err());
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn remote_state_is_merged_on_load() {
        let remote_state = AppState::default().with_item(graded("r", 0, Confidence::High));
        let store = TieredStore::local_only(Arc::new(InMemoryStateStore::new()))
            .with_remote(Arc::new(InMemoryStateStore::with_state(remote_state.clone())));

        let loaded = store.load().await.unwrap();

        assert_eq!(loaded.state, remote_state);
        assert_eq!(loaded.remote, RemoteSync::Synced);
    }

    #[tokio::test]
    async fn local_only_reports_disabled_remote() {
        let store = TieredStore::local_only(Arc::new(InMemoryStateStore::new()));
        let loaded = store.load().await.unwrap();
        assert!(loaded.state.progress.is_empty());
        assert_eq!(loaded.remote, RemoteSync::Disabled);
        assert!(!store.has_remote());
    }
}
