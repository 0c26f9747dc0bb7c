use async_trait::async_trait;
use revise_core::model::AppState;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("remote store responded with status {0}")]
    RemoteStatus(u16),

    #[error("invalid remote url: {0}")]
    InvalidUrl(String),
}

/// Persistence contract for a learner's saved state.
///
/// Implementations store the whole `AppState` as one record; the scheduler
/// never sees where it lives.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the saved state, or `None` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend is unreachable or the record is corrupt.
    async fn load_state(&self) -> Result<Option<AppState>, StorageError>;

    /// Replace the saved state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be stored.
    async fn save_state(&self, state: &AppState) -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    state: Arc<Mutex<Option<AppState>>>,
}

impl InMemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `state`.
    #[must_use]
    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Arc::new(Mutex::new(Some(state))),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load_state(&self) -> Result<Option<AppState>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_state(&self, state: &AppState) -> Result<(), StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revise_core::model::{Confidence, QuestionId};
    use revise_core::scheduler::{apply_grade, create_default_progress};
    use revise_core::time::fixed_now;

    #[tokio::test]
    async fn empty_store_loads_none() {
        let store = InMemoryStateStore::new();
        assert!(store.load_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_state_is_returned_on_load() {
        let store = InMemoryStateStore::new();
        let now = fixed_now();
        let item = apply_grade(
            &create_default_progress(QuestionId::new("q1"), now),
            true,
            Confidence::High,
            now,
        )
        .unwrap();
        let state = AppState::default().with_item(item);

        store.save_state(&state).await.unwrap();

        assert_eq!(store.load_state().await.unwrap(), Some(state));
    }
}
