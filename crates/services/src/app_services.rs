use std::sync::Arc;

use revise_core::time::Clock;
use storage::{
    ContentCatalogue, HttpRemoteStore, RemoteConfig, RemoteSync, SqliteRepository, TieredStore,
};

use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::sessions::SessionLoopService;
use crate::tutor_service::TutorService;

/// Assembles app-facing services over a `SQLite` local store and an optional remote mirror.
pub struct AppServices {
    session_loop: SessionLoopService,
    tutor: TutorService,
    remote_on_load: RemoteSync,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened, the remote
    /// client cannot be built, or the saved state cannot be read.
    pub async fn new_sqlite(
        db_url: &str,
        catalogue: ContentCatalogue,
        remote: Option<RemoteConfig>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let local = SqliteRepository::open(db_url).await?;
        let mut store = TieredStore::local_only(Arc::new(local));
        if let Some(config) = remote {
            let remote = HttpRemoteStore::new(config)?;
            tracing::info!(url = %remote.url(), "remote sync enabled");
            store = store.with_remote(Arc::new(remote));
        }

        let (progress, remote_on_load) = ProgressService::open(clock, store).await?;
        if let RemoteSync::Failed(reason) = &remote_on_load {
            tracing::warn!(%reason, "remote progress unavailable, studying from local state");
        }

        Ok(Self {
            session_loop: SessionLoopService::new(Arc::new(catalogue), progress),
            tutor: TutorService::from_env(),
            remote_on_load,
        })
    }

    #[must_use]
    pub fn session_loop(&self) -> &SessionLoopService {
        &self.session_loop
    }

    pub fn session_loop_mut(&mut self) -> &mut SessionLoopService {
        &mut self.session_loop
    }

    #[must_use]
    pub fn tutor(&self) -> &TutorService {
        &self.tutor
    }

    /// What happened to the remote half of the initial load.
    #[must_use]
    pub fn remote_on_load(&self) -> &RemoteSync {
        &self.remote_on_load
    }
}
