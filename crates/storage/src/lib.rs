#![forbid(unsafe_code)]

pub mod catalogue;
pub mod record;
pub mod remote;
pub mod repository;
pub mod sqlite;
pub mod tiered;

pub use catalogue::{CatalogueError, ContentCatalogue};
pub use remote::{HttpRemoteStore, RemoteConfig};
pub use repository::{InMemoryStateStore, StateStore, StorageError};
pub use sqlite::{SqliteInitError, SqliteRepository};
pub use tiered::{LoadedState, RemoteSync, SaveReport, TieredStore};
