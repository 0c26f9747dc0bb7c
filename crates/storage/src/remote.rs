use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use revise_core::model::AppState;
use revise_core::time::Clock;

use crate::record::StateRecord;
use crate::repository::{StateStore, StorageError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
    pub user_id: String,
    pub token: Option<String>,
}

impl RemoteConfig {
    /// Reads `REVISE_REMOTE_URL`, `REVISE_USER_ID` and `REVISE_REMOTE_TOKEN`.
    ///
    /// `base_url` takes precedence over `REVISE_REMOTE_URL`. Returns `None`
    /// unless both a URL and a user id are set.
    #[must_use]
    pub fn from_env(base_url: Option<String>) -> Option<Self> {
        let base_url = base_url.or_else(|| env::var("REVISE_REMOTE_URL").ok())?;
        let user_id = env::var("REVISE_USER_ID").unwrap_or_default();
        Self::new(base_url, user_id, env::var("REVISE_REMOTE_TOKEN").ok())
    }

    #[must_use]
    pub fn new(base_url: String, user_id: String, token: Option<String>) -> Option<Self> {
        if base_url.trim().is_empty() || user_id.trim().is_empty() {
            return None;
        }
        Some(Self {
            base_url,
            user_id,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Document URL for this learner's state.
    ///
    /// The user id is appended as a single percent-encoded path segment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidUrl` if the base URL does not parse or
    /// cannot carry a path.
    pub fn document_url(&self) -> Result<Url, StorageError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|err| StorageError::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| StorageError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["users", self.user_id.as_str(), "state"]);
        Ok(url)
    }
}

/// Remote document store holding one JSON state document per learner.
///
/// `GET` returns the document (404 means nothing saved yet), `PUT` replaces it.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    config: RemoteConfig,
    url: Url,
}

impl HttpRemoteStore {
    /// # Errors
    ///
    /// Returns `StorageError::InvalidUrl` for an unusable base URL and
    /// `StorageError::Connection` if the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> Result<Self, StorageError> {
        let url = config.document_url()?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(Self { client, config, url })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn connection(err: reqwest::Error) -> StorageError {
    StorageError::Connection(err.to_string())
}

#[async_trait]
impl StateStore for HttpRemoteStore {
    async fn load_state(&self) -> Result<Option<AppState>, StorageError> {
        let response = self
            .authorize(self.client.get(self.url.clone()))
            .send()
            .await
            .map_err(connection)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StorageError::RemoteStatus(response.status().as_u16()));
        }

        let raw = response.text().await.map_err(connection)?;
        let record = StateRecord::from_json(&raw)?;
        Ok(Some(record.into_state(Clock::Default.now())))
    }

    async fn save_state(&self, state: &AppState) -> Result<(), StorageError> {
        let record = StateRecord::from_state(state);
        let response = self
            .authorize(self.client.put(self.url.clone()))
            .json(&record)
            .send()
            .await
            .map_err(connection)?;

        if !response.status().is_success() {
            return Err(StorageError::RemoteStatus(response.status().as_u16()));
        }
        Ok(())
    }
}
