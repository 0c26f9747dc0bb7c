use std::sync::Arc;

use rand::Rng;

use revise_core::model::{AppState, Confidence, Response};
use storage::ContentCatalogue;

use super::plan::{SessionBuilder, SessionOptions};
use super::service::{SessionAnswer, StudySession};
use crate::error::SessionError;
use crate::progress_service::{PersistStatus, ProgressService};

/// Result of answering a single question in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswerResult {
    pub answer: SessionAnswer,
    pub is_complete: bool,
    pub persist: PersistStatus,
}

/// Orchestrates session start and graded, persisted answering.
pub struct SessionLoopService {
    catalogue: Arc<ContentCatalogue>,
    progress: ProgressService,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(catalogue: Arc<ContentCatalogue>, progress: ProgressService) -> Self {
        Self {
            catalogue,
            progress,
        }
    }

    #[must_use]
    pub fn catalogue(&self) -> &ContentCatalogue {
        &self.catalogue
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressService {
        &mut self.progress
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        self.progress.state()
    }

    /// Start a new session over the catalogue.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when no question matches the options.
    pub fn start_session<R: Rng + ?Sized>(
        &self,
        options: SessionOptions,
        rng: &mut R,
    ) -> Result<StudySession, SessionError> {
        let now = self.progress.now();
        let plan = SessionBuilder::new(self.catalogue.questions())
            .with_options(options)
            .build(&self.progress.state().progress, now, rng);

        tracing::info!(
            total = plan.total(),
            due = plan.due_selected,
            new = plan.new_selected,
            "session planned"
        );

        StudySession::new(plan, now)
    }

    /// Grade the response to the current question, persist it, then advance.
    ///
    /// The session does not advance when grading fails.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session has no current question,
    /// `SessionError::UnknownQuestion` if it is missing from the catalogue, or
    /// `SessionError::Progress` for an unset confidence.
    pub async fn answer_current(
        &mut self,
        session: &mut StudySession,
        response: &Response,
        confidence: Confidence,
    ) -> Result<SessionAnswerResult, SessionError> {
        let question_id = session
            .current_question()
            .map(|q| q.id.clone())
            .ok_or(SessionError::Completed)?;
        let question = self
            .catalogue
            .question(&question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.clone()))?;
        let correct = question.grade(response);

        let outcome = self
            .progress
            .record_grade(&question_id, correct, confidence)
            .await?;
        let answered_at = self.progress.now();
        let answer = session
            .record_answer(outcome.item, correct, confidence, answered_at)?
            .clone();

        Ok(SessionAnswerResult {
            answer,
            is_complete: session.is_complete(),
            persist: outcome.persist,
        })
    }
}
