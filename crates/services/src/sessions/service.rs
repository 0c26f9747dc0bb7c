use chrono::{DateTime, Utc};
use std::fmt;

use revise_core::model::{
    Confidence, HistoryEntry, ProgressItem, Question, QuestionId, SessionSummary,
};

use super::plan::SessionPlan;
use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── ANSWER RECORD ─────────────────────────────────────────────────────────────
//

/// One answered question within a session, with the item it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswer {
    pub question_id: QuestionId,
    pub correct: bool,
    pub confidence: Confidence,
    pub item: ProgressItem,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory study session stepping through a planned queue of questions.
pub struct StudySession {
    questions: Vec<Question>,
    current: usize,
    answers: Vec<SessionAnswer>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl StudySession {
    /// Start a session over the plan's questions, in plan order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` for an empty plan; callers show the
    /// "nothing to do" state instead of a session.
    pub fn new(plan: SessionPlan, started_at: DateTime<Utc>) -> Result<Self, SessionError> {
        if plan.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            questions: plan.questions,
            current: 0,
            answers: Vec::new(),
            started_at,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[SessionAnswer] {
        &self.answers
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.current)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total_questions(),
            answered: self.answers.len(),
            remaining: self.remaining(),
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Record the graded answer to the current question and advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if every question was already answered.
    pub(crate) fn record_answer(
        &mut self,
        item: ProgressItem,
        correct: bool,
        confidence: Confidence,
        answered_at: DateTime<Utc>,
    ) -> Result<&SessionAnswer, SessionError> {
        let Some(question) = self.current_question() else {
            return Err(SessionError::Completed);
        };

        self.answers.push(SessionAnswer {
            question_id: question.id.clone(),
            correct,
            confidence,
            item,
        });

        self.current += 1;
        if self.current >= self.questions.len() {
            self.completed_at = Some(answered_at);
        }

        self.answers.last().ok_or(SessionError::Completed)
    }

    /// Summary of what was answered so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if `completed_at` precedes the session start.
    pub fn summary(&self, completed_at: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        let entries: Vec<HistoryEntry> = self
            .answers
            .iter()
            .map(|answer| HistoryEntry::new(completed_at, answer.correct, answer.confidence))
            .collect();
        Ok(SessionSummary::from_answers(
            self.started_at,
            self.completed_at.unwrap_or(completed_at),
            &entries,
        )?)
    }
}

impl fmt::Debug for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answers_len", &self.answers.len())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
