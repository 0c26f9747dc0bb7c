use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use revise_core::model::{ProgressMap, Question, TopicId};
use revise_core::scheduler::is_question_due;

/// Maximum number of questions in one session unless overridden.
pub const DEFAULT_SESSION_CAP: usize = 15;

/// Filters and size limit for building a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub topic_id: Option<TopicId>,
    pub due_only: bool,
    pub cap: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            topic_id: None,
            due_only: false,
            cap: DEFAULT_SESSION_CAP,
        }
    }
}

impl SessionOptions {
    /// Mixed practice over the whole pool.
    #[must_use]
    pub fn mixed() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_topic(topic_id: TopicId) -> Self {
        Self {
            topic_id: Some(topic_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn due_only(mut self, due_only: bool) -> Self {
        self.due_only = due_only;
        self
    }

    #[must_use]
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }
}

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
    /// Selected questions that were graded before and are due again.
    pub due_selected: usize,
    /// Selected questions never graded.
    pub new_selected: usize,
}

impl SessionPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Nothing matched: the caller shows the "all caught up" state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Builds one study session from the question pool.
///
/// Steps: keep catalogue order, apply the topic filter, apply the due filter
/// (questions without progress count as due), shuffle uniformly, then truncate
/// to the cap. Interleaving topics instead of presenting them in catalogue
/// order is intentional.
pub struct SessionBuilder<'a> {
    pool: &'a [Question],
    options: SessionOptions,
}

impl<'a> SessionBuilder<'a> {
    #[must_use]
    pub fn new(pool: &'a [Question]) -> Self {
        Self {
            pool,
            options: SessionOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the plan. An empty plan is a valid outcome, never an error.
    pub fn build<R: Rng + ?Sized>(
        self,
        progress: &ProgressMap,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> SessionPlan {
        let SessionOptions {
            topic_id,
            due_only,
            cap,
        } = self.options;

        let mut candidates: Vec<&Question> = self
            .pool
            .iter()
            .filter(|q| topic_id.as_ref().is_none_or(|topic| &q.topic_id == topic))
            .filter(|q| !due_only || is_question_due(progress, &q.id, now))
            .collect();

        candidates.shuffle(rng);
        candidates.truncate(cap);

        let new_selected = candidates
            .iter()
            .filter(|q| !progress.contains_key(&q.id))
            .count();
        let due_selected = candidates
            .iter()
            .filter(|q| progress.contains_key(&q.id) && is_question_due(progress, &q.id, now))
            .count();

        SessionPlan {
            questions: candidates.into_iter().cloned().collect(),
            due_selected,
            new_selected,
        }
    }
}

/// Convenience form of [`SessionBuilder`] returning only the ordered questions.
pub fn build_session<R: Rng + ?Sized>(
    pool: &[Question],
    progress: &ProgressMap,
    options: &SessionOptions,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<Question> {
    SessionBuilder::new(pool)
        .with_options(options.clone())
        .build(progress, now, rng)
        .questions
}
