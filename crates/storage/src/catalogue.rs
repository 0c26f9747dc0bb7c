use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use revise_core::model::{Question, QuestionId, Topic, TopicId};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogueError {
    #[error("failed to read catalogue: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalogue: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),
    #[error("duplicate topic id: {0}")]
    DuplicateTopic(TopicId),
    #[error("question {question} references unknown topic {topic}")]
    UnknownTopic { question: QuestionId, topic: TopicId },
}

/// Immutable content store: topics and their questions, in catalogue order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentCatalogue {
    topics: Vec<Topic>,
    questions: Vec<Question>,
}

#[derive(Deserialize)]
struct CatalogueFile {
    #[serde(default)]
    topics: Vec<Topic>,
    #[serde(default)]
    questions: Vec<Question>,
}

impl ContentCatalogue {
    /// Build a catalogue, checking id uniqueness and topic references.
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError` for duplicate ids or questions pointing at a missing topic.
    pub fn new(topics: Vec<Topic>, questions: Vec<Question>) -> Result<Self, CatalogueError> {
        let mut topic_ids = HashSet::with_capacity(topics.len());
        for topic in &topics {
            if !topic_ids.insert(&topic.id) {
                return Err(CatalogueError::DuplicateTopic(topic.id.clone()));
            }
        }

        let mut question_ids = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !question_ids.insert(&question.id) {
                return Err(CatalogueError::DuplicateQuestion(question.id.clone()));
            }
            if !topic_ids.contains(&question.topic_id) {
                return Err(CatalogueError::UnknownTopic {
                    question: question.id.clone(),
                    topic: question.topic_id.clone(),
                });
            }
        }

        Ok(Self { topics, questions })
    }

    /// Parse a catalogue from its JSON form `{ "topics": [...], "questions": [...] }`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::Parse` for malformed JSON, or validation errors from [`Self::new`].
    pub fn from_json(raw: &str) -> Result<Self, CatalogueError> {
        let file: CatalogueFile = serde_json::from_str(raw)?;
        Self::new(file.topics, file.questions)
    }

    /// Read and parse a catalogue file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::Io` if the file cannot be read, or any error from [`Self::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogueError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn topic(&self, id: &TopicId) -> Option<&Topic> {
        self.topics.iter().find(|t| &t.id == id)
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }
}
