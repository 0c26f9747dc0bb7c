use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, TopicId};

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// How a question is presented and graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "MCQ")]
    Mcq,
    #[serde(rename = "SHORT_ANSWER")]
    ShortAnswer,
    #[serde(rename = "SCENARIO")]
    Scenario,
}

/// Academic level the question targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "Level 4")]
    Level4,
    #[serde(rename = "Level 5")]
    Level5,
    #[serde(rename = "Level 6")]
    Level6,
}

/// Expected answer: an option index for MCQ, model text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Choice(usize),
    Text(String),
}

/// What the learner submitted for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Index of the option picked on a multiple-choice question.
    Choice(usize),
    /// The learner's own verdict after comparing their answer to the model answer.
    SelfAssessed { correct: bool },
}

/// Read-only catalogue question.
///
/// Only `id` and `topic_id` matter to scheduling; the remaining fields are for
/// presentation and grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub topic_id: TopicId,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    pub difficulty: Difficulty,
}

impl Question {
    /// Decide whether a response answers this question correctly.
    ///
    /// Multiple-choice questions compare the picked index with the expected one.
    /// Short-answer and scenario questions are self-assessed. A response of the
    /// wrong shape for the question kind never counts as correct.
    #[must_use]
    pub fn grade(&self, response: &Response) -> bool {
        match (self.kind, response) {
            (QuestionKind::Mcq, Response::Choice(picked)) => {
                matches!(self.correct_answer, CorrectAnswer::Choice(expected) if expected == *picked)
            }
            (QuestionKind::ShortAnswer | QuestionKind::Scenario, Response::SelfAssessed { correct }) => {
                *correct
            }
            _ => false,
        }
    }

    /// Model answer as display text.
    #[must_use]
    pub fn correct_answer_text(&self) -> Option<&str> {
        match &self.correct_answer {
            CorrectAnswer::Choice(idx) => self.options.get(*idx).map(String::as_str),
            CorrectAnswer::Text(text) => Some(text),
        }
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// A unit of study owning a set of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub quick_summary: Vec<String>,
    /// HTML notes.
    #[serde(default)]
    pub full_notes: String,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq() -> Question {
        Question {
            id: QuestionId::new("q1"),
            topic_id: TopicId::new("creatine"),
            kind: QuestionKind::Mcq,
            text: "Which system dominates a 100m sprint?".into(),
            options: vec!["Oxidative".into(), "ATP-PCr".into(), "Glycolytic".into()],
            correct_answer: CorrectAnswer::Choice(1),
            explanation: "Efforts under 10s rely on stored ATP and PCr.".into(),
            source_ref: None,
            difficulty: Difficulty::Level5,
        }
    }

    #[test]
    fn mcq_grades_by_index() {
        let q = mcq();
        assert!(q.grade(&Response::Choice(1)));
        assert!(!q.grade(&Response::Choice(0)));
        assert!(!q.grade(&Response::SelfAssessed { correct: true }));
        assert_eq!(q.correct_answer_text(), Some("ATP-PCr"));
    }

    #[test]
    fn short_answer_is_self_assessed() {
        let q = Question {
            kind: QuestionKind::ShortAnswer,
            options: Vec::new(),
            correct_answer: CorrectAnswer::Text("Leucine".into()),
            ..mcq()
        };
        assert!(q.grade(&Response::SelfAssessed { correct: true }));
        assert!(!q.grade(&Response::SelfAssessed { correct: false }));
        assert!(!q.grade(&Response::Choice(0)));
    }

    #[test]
    fn deserializes_catalogue_shape() {
        let json = r#"{
            "id": "q-prot-1",
            "topicId": "protein-metabolism",
            "type": "SHORT_ANSWER",
            "text": "Name the amino acid that triggers MPS.",
            "correctAnswer": "Leucine",
            "explanation": "Leucine activates mTOR.",
            "difficulty": "Level 6"
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.kind, QuestionKind::ShortAnswer);
        assert_eq!(q.difficulty, Difficulty::Level6);
        assert!(q.options.is_empty());
        assert_eq!(q.correct_answer, CorrectAnswer::Text("Leucine".into()));
    }
}
