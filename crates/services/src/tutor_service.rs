use std::env;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use revise_core::model::Topic;

use crate::error::TutorError;

/// Characters of topic notes included in the tutor's context.
const NOTES_CONTEXT_CHARS: usize = 1000;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

#[derive(Clone, Debug)]
pub struct TutorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl TutorConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("REVISE_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("REVISE_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("REVISE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

//
// ─── TRANSCRIPT ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    Student,
    Tutor,
}

impl ChatRole {
    fn label(self) -> &'static str {
        match self {
            ChatRole::Student => "Student",
            ChatRole::Tutor => "Tutor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    #[must_use]
    pub fn student(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Student,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn tutor(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tutor,
            text: text.into(),
        }
    }
}

/// Tutor persona and marking rules sent ahead of any topic context.
const TUTOR_GUIDELINES: &str = "You are a friendly, encouraging tutor for an undergraduate \
applied sports nutrition module.

Guidelines:
- Base answers on the topic context below when it is given.
- Keep answers under about 150 words.
- Use plain language but the correct scientific terms.
- When you introduce a term, add a short sports analogy.
- Always finish with one short \"Quick Check\" question that tests what you just explained.
- If the student is answering your last Quick Check, first say whether they are right \
or wrong and briefly explain why, then ask a related Quick Check or offer to move on.
- Stay conversational and supportive.";

/// Tutor instructions, grounded in the topic being studied when there is one.
///
/// The notes excerpt is tag-stripped and always comes last.
#[must_use]
pub fn build_system_prompt(topic: Option<&Topic>) -> String {
    let mut prompt = String::from(TUTOR_GUIDELINES);

    if let Some(topic) = topic {
        let notes = TAG_RE.replace_all(&topic.full_notes, "");
        let excerpt: String = notes.chars().take(NOTES_CONTEXT_CHARS).collect();
        prompt.push_str(&format!(
            "\n\nCurrent topic: {}\nKey points: {}\nNotes excerpt: {}",
            topic.title,
            topic.key_points.join("; "),
            excerpt.trim()
        ));
    }

    prompt
}

/// Render the conversation as `Student:` / `Tutor:` lines.
#[must_use]
pub fn render_transcript(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|message| format!("{}: {}", message.role.label(), message.text))
        .collect::<Vec<_>>()
        .join("\n")
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Chat-completions client answering study questions.
#[derive(Clone)]
pub struct TutorService {
    client: Client,
    config: Option<TutorConfig>,
}

impl TutorService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(TutorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<TutorConfig>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Ask the tutor to continue the conversation.
    ///
    /// # Errors
    ///
    /// Returns `TutorError` when the tutor is disabled, the request fails,
    /// or the response is empty.
    pub async fn ask(
        &self,
        history: &[ChatMessage],
        topic: Option<&Topic>,
    ) -> Result<String, TutorError> {
        let config = self.config.as_ref().ok_or(TutorError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                WireMessage {
                    role: "system",
                    content: build_system_prompt(topic),
                },
                WireMessage {
                    role: "user",
                    content: format!("{}\nTutor:", render_transcript(history)),
                },
            ],
            temperature: 0.4,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "tutor request rejected");
            return Err(TutorError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(TutorError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

/// Running conversation with the tutor; every turn sends the whole transcript.
#[derive(Debug, Clone, Default)]
pub struct TutorChat {
    history: Vec<ChatMessage>,
}

impl TutorChat {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Send the student's next message and record the tutor's reply.
    ///
    /// A failed turn leaves the transcript as it was before the call.
    ///
    /// # Errors
    ///
    /// Returns the `TutorError` from [`TutorService::ask`].
    pub async fn send(
        &mut self,
        tutor: &TutorService,
        text: impl Into<String>,
        topic: Option<&Topic>,
    ) -> Result<&str, TutorError> {
        self.history.push(ChatMessage::student(text));
        match tutor.ask(&self.history, topic).await {
            Ok(reply) => {
                self.history.push(ChatMessage::tutor(reply));
                Ok(self.history.last().map_or("", |message| message.text.as_str()))
            }
            Err(err) => {
                self.history.pop();
                Err(err)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use revise_core::model::TopicId;

    fn topic(notes: &str) -> Topic {
        Topic {
            id: TopicId::new("carbs"),
            title: "Carbohydrate loading".into(),
            description: String::new(),
            learning_objectives: Vec::new(),
            key_points: vec!["10-12 g/kg/day".into(), "36-48 h before".into()],
            quick_summary: Vec::new(),
            full_notes: notes.into(),
        }
    }

    #[test]
    fn prompt_without_topic_has_no_context() {
        let prompt = build_system_prompt(None);
        assert!(!prompt.contains("Current topic"));
    }

    #[test]
    fn prompt_strips_tags_and_truncates_notes() {
        let notes = format!("<h2>Glycogen</h2><p>{}</p>", "x".repeat(2000));
        let prompt = build_system_prompt(Some(&topic(&notes)));

        assert!(prompt.contains("Current topic: Carbohydrate loading"));
        assert!(prompt.contains("Key points: 10-12 g/kg/day; 36-48 h before"));
        assert!(!prompt.contains("<h2>"));
        let excerpt = prompt.split("Notes excerpt: ").nth(1).unwrap();
        assert_eq!(excerpt.chars().count(), NOTES_CONTEXT_CHARS);
        assert!(excerpt.starts_with("Glycogen"));
    }

    #[test]
    fn prompt_always_asks_for_and_marks_quick_checks() {
        for prompt in [build_system_prompt(None), build_system_prompt(Some(&topic("notes")))] {
            assert!(prompt.contains("\"Quick Check\" question"));
            assert!(prompt.contains("say whether they are right or wrong"));
            assert!(prompt.contains("under about 150 words"));
        }
    }

    #[test]
    fn transcript_labels_roles() {
        let history = [ChatMessage::student("Why load?"), ChatMessage::tutor("To top up glycogen.")];
        assert_eq!(
            render_transcript(&history),
            "Student: Why load?\nTutor: To top up glycogen."
        );
    }

    #[tokio::test]
    async fn disabled_tutor_refuses() {
        let tutor = TutorService::new(None);
        assert!(!tutor.enabled());
        let err = tutor.ask(&[ChatMessage::student("hi")], None).await.unwrap_err();
        assert!(matches!(err, TutorError::Disabled));
    }

    #[tokio::test]
    async fn failed_turn_leaves_transcript_untouched() {
        let tutor = TutorService::new(None);
        let mut chat = TutorChat::new();
        let err = chat.send(&tutor, "What is glycogen?", None).await.unwrap_err();
        assert!(matches!(err, TutorError::Disabled));
        assert!(chat.history().is_empty());
    }

    #[tokio::test]
    async fn unreachable_tutor_keeps_earlier_turns() {
        let tutor = TutorService::new(Some(TutorConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: "k".into(),
            model: "m".into(),
        }));
        let mut chat = TutorChat {
            history: vec![
                ChatMessage::student("Why load carbs?"),
                ChatMessage::tutor("To top up glycogen. Quick Check: how long before?"),
            ],
        };
        assert!(chat.send(&tutor, "36-48 h", None).await.is_err());
        assert_eq!(chat.history().len(), 2);
        assert_eq!(chat.history()[1].role, ChatRole::Tutor);
    }
}
