mod ids;
mod progress;
mod question;
mod review;
mod session;

pub use ids::{ParseIdError, QuestionId, TopicId};

pub use progress::{AppState, MasteryBox, ProgressItem, ProgressMap};
pub use question::{CorrectAnswer, Difficulty, Question, QuestionKind, Response, Topic};
pub use review::{Confidence, HistoryEntry, ReviewError};
pub use session::{SessionSummary, SessionSummaryError};
