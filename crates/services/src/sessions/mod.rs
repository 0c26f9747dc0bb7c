mod plan;
mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{DEFAULT_SESSION_CAP, SessionBuilder, SessionOptions, SessionPlan, build_session};
pub use progress::SessionProgress;
pub use service::{SessionAnswer, StudySession};
pub use workflow::{SessionAnswerResult, SessionLoopService};
