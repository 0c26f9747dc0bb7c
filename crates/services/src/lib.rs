#![forbid(unsafe_code)]

pub mod app_services;
pub mod dashboard;
pub mod error;
pub mod progress_service;
pub mod sessions;
pub mod tutor_service;

pub use revise_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use dashboard::{MasteryBand, TopicReport};
pub use error::{AppServicesError, ProgressError, SessionError, TutorError};
pub use progress_service::{GradeOutcome, PersistStatus, ProgressService};
pub use tutor_service::{ChatMessage, ChatRole, TutorChat, TutorConfig, TutorService};

pub use sessions::{
    SessionAnswer, SessionAnswerResult, SessionBuilder, SessionLoopService, SessionOptions,
    SessionPlan, SessionProgress, StudySession, build_session,
};
