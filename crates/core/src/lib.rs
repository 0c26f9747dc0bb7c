#![forbid(unsafe_code)]

pub mod model;
pub mod scheduler;
pub mod time;

pub use scheduler::SchedulerError;
pub use time::Clock;
