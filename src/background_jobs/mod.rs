//! Background job scheduling and execution.
//!
//! Jobs run on blocking threads, started on startup hooks, at fixed
//! intervals, or on demand through a [`SchedulerHandle`].

mod context;
mod handle;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use handle::{SchedulerCommand, SchedulerHandle};
pub use job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
pub use scheduler::{create_scheduler, JobScheduler};
