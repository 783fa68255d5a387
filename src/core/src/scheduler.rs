//! Periodic polling of the stream feed.

pub mod poll_scheduler;

pub use poll_scheduler::{PollScheduler, SchedulerHandle, SchedulerOptions};
