//! hive-core — wire format, task model, and configuration.
//! All other Hive crates depend on this one.

pub mod config;
pub mod envelope;
pub mod task;

pub use envelope::{Envelope, EnvelopeError, MessageKind};
pub use task::{Job, JobStatus, Task, TaskStatus};
