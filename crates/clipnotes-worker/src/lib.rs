//! Background processing: the per-video job runner and the DB-backed job
//! queue with its in-process fallback dispatcher.

pub mod context;
pub mod queue;
pub mod runner;

pub use context::{empty_context_weak, JobContext};
pub use queue::{JobDispatcher, JobQueue, JobQueueConfig};
pub use runner::JobRunner;
