//! Job dispatch context trait
//!
//! The API implements this trait for its application state. The queue calls
//! `run_job` when processing a claimed job; the in-process fallback dispatcher
//! calls it directly from a background task.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Context for job dispatch.
///
/// Implemented by the API's application state. The worker holds a weak
/// reference and calls `run_job` when processing a claimed job.
#[async_trait]
pub trait JobContext: Send + Sync {
    /// Run the processing pipeline for one video.
    async fn run_job(self: Arc<Self>, owner_id: Uuid, video_id: Uuid) -> Result<()>;
}

/// Placeholder context used when no real context exists yet (e.g. during
/// init). Dispatch always errors.
struct NoopContext;

#[async_trait]
impl JobContext for NoopContext {
    async fn run_job(self: Arc<Self>, _owner_id: Uuid, _video_id: Uuid) -> Result<()> {
        Err(anyhow!("NoopContext: no job context available"))
    }
}

/// Returns a weak reference to a no-op context. Use as placeholder when
/// building the queue before the real application state exists.
pub fn empty_context_weak() -> Weak<dyn JobContext> {
    let n: Arc<dyn JobContext> = Arc::new(NoopContext);
    Arc::downgrade(&n)
}
