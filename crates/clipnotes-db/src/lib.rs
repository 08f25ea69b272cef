//! Database repositories over PostgreSQL.
//!
//! Repositories are `Clone` handles over a shared `PgPool` and are passed
//! explicitly to the components that need them.

pub mod collections;
pub mod jobs;
pub mod transcriptions;
pub mod videos;

pub use collections::CollectionRepository;
pub use jobs::JobRepository;
pub use transcriptions::{NewTranscription, TranscriptionRepository};
pub use videos::VideoRepository;
