//! External-service clients and the chunked-transcription engine.

pub mod engine;
pub mod notes;
pub mod retry;
pub mod speech;

pub use engine::{EngineError, MergedTranscript, TranscriptionEngine};
pub use notes::{NotesClient, NotesError, NotesOutcome};
pub use retry::RetryPolicy;
pub use speech::{ChunkTranscript, SpeechClient, SpeechError, Transcribe};
