//! Local media transformations: probing, compression, audio extraction and
//! chunking. Pure file-path in, file-path out; no network.

pub mod audio;
pub mod compress;
pub mod error;
pub mod probe;
pub mod validate;

pub use audio::{chunk_audio, chunk_offsets, chunk_plan, extract_audio, AudioChunk, ChunkPlan};
pub use compress::{compress, CompressOutcome};
pub use error::{MediaError, MediaResult};
pub use probe::{probe, MediaInfo};
pub use validate::{validate_upload, ValidationError};
