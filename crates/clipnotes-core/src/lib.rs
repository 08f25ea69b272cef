//! Core domain types: models, configuration, and the unified error type.

pub mod config;
pub mod error;
pub mod models;

pub use config::{CompressionSettings, Config, NotesSettings, SpeechSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
