pub mod collection;
pub mod job;
pub mod notes;
pub mod transcription;
pub mod video;

pub use collection::{Collection, CollectionResponse};
pub use job::{JobStatus, ProcessingJob};
pub use notes::{
    Chapter, Sentiment, SentimentPoint, StructuredNotes, Theme, TimestampedItem,
};
pub use transcription::{
    segments_are_monotonic, TranscriptSegment, Transcription, TranscriptionResponse,
};
pub use video::{
    StreamableStatus, Video, VideoResponse, VideoSource, VideoStatus, VideoStatusResponse,
};
