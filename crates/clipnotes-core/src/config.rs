//! Configuration module
//!
//! Application configuration loaded from the environment at startup and passed
//! by reference; test suites construct fixtures via `Config::for_tests`.

use std::env;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_UPLOAD_SIZE_MB: u64 = 500;
const PRESIGNED_URL_TTL_SECS: u64 = 3600;
const MAX_CONCURRENT_TRANSCRIPTIONS: usize = 3;
const AUDIO_CHUNK_THRESHOLD_MB: u64 = 25;
const AUDIO_EXTRACT_BITRATE_KBPS: u32 = 64;
const COMPRESSION_CRF: u32 = 26;
const COMPRESSION_MAX_WIDTH: u32 = 1920;
const COMPRESSION_MAX_HEIGHT: u32 = 1080;
const COMPRESSION_MAX_FPS: u32 = 30;
const COMPRESSION_AUDIO_KBPS: u32 = 128;
const COMPRESSION_SKIP_ABOVE_MB: u64 = 1024;
const SPEECH_MAX_RETRIES: u32 = 3;
const JOB_TIMEOUT_SECS: u64 = 3600;
const CALL_TIMEOUT_SECS: u64 = 300;
const JOB_QUEUE_MAX_WORKERS: usize = 1;
const JOB_QUEUE_POLL_INTERVAL_MS: u64 = 1000;
const JOB_QUEUE_MAX_RETRIES: i32 = 3;
const STALE_JOB_REAP_INTERVAL_SECS: u64 = 60;
const STALE_JOB_GRACE_PERIOD_SECS: i64 = 300;

/// Video compression settings (H.264/AAC, fast-start container).
#[derive(Clone, Debug)]
pub struct CompressionSettings {
    pub crf: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub max_fps: u32,
    pub audio_kbps: u32,
    pub preset: String,
    /// Files above this size are not transcoded; the original is kept.
    pub skip_above_bytes: u64,
}

/// Speech (transcription) service settings.
#[derive(Clone, Debug)]
pub struct SpeechSettings {
    pub api_url: String,
    pub api_key: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub max_retries: u32,
    pub language: Option<String>,
}

/// Notes (structured summary) service settings.
#[derive(Clone, Debug)]
pub struct NotesSettings {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Disable reasoning/thinking tokens to stabilize cost.
    pub disable_reasoning: bool,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    // Object storage
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    // Upload limits
    pub max_upload_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub presigned_url_ttl_secs: u64,
    // Media processing
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub compression: CompressionSettings,
    pub audio_chunk_threshold_bytes: u64,
    pub audio_extract_bitrate_kbps: u32,
    // External services
    pub speech: SpeechSettings,
    pub notes: NotesSettings,
    pub max_concurrent_transcriptions: usize,
    // Job execution
    pub job_timeout_seconds: u64,
    pub call_timeout_seconds: u64,
    pub job_queue_enabled: bool,
    pub job_queue_max_workers: usize,
    pub job_queue_poll_interval_ms: u64,
    pub job_queue_max_retries: i32,
    pub stale_job_reap_interval_secs: u64,
    pub stale_job_grace_period_secs: i64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or_else(|| env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            max_upload_bytes: env_or("MAX_UPLOAD_SIZE_MB", MAX_UPLOAD_SIZE_MB) * 1024 * 1024,
            allowed_extensions: env_list("ALLOWED_EXTENSIONS", "mp4,mov,avi,mkv"),
            allowed_content_types: env_list(
                "ALLOWED_CONTENT_TYPES",
                "video/mp4,video/quicktime,video/x-msvideo,video/x-matroska",
            ),
            presigned_url_ttl_secs: env_or("PRESIGNED_URL_TTL_SECS", PRESIGNED_URL_TTL_SECS),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            compression: CompressionSettings {
                crf: env_or("COMPRESSION_CRF", COMPRESSION_CRF),
                max_width: env_or("COMPRESSION_MAX_WIDTH", COMPRESSION_MAX_WIDTH),
                max_height: env_or("COMPRESSION_MAX_HEIGHT", COMPRESSION_MAX_HEIGHT),
                max_fps: env_or("COMPRESSION_MAX_FPS", COMPRESSION_MAX_FPS),
                audio_kbps: env_or("COMPRESSION_AUDIO_KBPS", COMPRESSION_AUDIO_KBPS),
                preset: env::var("COMPRESSION_PRESET").unwrap_or_else(|_| "medium".to_string()),
                skip_above_bytes: env_or("COMPRESSION_SKIP_ABOVE_MB", COMPRESSION_SKIP_ABOVE_MB)
                    * 1024
                    * 1024,
            },
            audio_chunk_threshold_bytes: env_or("AUDIO_CHUNK_THRESHOLD_MB", AUDIO_CHUNK_THRESHOLD_MB)
                * 1024
                * 1024,
            audio_extract_bitrate_kbps: env_or(
                "AUDIO_EXTRACT_BITRATE_KBPS",
                AUDIO_EXTRACT_BITRATE_KBPS,
            ),
            speech: SpeechSettings {
                api_url: env::var("SPEECH_API_URL")
                    .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
                api_key: env::var("SPEECH_API_KEY").unwrap_or_default(),
                primary_model: env::var("SPEECH_PRIMARY_MODEL")
                    .unwrap_or_else(|_| "whisper-large-v3".to_string()),
                fallback_model: env::var("SPEECH_FALLBACK_MODEL")
                    .unwrap_or_else(|_| "whisper-large-v3-turbo".to_string()),
                max_retries: env_or("SPEECH_MAX_RETRIES", SPEECH_MAX_RETRIES),
                language: env::var("SPEECH_LANGUAGE").ok().filter(|s| !s.is_empty()),
            },
            notes: NotesSettings {
                api_url: env::var("NOTES_API_URL")
                    .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
                api_key: env::var("NOTES_API_KEY").unwrap_or_default(),
                model: env::var("NOTES_MODEL")
                    .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
                disable_reasoning: env_or("NOTES_DISABLE_REASONING", true),
            },
            max_concurrent_transcriptions: env_or(
                "MAX_CONCURRENT_TRANSCRIPTIONS",
                MAX_CONCURRENT_TRANSCRIPTIONS,
            ),
            job_timeout_seconds: env_or("JOB_TIMEOUT_SECS", JOB_TIMEOUT_SECS),
            call_timeout_seconds: env_or("CALL_TIMEOUT_SECS", CALL_TIMEOUT_SECS),
            job_queue_enabled: env_or("JOB_QUEUE_ENABLED", true),
            job_queue_max_workers: env_or("JOB_QUEUE_MAX_WORKERS", JOB_QUEUE_MAX_WORKERS),
            job_queue_poll_interval_ms: env_or(
                "JOB_QUEUE_POLL_INTERVAL_MS",
                JOB_QUEUE_POLL_INTERVAL_MS,
            ),
            job_queue_max_retries: env_or("JOB_QUEUE_MAX_RETRIES", JOB_QUEUE_MAX_RETRIES),
            stale_job_reap_interval_secs: env_or(
                "STALE_JOB_REAP_INTERVAL_SECS",
                STALE_JOB_REAP_INTERVAL_SECS,
            ),
            stale_job_grace_period_secs: env_or(
                "STALE_JOB_GRACE_PERIOD_SECS",
                STALE_JOB_GRACE_PERIOD_SECS,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.s3_bucket.is_none() && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET or LOCAL_STORAGE_PATH must be set for object storage"
            ));
        }

        if self.s3_bucket.is_some() && self.s3_region.is_none() && self.s3_endpoint.is_none() {
            return Err(anyhow::anyhow!(
                "S3_REGION or S3_ENDPOINT must be set when using S3 storage"
            ));
        }

        if self.max_concurrent_transcriptions == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_TRANSCRIPTIONS must be at least 1"
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Fixture configuration for unit tests. Not loaded from the environment.
    pub fn for_tests() -> Self {
        Config {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            database_url: "postgresql://localhost/clipnotes_test".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 5,
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            s3_bucket: Some("clipnotes-test".to_string()),
            s3_region: Some("us-east-1".to_string()),
            s3_endpoint: None,
            local_storage_path: None,
            max_upload_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            allowed_extensions: vec![
                "mp4".to_string(),
                "mov".to_string(),
                "avi".to_string(),
                "mkv".to_string(),
            ],
            allowed_content_types: vec![
                "video/mp4".to_string(),
                "video/quicktime".to_string(),
                "video/x-msvideo".to_string(),
                "video/x-matroska".to_string(),
            ],
            presigned_url_ttl_secs: PRESIGNED_URL_TTL_SECS,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            compression: CompressionSettings {
                crf: COMPRESSION_CRF,
                max_width: COMPRESSION_MAX_WIDTH,
                max_height: COMPRESSION_MAX_HEIGHT,
                max_fps: COMPRESSION_MAX_FPS,
                audio_kbps: COMPRESSION_AUDIO_KBPS,
                preset: "medium".to_string(),
                skip_above_bytes: COMPRESSION_SKIP_ABOVE_MB * 1024 * 1024,
            },
            audio_chunk_threshold_bytes: AUDIO_CHUNK_THRESHOLD_MB * 1024 * 1024,
            audio_extract_bitrate_kbps: AUDIO_EXTRACT_BITRATE_KBPS,
            speech: SpeechSettings {
                api_url: "http://localhost:9901/v1".to_string(),
                api_key: "test".to_string(),
                primary_model: "whisper-large-v3".to_string(),
                fallback_model: "whisper-large-v3-turbo".to_string(),
                max_retries: SPEECH_MAX_RETRIES,
                language: None,
            },
            notes: NotesSettings {
                api_url: "http://localhost:9902/v1".to_string(),
                api_key: "test".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                disable_reasoning: true,
            },
            max_concurrent_transcriptions: MAX_CONCURRENT_TRANSCRIPTIONS,
            job_timeout_seconds: JOB_TIMEOUT_SECS,
            call_timeout_seconds: CALL_TIMEOUT_SECS,
            job_queue_enabled: false,
            job_queue_max_workers: JOB_QUEUE_MAX_WORKERS,
            job_queue_poll_interval_ms: JOB_QUEUE_POLL_INTERVAL_MS,
            job_queue_max_retries: JOB_QUEUE_MAX_RETRIES,
            stale_job_reap_interval_secs: STALE_JOB_REAP_INTERVAL_SECS,
            stale_job_grace_period_secs: STALE_JOB_GRACE_PERIOD_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::for_tests();
        assert_eq!(config.max_upload_bytes, 500 * 1024 * 1024);
        assert_eq!(config.presigned_url_ttl_secs, 3600);
        assert_eq!(config.max_concurrent_transcriptions, 3);
        assert_eq!(config.audio_chunk_threshold_bytes, 25 * 1024 * 1024);
        assert_eq!(config.compression.crf, 26);
        assert_eq!(config.compression.max_width, 1920);
        assert_eq!(config.compression.max_height, 1080);
        assert_eq!(config.compression.max_fps, 30);
        assert_eq!(config.compression.audio_kbps, 128);
        assert_eq!(config.compression.preset, "medium");
        assert_eq!(config.compression.skip_above_bytes, 1024 * 1024 * 1024);
        assert_eq!(config.speech.max_retries, 3);
        assert!(config.notes.disable_reasoning);
        assert_eq!(config.job_timeout_seconds, 3600);
    }

    #[test]
    fn test_validate_rejects_short_jwt_secret() {
        let mut config = Config::for_tests();
        config.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_storage() {
        let mut config = Config::for_tests();
        config.s3_bucket = None;
        config.local_storage_path = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::for_tests();
        config.max_concurrent_transcriptions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allowed_extensions_default() {
        let config = Config::for_tests();
        assert_eq!(config.allowed_extensions, vec!["mp4", "mov", "avi", "mkv"]);
    }
}
