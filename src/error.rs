//! Error types for wxlabel.

use serde::Serialize;
use std::path::PathBuf;

/// Result type alias for wxlabel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for wxlabel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Strict device mode found no accelerator.
    #[error("no accelerator available (strict device mode): {reason}")]
    DeviceUnavailable {
        /// What was probed and why it failed.
        reason: String,
    },

    /// User declined to continue on CPU.
    #[error("CPU fallback declined")]
    CpuFallbackDeclined,

    /// Model checkpoint could not be loaded or does not match the dual-head layout.
    #[error("failed to load model '{path}': {reason}")]
    ModelLoad {
        /// Path to the checkpoint.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Inference call failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Stored path did not resolve to an existing file under the archive root.
    #[error("file not found: {resolved} (stored as '{stored}')")]
    PathResolution {
        /// Path as recorded in the store.
        stored: String,
        /// Path after resolution against the archive root.
        resolved: PathBuf,
    },

    /// Image file could not be decoded.
    #[error("failed to decode image '{path}'")]
    ImageDecode {
        /// Path to the image file.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// Store could not be reached.
    #[error("failed to connect to store '{url}': {reason}")]
    StoreConnection {
        /// Connection URL with credentials removed.
        url: String,
        /// Description of the connection failure.
        reason: String,
    },

    /// Store URL scheme is not a supported backend.
    #[error("unsupported store URL '{url}' (expected sqlite:// or postgres://)")]
    UnsupportedStore {
        /// The rejected URL.
        url: String,
    },

    /// Adding prediction columns failed.
    #[error("schema migration failed on table '{table}'")]
    SchemaMigration {
        /// Target table.
        table: String,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// Reading records from the store failed.
    #[error("failed to query store: {context}")]
    StoreQuery {
        /// What was being read.
        context: String,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// Writing a prediction failed.
    #[error("failed to write prediction for record {id}")]
    StoreWrite {
        /// Record id.
        id: i64,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// Committing accumulated writes failed.
    #[error("failed to commit pending writes")]
    StoreCommit {
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// Failed to create an export directory.
    #[error("failed to create output directory '{path}'")]
    OutputDirCreateFailed {
        /// Path to the output directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a JSON report.
    #[error("failed to write report '{path}'")]
    ReportWrite {
        /// Path to the report file.
        path: PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Whether this error only affects one record and must not abort a run.
    pub const fn is_per_record(&self) -> bool {
        matches!(
            self,
            Self::PathResolution { .. }
                | Self::ImageDecode { .. }
                | Self::Inference { .. }
                | Self::StoreWrite { .. }
        )
    }

    /// Structured skip reason for per-record errors.
    pub const fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::PathResolution { .. } => Some(SkipReason::PathResolution),
            Self::ImageDecode { .. } => Some(SkipReason::ImageDecode),
            Self::Inference { .. } => Some(SkipReason::Inference),
            Self::StoreWrite { .. } => Some(SkipReason::StoreWrite),
            _ => None,
        }
    }
}

/// Why a record was skipped during a prediction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Stored path did not resolve to an existing file.
    PathResolution,
    /// Image could not be decoded.
    ImageDecode,
    /// Classifier returned an error.
    Inference,
    /// Update statement failed.
    StoreWrite,
    /// Any other per-record failure.
    Other,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PathResolution => "PathResolutionFailure",
            Self::ImageDecode => "ImageDecodeFailure",
            Self::Inference => "InferenceFailure",
            Self::StoreWrite => "StoreWriteFailure",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}
