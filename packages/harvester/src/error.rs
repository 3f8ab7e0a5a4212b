//! Error types for the harvester.
//!
//! Every error maps onto an [`ErrorKind`] so the batch runner can decide
//! whether a failure skips one document or aborts the whole run.

use thiserror::Error;

/// How a failure affects the rest of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The enactment does not exist at the source. Skip and continue.
    NotFound,
    /// Network trouble or a 5xx that survived the retry policy. Skip and continue.
    Transient,
    /// The payload did not have the expected shape. Skip and continue.
    Malformed,
    /// The caller passed something unusable (an ID, a date).
    InvalidInput,
    /// Nothing sensible can happen after this. Abort the run.
    Fatal,
}

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Enactment ID in neither accepted format.
    #[error("Invalid SFS ID: '{0}'. Expected YYYY:NNN (e.g., 2009:907) or sfs-YYYY-NNN (e.g., sfs-2009-907)")]
    InvalidEnactmentId(String),

    /// Invalid date format.
    #[error("Invalid date: '{0}'. Expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS")]
    InvalidDate(String),

    /// HTTP request failed without a retryable cause.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source has no document for this ID.
    #[error("No document found for {id}")]
    NotFound { id: String },

    /// The source answered with a status that is neither success nor retryable.
    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// All retry attempts failed.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// The response body could not be interpreted.
    #[error("Malformed response for {context}: {message}")]
    MalformedResponse { context: String, message: String },

    /// JSON decoding failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A source could not be reached at all.
    #[error("Could not reach {service}: {message}")]
    SourceUnreachable { service: String, message: String },

    /// The output directory cannot be used.
    #[error("Output directory {path} is not writable: {message}")]
    OutputUnwritable { path: String, message: String },

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    YamlSerialization(#[from] serde_yaml_ng::Error),
}

impl HarvesterError {
    /// Classify this error for batch handling.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            // Non-retryable statuses still only cost one document
            Self::RetriesExhausted { .. } | Self::Http(_) | Self::UnexpectedStatus { .. } => {
                ErrorKind::Transient
            }
            Self::MalformedResponse { .. } | Self::Json(_) => ErrorKind::Malformed,
            Self::InvalidEnactmentId(_) | Self::InvalidDate(_) => ErrorKind::InvalidInput,
            Self::SourceUnreachable { .. }
            | Self::OutputUnwritable { .. }
            | Self::Config(_)
            | Self::Io(_)
            | Self::YamlSerialization(_) => ErrorKind::Fatal,
        }
    }

    /// Whether this error must abort the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
