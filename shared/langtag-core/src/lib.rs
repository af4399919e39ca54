//! Langtag Core - Shared data structures for audio language remediation

pub mod candidate;
pub mod language;

pub use candidate::{ContainerKind, MediaTrackCandidate, Outcome};
pub use language::{normalize, LanguageDetectionResult};

/// Result type for remediation operations
pub type Result<T> = std::result::Result<T, LangtagError>;

/// Error types for remediation operations
#[derive(thiserror::Error, Debug)]
pub enum LangtagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Sample extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Language detection failed{}: {message}", http_status(.status))]
    DetectionFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("No canonical language code for '{0}'")]
    TranslationFailed(String),

    #[error("Metadata correction failed: {0}")]
    CorrectionFailed(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

fn http_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl LangtagError {
    /// Detection failure without an HTTP status (transport error, bad payload)
    pub fn detection(message: impl Into<String>) -> Self {
        Self::DetectionFailed {
            status: None,
            message: message.into(),
        }
    }
}
