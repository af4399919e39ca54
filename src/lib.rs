/// Language Tag Fixer
///
/// Finds catalog episodes whose audio tracks carry no language tag, samples
/// the audio, asks a detection service what is spoken, and writes the answer
/// back into the MP4/MKV container.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod correction;
pub mod detection;
pub mod pipeline;
pub mod report;
pub mod session;

// Re-export main types for easy access
pub use crate::audio::{FfmpegSampleExtractor, SampleExtractor};
pub use crate::catalog::{AudioStream, Episode, LibrarySection, MediaCatalog, PlexCatalog};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::correction::{ContainerCorrector, MetadataCorrector};
pub use crate::detection::{LanguageDetector, WhisperLanguageDetector};
pub use crate::pipeline::{Classification, RemediationPipeline};
pub use crate::report::{ConsoleReporter, OutcomeObserver, PipelineEvent, SilentObserver};
pub use crate::session::{RunSession, RunSummary};
pub use langtag_core::{
    normalize, ContainerKind, LangtagError, LanguageDetectionResult, MediaTrackCandidate, Outcome,
};
