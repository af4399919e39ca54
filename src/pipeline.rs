use anyhow::{Context, Result};
use futures::FutureExt;
use langtag_core::{normalize, LangtagError, MediaTrackCandidate, Outcome};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::audio::{remove_sample, SampleExtractor};
use crate::catalog::{Episode, LibrarySection, MediaCatalog};
use crate::correction::MetadataCorrector;
use crate::detection::LanguageDetector;
use crate::report::{OutcomeObserver, PipelineEvent, SilentObserver};
use crate::session::RunSession;

/// Sentinel the detection service uses when it cannot classify the audio
const INVALID_LANGUAGE: &str = "invalid";

/// Classification of a discovered audio track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Missing/unknown tag in a container we can correct
    Eligible,
    /// Track already carries a language tag
    ValidLanguage,
    /// Missing/unknown tag, but neither MP4 nor MKV
    UnsupportedContainer,
}

/// Per-track remediation: classify, sample, detect, normalize, correct,
/// re-analyze, clean up. Candidates are processed one at a time in catalog
/// order; a failing candidate never stops the batch.
pub struct RemediationPipeline {
    catalog: Arc<dyn MediaCatalog>,
    extractor: Arc<dyn SampleExtractor>,
    detector: Arc<dyn LanguageDetector>,
    corrector: Arc<dyn MetadataCorrector>,
    observer: Arc<dyn OutcomeObserver>,
}

impl RemediationPipeline {
    pub fn new(
        catalog: Arc<dyn MediaCatalog>,
        extractor: Arc<dyn SampleExtractor>,
        detector: Arc<dyn LanguageDetector>,
        corrector: Arc<dyn MetadataCorrector>,
    ) -> Self {
        Self {
            catalog,
            extractor,
            detector,
            corrector,
            observer: Arc::new(SilentObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn OutcomeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Decide whether a track qualifies for remediation
    pub fn classify(candidate: &MediaTrackCandidate) -> Classification {
        if !candidate.needs_language() {
            Classification::ValidLanguage
        } else if !candidate.container_kind().is_supported() {
            Classification::UnsupportedContainer
        } else {
            Classification::Eligible
        }
    }

    /// Turn an episode's audio streams into candidates. The display label is
    /// computed here, before any classification happens.
    pub async fn discover(&self, episode: &Episode) -> langtag_core::Result<Vec<MediaTrackCandidate>> {
        let label = episode.human_label();
        let streams = self.catalog.audio_streams(episode).await?;

        Ok(streams
            .into_iter()
            .map(|stream| {
                MediaTrackCandidate::new(
                    label.clone(),
                    stream.part_file,
                    stream.language_code,
                    stream.index,
                    episode.rating_key.clone(),
                )
            })
            .collect())
    }

    /// Sweep a library section. Only catalog search failures propagate;
    /// everything per episode or per candidate is recorded and skipped.
    pub async fn run(
        &self,
        section: &LibrarySection,
        excluded_languages: &[String],
        session: &mut RunSession,
    ) -> Result<usize> {
        info!("🚀 Starting remediation run on '{}'", section.title);

        let episodes = self
            .catalog
            .search_episodes(section, excluded_languages)
            .await
            .with_context(|| format!("searching episodes in '{}'", section.title))?;

        let mut visited = 0;
        for episode in &episodes {
            let candidates = match self.discover(episode).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("Skipping {}: cannot list audio streams: {}", episode.human_label(), e);
                    continue;
                }
            };

            for mut candidate in candidates {
                self.process_guarded(&mut candidate).await;
                visited += 1;
                if let Err(e) = session.record(&candidate) {
                    error!("Failed to write audit line for {}: {}", candidate.human_label(), e);
                }
            }
        }

        info!("🎉 Visited {} audio tracks across {} episodes", visited, episodes.len());
        Ok(visited)
    }

    /// Last-resort boundary: a panic inside one candidate is turned into a
    /// failed outcome so the loop can move on
    async fn process_guarded(&self, candidate: &mut MediaTrackCandidate) -> Outcome {
        let result = AssertUnwindSafe(self.process_candidate(candidate))
            .catch_unwind()
            .await;

        match result {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("💥 Processing {} panicked: {}", candidate.human_label(), message);
                self.cleanup(candidate).await;
                candidate.resolve(
                    Outcome::CorrectionFailed,
                    format!("aborted unexpectedly: {}", message),
                );
                self.observer.on_event(&PipelineEvent::Finished { candidate });
                candidate.outcome()
            }
        }
    }

    /// Drive one candidate to a terminal outcome. The sample artifact is
    /// removed on every path.
    pub async fn process_candidate(&self, candidate: &mut MediaTrackCandidate) -> Outcome {
        self.observer.on_event(&PipelineEvent::Started {
            label: candidate.human_label(),
        });

        let (outcome, detail) = self.remediate(candidate).await;
        candidate.resolve(outcome, detail);

        self.cleanup(candidate).await;
        self.observer.on_event(&PipelineEvent::Finished { candidate });
        candidate.outcome()
    }

    async fn remediate(&self, candidate: &mut MediaTrackCandidate) -> (Outcome, String) {
        match Self::classify(candidate) {
            Classification::ValidLanguage => {
                return (
                    Outcome::SkippedValidLanguage,
                    format!(
                        "due to existing language code {}",
                        candidate.current_language_code().unwrap_or_default()
                    ),
                );
            }
            Classification::UnsupportedContainer => {
                let extension = candidate
                    .container_path()
                    .extension()
                    .map(|ext| format!(".{}", ext.to_string_lossy()))
                    .unwrap_or_else(|| "without extension".to_string());
                return (
                    Outcome::SkippedUnsupportedContainer,
                    format!("due to unsupported container {}", extension),
                );
            }
            Classification::Eligible => {
                debug!("{} qualifies for language detection", candidate.human_label());
            }
        }

        let sample = match self
            .extractor
            .extract(candidate.container_path(), candidate.audio_track_index())
            .await
        {
            Ok(sample) => sample,
            Err(e) => return (Outcome::DetectionFailed, e.to_string()),
        };
        candidate.set_sample_audio_path(sample.clone());

        let detection = match self.detector.detect(&sample).await {
            Ok(detection) => detection,
            Err(e) => return (Outcome::DetectionFailed, e.to_string()),
        };
        self.observer.on_event(&PipelineEvent::Detected {
            label: candidate.human_label(),
            result: &detection,
        });
        candidate.set_detected_language_code(detection.code.clone());

        if detection.code.eq_ignore_ascii_case(INVALID_LANGUAGE) {
            return (
                Outcome::DetectionFailed,
                "detection service could not classify the sample".to_string(),
            );
        }

        let canonical = match normalize(&detection.code) {
            Some(code) => code,
            None => {
                return (
                    Outcome::DetectionFailed,
                    LangtagError::TranslationFailed(detection.code.clone()).to_string(),
                )
            }
        };

        if let Err(e) = self.corrector.correct(candidate, canonical).await {
            return (Outcome::CorrectionFailed, e.to_string());
        }

        if let Err(e) = self.catalog.analyze(candidate.catalog_key()).await {
            warn!(
                "{} was corrected but catalog analysis failed: {}",
                candidate.human_label(),
                e
            );
        }

        (Outcome::Corrected, format!("to {}", detection.code))
    }

    async fn cleanup(&self, candidate: &mut MediaTrackCandidate) {
        if let Some(sample) = candidate.take_sample_audio_path() {
            if let Err(e) = remove_sample(&sample).await {
                warn!("Failed to remove sample {}: {}", sample.display(), e);
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidate(path: &str, code: Option<&str>) -> MediaTrackCandidate {
        MediaTrackCandidate::new(
            "Show S01E01".to_string(),
            PathBuf::from(path),
            code.map(str::to_string),
            0,
            "1".to_string(),
        )
    }

    #[test]
    fn test_classification() {
        use Classification::*;
        assert_eq!(RemediationPipeline::classify(&candidate("a.mp4", None)), Eligible);
        assert_eq!(RemediationPipeline::classify(&candidate("a.mkv", Some(""))), Eligible);
        assert_eq!(RemediationPipeline::classify(&candidate("a.mkv", Some("unknown"))), Eligible);
        assert_eq!(RemediationPipeline::classify(&candidate("a.avi", None)), UnsupportedContainer);
        assert_eq!(RemediationPipeline::classify(&candidate("a.avi", Some("eng"))), ValidLanguage);
        assert_eq!(RemediationPipeline::classify(&candidate("a.mp4", Some("jpn"))), ValidLanguage);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
