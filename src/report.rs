use langtag_core::{LanguageDetectionResult, MediaTrackCandidate, Outcome};
use tracing::{error, info, warn};

/// Progress notifications emitted by the pipeline
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    /// A candidate entered the pipeline
    Started { label: &'a str },
    /// Language came back from the detector
    Detected {
        label: &'a str,
        result: &'a LanguageDetectionResult,
    },
    /// A candidate reached its terminal outcome and was cleaned up
    Finished { candidate: &'a MediaTrackCandidate },
}

/// Presentation hook; receives events but never influences control flow
pub trait OutcomeObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent<'_>);
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl OutcomeObserver for SilentObserver {
    fn on_event(&self, _event: &PipelineEvent<'_>) {}
}

/// Console reporter; severity maps to the tracing level so the subscriber's
/// ANSI colouring distinguishes info, warnings and errors
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl OutcomeObserver for ConsoleReporter {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        match event {
            PipelineEvent::Started { label } => info!("📹 Processing {}", label),
            PipelineEvent::Detected { label, result } => {
                info!("🗣️  {}: detected {} ({})", label, result.display_name, result.code)
            }
            PipelineEvent::Finished { candidate } => {
                let label = candidate.human_label();
                let detail = candidate.outcome_detail().unwrap_or("");
                match candidate.outcome() {
                    Outcome::Corrected => info!("✅ {} updated {}", label, detail),
                    Outcome::SkippedValidLanguage | Outcome::SkippedUnsupportedContainer => {
                        warn!("⏭️  Skipping {} {}", label, detail)
                    }
                    Outcome::DetectionFailed | Outcome::CorrectionFailed => {
                        error!("❌ {} {}: {}", label, candidate.outcome().audit_status(), detail)
                    }
                    Outcome::Pending => warn!("{} finished without an outcome", label),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_console_reporter_handles_every_outcome() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let reporter = ConsoleReporter;
        let detection = LanguageDetectionResult::new("en", "english");
        reporter.on_event(&PipelineEvent::Started { label: "Show S01E01" });
        reporter.on_event(&PipelineEvent::Detected {
            label: "Show S01E01",
            result: &detection,
        });

        let outcomes = [
            Outcome::Pending,
            Outcome::SkippedUnsupportedContainer,
            Outcome::SkippedValidLanguage,
            Outcome::DetectionFailed,
            Outcome::Corrected,
            Outcome::CorrectionFailed,
        ];
        for outcome in outcomes {
            let mut candidate = MediaTrackCandidate::new(
                "Show S01E01".to_string(),
                PathBuf::from("/tv/Show/S01E01.mkv"),
                None,
                0,
                "101".to_string(),
            );
            candidate.resolve(outcome, "detail");
            reporter.on_event(&PipelineEvent::Finished { candidate: &candidate });
            assert_eq!(candidate.outcome(), outcome);
        }
    }
}
