//! Audio track candidate and its terminal outcome

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Container families the remediation pipeline knows how to correct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    Mp4,
    Mkv,
    Unsupported,
}

impl ContainerKind {
    /// Derive the container kind from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("mp4") => Self::Mp4,
            Some("mkv") => Self::Mkv,
            _ => Self::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Terminal classification of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Pending,
    SkippedUnsupportedContainer,
    SkippedValidLanguage,
    DetectionFailed,
    Corrected,
    CorrectionFailed,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::SkippedUnsupportedContainer | Self::SkippedValidLanguage
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::DetectionFailed | Self::CorrectionFailed)
    }

    /// Status column written to the audit log
    pub fn audit_status(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::SkippedUnsupportedContainer | Self::SkippedValidLanguage => "Skipped",
            Self::DetectionFailed => "Detection Failed",
            Self::Corrected => "Language Metadata Updated Successfully",
            Self::CorrectionFailed => "Correction Failed",
        }
    }
}

/// A single audio track flagged for language remediation
#[derive(Debug, Clone)]
pub struct MediaTrackCandidate {
    human_label: String,
    container_path: PathBuf,
    container_kind: ContainerKind,
    current_language_code: Option<String>,
    audio_track_index: usize,
    catalog_key: String,
    sample_audio_path: Option<PathBuf>,
    detected_language_code: Option<String>,
    outcome: Outcome,
    outcome_detail: Option<String>,
}

impl MediaTrackCandidate {
    /// Create a pending candidate; the container kind is derived from the path
    pub fn new(
        human_label: String,
        container_path: PathBuf,
        current_language_code: Option<String>,
        audio_track_index: usize,
        catalog_key: String,
    ) -> Self {
        let container_kind = ContainerKind::from_path(&container_path);
        Self {
            human_label,
            container_path,
            container_kind,
            current_language_code,
            audio_track_index,
            catalog_key,
            sample_audio_path: None,
            detected_language_code: None,
            outcome: Outcome::Pending,
            outcome_detail: None,
        }
    }

    pub fn human_label(&self) -> &str {
        &self.human_label
    }

    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    pub fn container_kind(&self) -> ContainerKind {
        self.container_kind
    }

    pub fn current_language_code(&self) -> Option<&str> {
        self.current_language_code.as_deref()
    }

    /// Zero-based position of the track among the file's audio streams
    pub fn audio_track_index(&self) -> usize {
        self.audio_track_index
    }

    pub fn catalog_key(&self) -> &str {
        &self.catalog_key
    }

    pub fn sample_audio_path(&self) -> Option<&Path> {
        self.sample_audio_path.as_deref()
    }

    pub fn set_sample_audio_path(&mut self, path: PathBuf) {
        self.sample_audio_path = Some(path);
    }

    /// Hand back the sample path so the caller can delete it
    pub fn take_sample_audio_path(&mut self) -> Option<PathBuf> {
        self.sample_audio_path.take()
    }

    pub fn detected_language_code(&self) -> Option<&str> {
        self.detected_language_code.as_deref()
    }

    pub fn set_detected_language_code(&mut self, code: String) {
        self.detected_language_code = Some(code);
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn outcome_detail(&self) -> Option<&str> {
        self.outcome_detail.as_deref()
    }

    /// Whether the track's current tag is missing, empty or "unknown"
    pub fn needs_language(&self) -> bool {
        match self.current_language_code.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(code) => code.eq_ignore_ascii_case("unknown"),
        }
    }

    /// Set the terminal outcome. Returns false (and changes nothing) if an
    /// outcome was already set.
    pub fn resolve(&mut self, outcome: Outcome, detail: impl Into<String>) -> bool {
        if self.outcome.is_terminal() || !outcome.is_terminal() {
            return false;
        }
        let detail = single_line(&detail.into());
        self.outcome = outcome;
        self.outcome_detail = (!detail.is_empty()).then_some(detail);
        true
    }

    /// `"<label> <status> <details>"`, one line of the audit log
    pub fn audit_line(&self) -> String {
        let mut line = format!("{} {}", self.human_label, self.outcome.audit_status());
        if let Some(detail) = &self.outcome_detail {
            line.push(' ');
            line.push_str(detail);
        }
        line
    }
}

/// Collapse line breaks and other control characters so a detail taken
/// from tool stderr or an HTTP body stays on one audit line
fn single_line(detail: &str) -> String {
    detail
        .split(|c: char| c.is_control())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(path: &str, code: Option<&str>) -> MediaTrackCandidate {
        MediaTrackCandidate::new(
            "Show S01E01".to_string(),
            PathBuf::from(path),
            code.map(str::to_string),
            0,
            "101".to_string(),
        )
    }

    #[test]
    fn test_container_kind_from_extension() {
        assert_eq!(ContainerKind::from_path(Path::new("/tv/a.mp4")), ContainerKind::Mp4);
        assert_eq!(ContainerKind::from_path(Path::new("/tv/a.MKV")), ContainerKind::Mkv);
        assert_eq!(ContainerKind::from_path(Path::new("/tv/a.avi")), ContainerKind::Unsupported);
        assert_eq!(ContainerKind::from_path(Path::new("/tv/noext")), ContainerKind::Unsupported);
    }

    #[test]
    fn test_needs_language() {
        assert!(candidate("a.mp4", None).needs_language());
        assert!(candidate("a.mp4", Some("")).needs_language());
        assert!(candidate("a.mp4", Some("  ")).needs_language());
        assert!(candidate("a.mp4", Some("unknown")).needs_language());
        assert!(candidate("a.mp4", Some("Unknown")).needs_language());
        assert!(!candidate("a.mp4", Some("eng")).needs_language());
        assert!(!candidate("a.mp4", Some("und")).needs_language());
    }

    #[test]
    fn test_outcome_is_set_once() {
        let mut c = candidate("a.mp4", None);
        assert_eq!(c.outcome(), Outcome::Pending);
        assert!(!c.resolve(Outcome::Pending, "ignored"));

        assert!(c.resolve(Outcome::DetectionFailed, "HTTP 500"));
        assert!(!c.resolve(Outcome::Corrected, "to en"));
        assert_eq!(c.outcome(), Outcome::DetectionFailed);
        assert_eq!(c.outcome_detail(), Some("HTTP 500"));
    }

    #[test]
    fn test_audit_line() {
        let mut c = candidate("a.mp4", Some(""));
        c.resolve(Outcome::Corrected, "to en");
        assert_eq!(c.audit_line(), "Show S01E01 Language Metadata Updated Successfully to en");

        let mut c = candidate("a.mp4", Some("eng"));
        c.resolve(Outcome::SkippedValidLanguage, "");
        assert_eq!(c.audit_line(), "Show S01E01 Skipped");
    }

    #[test]
    fn test_multiline_detail_is_flattened() {
        let mut c = candidate("a.mp4", None);
        c.resolve(
            Outcome::DetectionFailed,
            "Language detection failed (HTTP 500): <html>\r\n<body>\n==\tboom\n</body>\n</html>\n",
        );
        let line = c.audit_line();
        assert_eq!(line.lines().count(), 1);
        assert_eq!(
            line,
            "Show S01E01 Detection Failed Language detection failed (HTTP 500): <html> <body> == boom </body> </html>"
        );

        let mut c = candidate("a.mp4", None);
        c.resolve(Outcome::CorrectionFailed, "\n\n");
        assert_eq!(c.outcome_detail(), None);
    }

    #[test]
    fn test_take_sample_path_clears_it() {
        let mut c = candidate("a.mkv", None);
        c.set_sample_audio_path(PathBuf::from("a.mp3"));
        assert_eq!(c.take_sample_audio_path(), Some(PathBuf::from("a.mp3")));
        assert!(c.sample_audio_path().is_none());
    }
}
