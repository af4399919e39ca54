use langtag_core::{normalize, ContainerKind, LangtagError, LanguageDetectionResult, MediaTrackCandidate, Outcome};
use std::path::PathBuf;

#[test]
fn test_candidate_lifecycle_to_corrected() {
    let mut candidate = MediaTrackCandidate::new(
        "Show S01E01".to_string(),
        PathBuf::from("/tv/Show/Season 1/Show - S01E01.mp4"),
        Some(String::new()),
        0,
        "4242".to_string(),
    );

    assert_eq!(candidate.container_kind(), ContainerKind::Mp4);
    assert!(candidate.needs_language());

    let detection = LanguageDetectionResult::new("en", "english");
    candidate.set_detected_language_code(detection.code.clone());
    assert_eq!(normalize(candidate.detected_language_code().unwrap()), Some("eng"));

    assert!(candidate.resolve(Outcome::Corrected, "to en"));
    assert_eq!(
        candidate.audit_line(),
        "Show S01E01 Language Metadata Updated Successfully to en"
    );
}

#[test]
fn test_unsupported_container_is_never_corrected() {
    let candidate = MediaTrackCandidate::new(
        "Old Show S02E03".to_string(),
        PathBuf::from("/tv/Old Show/ep.avi"),
        None,
        0,
        "7".to_string(),
    );
    assert!(!candidate.container_kind().is_supported());
}

#[test]
fn test_error_taxonomy_messages() {
    let err = LangtagError::TranslationFailed("xx".to_string());
    assert_eq!(err.to_string(), "No canonical language code for 'xx'");

    let err = LangtagError::Configuration("missing key 'token'".to_string());
    assert!(err.to_string().starts_with("Configuration error"));
}
