//! Language code normalization
//!
//! Detection services answer with ISO 639-1 codes ("en"), while container
//! metadata expects ISO 639-2/T terminology codes ("eng").

use serde::{Deserialize, Serialize};

/// Language reported by the detection service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageDetectionResult {
    /// Code as returned by the service, e.g. "en"
    pub code: String,
    /// Human readable name, e.g. "english"
    pub display_name: String,
}

impl LanguageDetectionResult {
    pub fn new(code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
        }
    }

    /// Canonical container code for this result
    pub fn canonical_code(&self) -> Option<&'static str> {
        normalize(&self.code)
    }
}

/// ISO 639-1 (plus the odd Whisper-specific code) to ISO 639-2/T
const ISO_639_1_TO_2T: &[(&str, &str)] = &[
    ("af", "afr"), ("am", "amh"), ("ar", "ara"), ("as", "asm"), ("az", "aze"),
    ("ba", "bak"), ("be", "bel"), ("bg", "bul"), ("bn", "ben"), ("bo", "bod"),
    ("br", "bre"), ("bs", "bos"), ("ca", "cat"), ("cs", "ces"), ("cy", "cym"),
    ("da", "dan"), ("de", "deu"), ("el", "ell"), ("en", "eng"), ("eo", "epo"),
    ("es", "spa"), ("et", "est"), ("eu", "eus"), ("fa", "fas"), ("fi", "fin"),
    ("fo", "fao"), ("fr", "fra"), ("fy", "fry"), ("ga", "gle"), ("gd", "gla"),
    ("gl", "glg"), ("gu", "guj"), ("ha", "hau"), ("he", "heb"), ("hi", "hin"),
    ("hr", "hrv"), ("ht", "hat"), ("hu", "hun"), ("hy", "hye"), ("ia", "ina"),
    ("id", "ind"), ("ig", "ibo"), ("is", "isl"), ("it", "ita"), ("ja", "jpn"),
    ("jv", "jav"), ("jw", "jav"), ("ka", "kat"), ("kk", "kaz"), ("km", "khm"),
    ("kn", "kan"), ("ko", "kor"), ("ku", "kur"), ("ky", "kir"), ("la", "lat"),
    ("lb", "ltz"), ("ln", "lin"), ("lo", "lao"), ("lt", "lit"), ("lv", "lav"),
    ("mg", "mlg"), ("mi", "mri"), ("mk", "mkd"), ("ml", "mal"), ("mn", "mon"),
    ("mr", "mar"), ("ms", "msa"), ("mt", "mlt"), ("my", "mya"), ("nb", "nob"),
    ("ne", "nep"), ("nl", "nld"), ("nn", "nno"), ("no", "nor"), ("oc", "oci"),
    ("or", "ori"), ("pa", "pan"), ("pl", "pol"), ("ps", "pus"), ("pt", "por"),
    ("qu", "que"), ("ro", "ron"), ("ru", "rus"), ("rw", "kin"), ("sa", "san"),
    ("sd", "snd"), ("si", "sin"), ("sk", "slk"), ("sl", "slv"), ("sn", "sna"),
    ("so", "som"), ("sq", "sqi"), ("sr", "srp"), ("su", "sun"), ("sv", "swe"),
    ("sw", "swa"), ("ta", "tam"), ("te", "tel"), ("tg", "tgk"), ("th", "tha"),
    ("ti", "tir"), ("tk", "tuk"), ("tl", "tgl"), ("tr", "tur"), ("tt", "tat"),
    ("uk", "ukr"), ("ur", "urd"), ("uz", "uzb"), ("vi", "vie"), ("xh", "xho"),
    ("yi", "yid"), ("yo", "yor"), ("zh", "zho"), ("zu", "zul"),
];

/// Three-letter codes Whisper reports for languages without a 639-1 code
const THREE_LETTER_ONLY: &[&str] = &["haw", "yue", "ceb", "fil"];

/// ISO 639-2/B bibliographic codes that differ from their /T form
const BIBLIOGRAPHIC_TO_TERMINOLOGY: &[(&str, &str)] = &[
    ("alb", "sqi"), ("arm", "hye"), ("baq", "eus"), ("bur", "mya"), ("chi", "zho"),
    ("cze", "ces"), ("dut", "nld"), ("fre", "fra"), ("geo", "kat"), ("ger", "deu"),
    ("gre", "ell"), ("ice", "isl"), ("mac", "mkd"), ("mao", "mri"), ("may", "msa"),
    ("per", "fas"), ("rum", "ron"), ("slo", "slk"), ("tib", "bod"), ("wel", "cym"),
];

/// Map a detector language code to the ISO 639-2/T code written into
/// container metadata. Returns `None` for anything unrecognised, including
/// the detector's "invalid" sentinel.
pub fn normalize(code: &str) -> Option<&'static str> {
    // "en-US" / "pt_BR" carry a region subtag
    let primary = code
        .trim()
        .split(|c: char| c == '-' || c == '_')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    match primary.len() {
        2 => ISO_639_1_TO_2T
            .iter()
            .find(|(short, _)| *short == primary)
            .map(|(_, long)| *long),
        3 => THREE_LETTER_ONLY
            .iter()
            .copied()
            .find(|long| *long == primary)
            .or_else(|| {
                ISO_639_1_TO_2T
                    .iter()
                    .map(|(_, long)| *long)
                    .find(|long| *long == primary)
            })
            .or_else(|| {
                BIBLIOGRAPHIC_TO_TERMINOLOGY
                    .iter()
                    .find(|(biblio, _)| *biblio == primary)
                    .map(|(_, term)| *term)
            }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_letter_codes() {
        assert_eq!(normalize("en"), Some("eng"));
        assert_eq!(normalize("de"), Some("deu"));
        assert_eq!(normalize("fr"), Some("fra"));
        assert_eq!(normalize("zh"), Some("zho"));
        assert_eq!(normalize("ja"), Some("jpn"));
        // Whisper reports Javanese as "jw"
        assert_eq!(normalize("jw"), Some("jav"));
    }

    #[test]
    fn test_case_whitespace_and_region() {
        assert_eq!(normalize(" EN "), Some("eng"));
        assert_eq!(normalize("en-US"), Some("eng"));
        assert_eq!(normalize("pt_BR"), Some("por"));
        assert_eq!(normalize("ja-JP"), Some("jpn"));
    }

    #[test]
    fn test_three_letter_codes() {
        assert_eq!(normalize("haw"), Some("haw"));
        assert_eq!(normalize("yue"), Some("yue"));
        assert_eq!(normalize("eng"), Some("eng"));
        assert_eq!(normalize("ger"), Some("deu"));
        assert_eq!(normalize("fre"), Some("fra"));
    }

    #[test]
    fn test_unrecognised_codes() {
        assert_eq!(normalize("invalid"), None);
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("xx"), None);
        assert_eq!(normalize("e1"), None);
        assert_eq!(normalize("zzz"), None);
    }

    #[test]
    fn test_table_targets_are_three_letters() {
        for (short, long) in ISO_639_1_TO_2T {
            assert_eq!(short.len(), 2, "{short}");
            assert_eq!(long.len(), 3, "{long}");
        }
    }

    #[test]
    fn test_detection_result_canonical_code() {
        let result = LanguageDetectionResult::new("en", "english");
        assert_eq!(result.canonical_code(), Some("eng"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["code"], "en");
    }
}
