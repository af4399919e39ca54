use async_trait::async_trait;
use langtag_core::{normalize, ContainerKind, LangtagError, MediaTrackCandidate, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info, warn};

use crate::config::ToolConfig;

/// Writes a language tag into a candidate's container
#[async_trait]
pub trait MetadataCorrector: Send + Sync {
    async fn correct(&self, candidate: &MediaTrackCandidate, canonical_code: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeTags {
    language: Option<String>,
}

/// Container-aware corrector: remux-and-replace for MP4, in-place property
/// edit for MKV
#[derive(Debug, Clone)]
pub struct ContainerCorrector {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    mkvpropedit: PathBuf,
    verify: bool,
}

impl ContainerCorrector {
    pub fn new(tools: &ToolConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
            mkvpropedit: tools.mkvpropedit.clone(),
            verify: tools.verify_corrections,
        }
    }

    /// `<stem>_corrected.<ext>` beside the original
    pub fn corrected_path_for(source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string());
        source.with_file_name(format!("{}_corrected.{}", stem, ext))
    }

    /// Stream-copy the whole container with the track's language set, then
    /// swap it in. The original is only replaced once the copy is confirmed.
    async fn remux_mp4(&self, candidate: &MediaTrackCandidate, code: &str) -> Result<()> {
        let source = candidate.container_path();
        let corrected = Self::corrected_path_for(source);
        let track = candidate.audio_track_index();

        info!("🔧 Remuxing {} with audio language {}", candidate.human_label(), code);

        let args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "warning".into(),
            "-y".into(),
            "-i".into(),
            source.as_os_str().to_owned(),
            "-map".into(),
            "0".into(),
            "-c".into(),
            "copy".into(),
            format!("-metadata:s:a:{}", track).into(),
            format!("language={}", code).into(),
            corrected.as_os_str().to_owned(),
        ];

        let result = self.finish_remux(&args, source, &corrected, track, code).await;
        if result.is_err() {
            discard(&corrected).await;
        }
        result
    }

    async fn finish_remux(
        &self,
        args: &[OsString],
        source: &Path,
        corrected: &Path,
        track: usize,
        code: &str,
    ) -> Result<()> {
        run_tool(&self.ffmpeg, args).await?;

        let written = tokio::fs::metadata(corrected)
            .await
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if !written {
            return Err(LangtagError::CorrectionFailed(format!(
                "remux produced no output at {}",
                corrected.display()
            )));
        }

        if self.verify {
            self.verify_language(corrected, track, code).await?;
        }

        // rename over the original is atomic on the same filesystem
        tokio::fs::rename(corrected, source).await.map_err(|e| {
            LangtagError::CorrectionFailed(format!(
                "could not replace {} with corrected copy: {}",
                source.display(),
                e
            ))
        })?;

        debug!("Replaced {} with remuxed copy", source.display());
        Ok(())
    }

    /// `mkvpropedit <file> --edit track:aN --set language=<code>`
    async fn edit_mkv(&self, candidate: &MediaTrackCandidate, code: &str) -> Result<()> {
        let source = candidate.container_path();
        let track = candidate.audio_track_index();

        info!("🔧 Editing MKV language for {} to {}", candidate.human_label(), code);

        let args: Vec<OsString> = vec![
            source.as_os_str().to_owned(),
            "--edit".into(),
            format!("track:a{}", track + 1).into(),
            "--set".into(),
            format!("language={}", code).into(),
        ];
        run_tool(&self.mkvpropedit, &args).await?;

        if self.verify {
            self.verify_language(source, track, code).await?;
        }
        Ok(())
    }

    /// Read back the audio track's language tag with ffprobe
    pub async fn probe_language(&self, path: &Path, track: usize) -> Result<Option<String>> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-select_streams".into(),
            format!("a:{}", track).into(),
            "-show_entries".into(),
            "stream_tags=language".into(),
            "-of".into(),
            "json".into(),
            path.as_os_str().to_owned(),
        ];
        let stdout = run_tool(&self.ffprobe, &args).await?;

        let probe: ProbeOutput = serde_json::from_slice(&stdout).map_err(|e| {
            LangtagError::CorrectionFailed(format!("unreadable ffprobe output: {}", e))
        })?;
        Ok(probe
            .streams
            .into_iter()
            .next()
            .and_then(|stream| stream.tags.language))
    }

    /// Matroska keeps the legacy 639-2/B element, so `ger` read back from an
    /// MKV matches a `deu` edit; both sides are compared in canonical form
    async fn verify_language(&self, path: &Path, track: usize, code: &str) -> Result<()> {
        match self.probe_language(path, track).await? {
            Some(found) if tags_match(&found, code) => {
                debug!("Verified audio track {} of {} is tagged {}", track, path.display(), code);
                Ok(())
            }
            found => Err(LangtagError::CorrectionFailed(format!(
                "verification expected language '{}' on {}, found {:?}",
                code,
                path.display(),
                found
            ))),
        }
    }
}

#[async_trait]
impl MetadataCorrector for ContainerCorrector {
    async fn correct(&self, candidate: &MediaTrackCandidate, canonical_code: &str) -> Result<()> {
        match candidate.container_kind() {
            ContainerKind::Mp4 => self.remux_mp4(candidate, canonical_code).await,
            ContainerKind::Mkv => self.edit_mkv(candidate, canonical_code).await,
            ContainerKind::Unsupported => Err(LangtagError::CorrectionFailed(format!(
                "{} is not an MP4 or MKV container",
                candidate.container_path().display()
            ))),
        }
    }
}

fn tags_match(found: &str, code: &str) -> bool {
    found.eq_ignore_ascii_case(code)
        || matches!((normalize(found), normalize(code)), (Some(a), Some(b)) if a == b)
}

/// Run an external tool to completion, returning its stdout
async fn run_tool(program: &Path, args: &[OsString]) -> Result<Vec<u8>> {
    debug!("Running {} {:?}", program.display(), args);

    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            LangtagError::CorrectionFailed(format!("could not run {}: {}", program.display(), e))
        })?;

    if !output.status.success() {
        return Err(LangtagError::CorrectionFailed(format!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(output.stdout)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrected_path() {
        assert_eq!(
            ContainerCorrector::corrected_path_for(Path::new("/tv/Show/S01E01.mp4")),
            PathBuf::from("/tv/Show/S01E01_corrected.mp4")
        );
    }

    #[test]
    fn test_tags_match_across_code_forms() {
        assert!(tags_match("deu", "deu"));
        assert!(tags_match("ger", "deu"));
        assert!(tags_match("fre", "fra"));
        assert!(tags_match("chi", "zho"));
        assert!(tags_match("ENG", "eng"));
        assert!(!tags_match("fra", "deu"));
        assert!(!tags_match("und", "eng"));
    }

    #[test]
    fn test_probe_output_parsing() {
        let probe: ProbeOutput =
            serde_json::from_str(r#"{"streams":[{"tags":{"language":"eng"}}]}"#).unwrap();
        assert_eq!(probe.streams[0].tags.language.as_deref(), Some("eng"));

        let probe: ProbeOutput = serde_json::from_str(r#"{"streams":[{}]}"#).unwrap();
        assert!(probe.streams[0].tags.language.is_none());
    }
}
