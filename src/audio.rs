use async_trait::async_trait;
use langtag_core::{LangtagError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{SamplingConfig, ToolConfig};

/// Produces a short audio sample used only for language classification
#[async_trait]
pub trait SampleExtractor: Send + Sync {
    /// Extract a sample of the given audio track and return its path
    async fn extract(&self, source: &Path, audio_track_index: usize) -> Result<PathBuf>;
}

/// ffmpeg-backed sample extractor: fixed offset, fixed duration, MP3 output
#[derive(Debug, Clone)]
pub struct FfmpegSampleExtractor {
    ffmpeg: PathBuf,
    offset: Duration,
    duration: Duration,
    bitrate: String,
    sample_dir: Option<PathBuf>,
}

impl FfmpegSampleExtractor {
    pub fn new(sampling: &SamplingConfig, tools: &ToolConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            offset: sampling.offset(),
            duration: sampling.duration(),
            bitrate: sampling.bitrate.clone(),
            sample_dir: sampling.sample_dir.clone(),
        }
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// `<stem>.mp3`, next to the source unless a sample directory is set
    pub fn sample_path_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "sample".to_string());
        let dir = self
            .sample_dir
            .clone()
            .or_else(|| source.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        dir.join(format!("{}.mp3", stem))
    }

    fn build_args(&self, source: &Path, audio_track_index: usize, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "warning".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            format_timestamp(self.offset),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-t".to_string(),
            self.duration.as_secs().to_string(),
            "-map".to_string(),
            format!("0:a:{}", audio_track_index),
            "-vn".to_string(), // No video stream
            "-acodec".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            self.bitrate.clone(),
            output.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl SampleExtractor for FfmpegSampleExtractor {
    async fn extract(&self, source: &Path, audio_track_index: usize) -> Result<PathBuf> {
        let output_path = self.sample_path_for(source);

        info!(
            "🎵 Extracting {}s sample from {}",
            self.duration.as_secs(),
            source.display()
        );

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(source, audio_track_index, &output_path);
        debug!("Running {} {}", self.ffmpeg.display(), args.join(" "));

        let output = tokio::process::Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                LangtagError::ExtractionFailed(format!(
                    "could not run {}: {}",
                    self.ffmpeg.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            discard_partial(&output_path).await;
            return Err(LangtagError::ExtractionFailed(format!(
                "{} exited with {}: {}",
                self.ffmpeg.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // ffmpeg can exit cleanly without writing anything for short or
        // malformed input
        let produced = tokio::fs::metadata(&output_path)
            .await
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if !produced {
            discard_partial(&output_path).await;
            return Err(LangtagError::ExtractionFailed(format!(
                "no audio sample written to {}",
                output_path.display()
            )));
        }

        info!("✅ Sample saved: {}", output_path.display());
        Ok(output_path)
    }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove partial sample {}: {}", path.display(), e);
        }
    }
}

/// Remove a sample artifact; a missing file is not an error
pub async fn remove_sample(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("🧹 Removed sample {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// HH:MM:SS as accepted by ffmpeg's `-ss`
pub fn format_timestamp(offset: Duration) -> String {
    let secs = offset.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
