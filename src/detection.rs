use async_trait::async_trait;
use langtag_core::{LangtagError, LanguageDetectionResult, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Classifies the spoken language of an audio sample
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, sample: &Path) -> Result<LanguageDetectionResult>;
}

/// Response body of `POST /detect-language`
#[derive(Debug, Clone, Deserialize)]
struct DetectLanguageResponse {
    detected_language: Option<String>,
    language_code: Option<String>,
}

/// Client for a Whisper ASR webservice exposing `/detect-language`
#[derive(Debug, Clone)]
pub struct WhisperLanguageDetector {
    client: reqwest::Client,
    url: String,
}

impl WhisperLanguageDetector {
    /// `endpoint` is `host:port`; a full `http(s)://` base is used as given
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LangtagError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: detect_url(endpoint),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn detect_url(endpoint: &str) -> String {
    let base = endpoint.trim().trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}/detect-language", base)
    } else {
        format!("http://{}/detect-language", base)
    }
}

#[async_trait]
impl LanguageDetector for WhisperLanguageDetector {
    async fn detect(&self, sample: &Path) -> Result<LanguageDetectionResult> {
        info!("🤖 Sending {} to language detection", sample.display());

        let audio_data = tokio::fs::read(sample).await?;
        let file_name = sample
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "sample.mp3".to_string());

        let part = reqwest::multipart::Part::bytes(audio_data)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| LangtagError::detection(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("audio_file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LangtagError::detection(format!("request to {} timed out", self.url))
                } else {
                    LangtagError::detection(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LangtagError::detection(e.to_string()))?;

        if !status.is_success() {
            warn!("Detection service answered {}: {}", status, body);
            return Err(LangtagError::DetectionFailed {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let parsed: DetectLanguageResponse = serde_json::from_str(&body).map_err(|e| {
            LangtagError::detection(format!("unexpected response body '{}': {}", body, e))
        })?;

        let code = parsed
            .language_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                LangtagError::detection(format!("response has no language_code: {}", body))
            })?;
        let display_name = parsed.detected_language.unwrap_or_else(|| code.clone());

        info!("🗣️  Language detected: {} ({})", display_name, code);
        Ok(LanguageDetectionResult::new(code, display_name))
    }
}
