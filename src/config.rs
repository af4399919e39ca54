use langtag_core::{LangtagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Languages already handled by the library; episodes whose audio carries
/// one of these are filtered out of the catalog search.
pub const DEFAULT_EXCLUDED_LANGUAGES: &[&str] = &[
    "kor", "ja-JP", "en", "en-US", "deu", "fra", "spa", "ita", "swe", "ton", "ja",
];

/// Configuration for the language tag fixer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Media catalog (Plex) connection
    pub catalog: CatalogConfig,

    /// Language detection service
    pub detection: DetectionConfig,

    /// Audio sample extraction
    pub sampling: SamplingConfig,

    /// External tool locations
    pub tools: ToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the Plex server, e.g. http://127.0.0.1:32400
    pub base_url: String,

    /// Plex authentication token
    pub token: String,

    /// Library section to scan
    pub library: String,

    /// Audio languages excluded from the episode search
    pub excluded_languages: Vec<String>,

    /// HTTP timeout for catalog requests (seconds)
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// host:port of the detection service
    pub endpoint: String,

    /// Upper bound for a single detection request (seconds)
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Where the sample starts, in seconds from the beginning of the file
    pub offset_seconds: u64,

    /// Sample length in seconds
    pub duration_seconds: u64,

    /// MP3 bitrate passed to the encoder
    pub bitrate: String,

    /// Directory for samples; next to the source file when unset
    pub sample_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub mkvpropedit: PathBuf,

    /// Probe the written tag before accepting a correction
    pub verify_corrections: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            library: String::new(),
            excluded_languages: DEFAULT_EXCLUDED_LANGUAGES
                .iter()
                .map(|code| code.to_string())
                .collect(),
            timeout_seconds: 30,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_seconds: 120,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            offset_seconds: 30,
            duration_seconds: 30,
            bitrate: "128k".to_string(),
            sample_dir: None,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            mkvpropedit: PathBuf::from("mkvpropedit"),
            verify_corrections: true,
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl DetectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl SamplingConfig {
    pub fn offset(&self) -> Duration {
        Duration::from_secs(self.offset_seconds)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }
}

impl Config {
    /// Load configuration from a file. `.toml` files are parsed as TOML,
    /// anything else as `key=value` lines.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LangtagError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&contents).map_err(|e| {
                LangtagError::Configuration(format!("invalid TOML in {}: {}", path.display(), e))
            })?
        } else {
            Self::from_key_values(&contents)?
        };

        config.validate()?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Parse `key=value` lines. Blank lines and `#` comments are ignored;
    /// any other line without `=` is fatal.
    pub fn from_key_values(contents: &str) -> Result<Self> {
        let mut config = Self::default();

        for (number, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                LangtagError::Configuration(format!(
                    "line {}: expected key=value, found '{}'",
                    number + 1,
                    line
                ))
            })?;

            if !config.apply(key.trim(), value.trim())? {
                tracing::warn!("Ignoring unknown configuration key '{}'", key.trim());
            }
        }

        Ok(config)
    }

    /// Apply a single setting; returns false for unknown keys
    fn apply(&mut self, key: &str, value: &str) -> Result<bool> {
        match key {
            "plexURL" => self.catalog.base_url = value.to_string(),
            "token" => self.catalog.token = value.to_string(),
            "library" => self.catalog.library = value.to_string(),
            "whisper" => self.detection.endpoint = value.to_string(),
            "excludedLanguages" => {
                self.catalog.excluded_languages = value
                    .split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "catalogTimeout" => self.catalog.timeout_seconds = parse_number(key, value)?,
            "detectTimeout" => self.detection.timeout_seconds = parse_number(key, value)?,
            "sampleOffset" => self.sampling.offset_seconds = parse_number(key, value)?,
            "sampleDuration" => self.sampling.duration_seconds = parse_number(key, value)?,
            "sampleBitrate" => self.sampling.bitrate = value.to_string(),
            "sampleDir" => self.sampling.sample_dir = Some(PathBuf::from(value)),
            "ffmpeg" => self.tools.ffmpeg = PathBuf::from(value),
            "ffprobe" => self.tools.ffprobe = PathBuf::from(value),
            "mkvpropedit" => self.tools.mkvpropedit = PathBuf::from(value),
            "verifyCorrections" => self.tools.verify_corrections = parse_bool(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("plexURL", &self.catalog.base_url),
            ("token", &self.catalog.token),
            ("library", &self.catalog.library),
            ("whisper", &self.detection.endpoint),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(LangtagError::Configuration(format!(
                    "missing required key '{}'",
                    key
                )));
            }
        }

        url::Url::parse(&self.catalog.base_url).map_err(|e| {
            LangtagError::Configuration(format!(
                "plexURL '{}' is not a valid URL: {}",
                self.catalog.base_url, e
            ))
        })?;

        if self.sampling.duration_seconds == 0 {
            return Err(LangtagError::Configuration(
                "sampleDuration must be greater than 0".to_string(),
            ));
        }

        if self.catalog.timeout_seconds == 0 {
            return Err(LangtagError::Configuration(
                "catalogTimeout must be greater than 0".to_string(),
            ));
        }

        if self.detection.timeout_seconds == 0 {
            return Err(LangtagError::Configuration(
                "detectTimeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Language Tag Fixer Configuration:\n\
            - Catalog: {} (library '{}')\n\
            - Detection Service: {} (timeout {}s)\n\
            - Sample: {}s from offset {}s at {}\n\
            - Excluded Languages: {}\n\
            - Verify Corrections: {}",
            self.catalog.base_url,
            self.catalog.library,
            self.detection.endpoint,
            self.detection.timeout_seconds,
            self.sampling.duration_seconds,
            self.sampling.offset_seconds,
            self.sampling.bitrate,
            self.catalog.excluded_languages.join(", "),
            self.tools.verify_corrections,
        )
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| {
        LangtagError::Configuration(format!("'{}' must be a whole number, got '{}'", key, value))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(LangtagError::Configuration(format!(
            "'{}' must be true or false, got '{}'",
            key, value
        ))),
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_catalog(mut self, base_url: &str, token: &str, library: &str) -> Self {
        self.config.catalog.base_url = base_url.to_string();
        self.config.catalog.token = token.to_string();
        self.config.catalog.library = library.to_string();
        self
    }

    pub fn with_detection_endpoint(mut self, endpoint: &str) -> Self {
        self.config.detection.endpoint = endpoint.to_string();
        self
    }

    pub fn with_detection_timeout(mut self, seconds: u64) -> Self {
        self.config.detection.timeout_seconds = seconds;
        self
    }

    pub fn with_sample_window(mut self, offset_seconds: u64, duration_seconds: u64) -> Self {
        self.config.sampling.offset_seconds = offset_seconds;
        self.config.sampling.duration_seconds = duration_seconds;
        self
    }

    pub fn with_sample_dir(mut self, dir: PathBuf) -> Self {
        self.config.sampling.sample_dir = Some(dir);
        self
    }

    pub fn with_tools(mut self, ffmpeg: PathBuf, ffprobe: PathBuf, mkvpropedit: PathBuf) -> Self {
        self.config.tools.ffmpeg = ffmpeg;
        self.config.tools.ffprobe = ffprobe;
        self.config.tools.mkvpropedit = mkvpropedit;
        self
    }

    pub fn verify_corrections(mut self, verify: bool) -> Self {
        self.config.tools.verify_corrections = verify;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
