//! Media catalog connector
//!
//! The catalog owns episode identity and file locations. Only the handful of
//! Plex endpoints the remediation run needs are wrapped here.

use async_trait::async_trait;
use langtag_core::{LangtagError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Plex stream type for audio
const AUDIO_STREAM_TYPE: u32 = 2;
/// Plex metadata type for episodes
const EPISODE_TYPE: u32 = 4;

/// A library section, e.g. "TV Shows"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySection {
    pub key: String,
    pub title: String,
}

/// An episode as enumerated by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub rating_key: String,
    pub show_title: String,
    pub title: String,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

impl Episode {
    /// Display identity, "Show S01E02"
    pub fn human_label(&self) -> String {
        match (self.season_number, self.episode_number) {
            (Some(season), Some(episode)) => {
                format!("{} S{:02}E{:02}", self.show_title, season, episode)
            }
            _ if !self.title.is_empty() => format!("{} - {}", self.show_title, self.title),
            _ => format!("{} [{}]", self.show_title, self.rating_key),
        }
    }
}

/// One audio stream of an episode's primary media part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStream {
    /// Zero-based position among the part's audio streams
    pub index: usize,
    pub language_code: Option<String>,
    pub part_file: PathBuf,
}

/// Catalog operations the remediation pipeline depends on
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Look up a library section by title
    async fn section(&self, name: &str) -> Result<LibrarySection>;

    /// Episodes of a section, excluding those whose audio language is one
    /// of `excluded_languages`, in catalog order
    async fn search_episodes(
        &self,
        section: &LibrarySection,
        excluded_languages: &[String],
    ) -> Result<Vec<Episode>>;

    /// Audio streams of the episode's first media part
    async fn audio_streams(&self, episode: &Episode) -> Result<Vec<AudioStream>>;

    /// Ask the catalog to re-read the episode's media
    async fn analyze(&self, rating_key: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    media_container: T,
}

#[derive(Debug, Deserialize)]
struct SectionList {
    #[serde(rename = "Directory", default)]
    directories: Vec<PlexDirectory>,
}

#[derive(Debug, Deserialize)]
struct PlexDirectory {
    key: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct MetadataList {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<PlexMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexMetadata {
    rating_key: String,
    #[serde(default)]
    title: String,
    grandparent_title: Option<String>,
    parent_index: Option<u32>,
    index: Option<u32>,
    #[serde(rename = "Media", default)]
    media: Vec<PlexMedia>,
}

#[derive(Debug, Deserialize)]
struct PlexMedia {
    #[serde(rename = "Part", default)]
    parts: Vec<PlexPart>,
}

#[derive(Debug, Deserialize)]
struct PlexPart {
    file: Option<String>,
    #[serde(rename = "Stream", default)]
    streams: Vec<PlexStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexStream {
    stream_type: Option<u32>,
    language_code: Option<String>,
}

impl From<PlexMetadata> for Episode {
    fn from(metadata: PlexMetadata) -> Self {
        Self {
            rating_key: metadata.rating_key,
            show_title: metadata.grandparent_title.unwrap_or_default(),
            title: metadata.title,
            season_number: metadata.parent_index,
            episode_number: metadata.index,
        }
    }
}

/// Plex Media Server connector
#[derive(Debug, Clone)]
pub struct PlexCatalog {
    client: reqwest::Client,
    base_url: Url,
}

impl PlexCatalog {
    /// Connect and authenticate against the server root
    pub async fn connect(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| LangtagError::Configuration(format!("invalid plexURL '{}': {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let token_value = HeaderValue::from_str(token)
            .map_err(|_| LangtagError::Configuration("token contains invalid characters".to_string()))?;
        headers.insert("x-plex-token", token_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| LangtagError::Catalog(format!("cannot build HTTP client: {}", e)))?;

        let catalog = Self {
            client,
            base_url: base,
        };

        let response = catalog.send(catalog.client.get(catalog.base_url.clone())).await?;
        debug!("Catalog identity check answered {}", response.status());
        info!("🔗 Connected to catalog at {}", catalog.base_url);
        Ok(catalog)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LangtagError::Catalog(format!("bad catalog path '{}': {}", path, e)))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| LangtagError::Catalog(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LangtagError::Catalog(
                "server rejected the token (401 Unauthorized)".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LangtagError::Catalog(format!("HTTP {}: {}", status, body)));
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(self.client.get(url.clone())).await?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| LangtagError::Catalog(format!("unexpected response from {}: {}", url, e)))?;
        Ok(envelope.media_container)
    }
}

/// `type=4&episode.audioLanguage!=<code>...`
fn episode_search_query(excluded_languages: &[String]) -> String {
    let mut query = format!("type={}", EPISODE_TYPE);
    for code in excluded_languages {
        query.push_str("&episode.audioLanguage!=");
        query.push_str(&urlencoding::encode(code));
    }
    query
}

#[async_trait]
impl MediaCatalog for PlexCatalog {
    async fn section(&self, name: &str) -> Result<LibrarySection> {
        let sections: SectionList = self.get_json(self.endpoint("library/sections")?).await?;
        sections
            .directories
            .into_iter()
            .find(|dir| dir.title == name)
            .map(|dir| LibrarySection {
                key: dir.key,
                title: dir.title,
            })
            .ok_or_else(|| LangtagError::Catalog(format!("library section '{}' not found", name)))
    }

    async fn search_episodes(
        &self,
        section: &LibrarySection,
        excluded_languages: &[String],
    ) -> Result<Vec<Episode>> {
        let mut url = self.endpoint(&format!("library/sections/{}/all", section.key))?;
        url.set_query(Some(&episode_search_query(excluded_languages)));

        let list: MetadataList = self.get_json(url).await?;
        info!(
            "📺 Found {} episodes in '{}' without an excluded audio language",
            list.metadata.len(),
            section.title
        );
        Ok(list.metadata.into_iter().map(Episode::from).collect())
    }

    async fn audio_streams(&self, episode: &Episode) -> Result<Vec<AudioStream>> {
        let url = self.endpoint(&format!("library/metadata/{}", episode.rating_key))?;
        let list: MetadataList = self.get_json(url).await?;

        let part = list
            .metadata
            .into_iter()
            .next()
            .and_then(|metadata| metadata.media.into_iter().next())
            .and_then(|media| media.parts.into_iter().next())
            .ok_or_else(|| {
                LangtagError::Catalog(format!("episode {} has no media part", episode.rating_key))
            })?;

        let part_file = part.file.map(PathBuf::from).ok_or_else(|| {
            LangtagError::Catalog(format!("episode {} has no file path", episode.rating_key))
        })?;

        Ok(part
            .streams
            .into_iter()
            .filter(|stream| stream.stream_type == Some(AUDIO_STREAM_TYPE))
            .enumerate()
            .map(|(index, stream)| AudioStream {
                index,
                language_code: stream.language_code,
                part_file: part_file.clone(),
            })
            .collect())
    }

    async fn analyze(&self, rating_key: &str) -> Result<()> {
        let url = self.endpoint(&format!("library/metadata/{}/analyze", rating_key))?;
        self.send(self.client.put(url)).await?;
        info!("🔄 Requested catalog analysis for item {}", rating_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_label() {
        let mut episode = Episode {
            rating_key: "12".to_string(),
            show_title: "Show".to_string(),
            title: "Pilot".to_string(),
            season_number: Some(1),
            episode_number: Some(2),
        };
        assert_eq!(episode.human_label(), "Show S01E02");

        episode.episode_number = None;
        assert_eq!(episode.human_label(), "Show - Pilot");

        episode.title.clear();
        assert_eq!(episode.human_label(), "Show [12]");
    }

    #[test]
    fn test_episode_search_query() {
        let query = episode_search_query(&["kor".to_string(), "en-US".to_string()]);
        assert_eq!(query, "type=4&episode.audioLanguage!=kor&episode.audioLanguage!=en-US");
    }

    #[test]
    fn test_metadata_parsing() {
        let body = r#"{
            "MediaContainer": {
                "size": 1,
                "Metadata": [{
                    "ratingKey": "321",
                    "title": "Pilot",
                    "grandparentTitle": "Show",
                    "parentIndex": 1,
                    "index": 1,
                    "Media": [{ "Part": [{ "id": 9, "file": "/tv/Show/S01E01.mkv",
                        "Stream": [
                            { "streamType": 1, "codec": "h264" },
                            { "streamType": 2, "languageCode": "eng" },
                            { "streamType": 2 }
                        ] }] }]
                }]
            }
        }"#;
        let envelope: Envelope<MetadataList> = serde_json::from_str(body).unwrap();
        let metadata = &envelope.media_container.metadata[0];
        assert_eq!(metadata.rating_key, "321");
        assert_eq!(metadata.media[0].parts[0].streams.len(), 3);
        assert_eq!(metadata.media[0].parts[0].streams[2].language_code, None);
    }
}
