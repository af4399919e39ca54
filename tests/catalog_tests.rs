use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, put};
use axum::{Json, Router};
use langtag_core::LangtagError;
use langtag_fixer::{MediaCatalog, PlexCatalog};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TOKEN: &str = "secret-token";

#[derive(Clone, Default)]
struct ServerState {
    analyzed: Arc<AtomicUsize>,
    last_query: Arc<Mutex<Option<String>>>,
}

async fn identity(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match headers.get("x-plex-token").and_then(|v| v.to_str().ok()) {
        Some(TOKEN) => (StatusCode::OK, Json(json!({"MediaContainer": {"size": 0}}))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({}))),
    }
}

async fn sections() -> Json<Value> {
    Json(json!({
        "MediaContainer": {
            "Directory": [
                {"key": "1", "title": "Movies", "type": "movie"},
                {"key": "2", "title": "TV Shows", "type": "show"}
            ]
        }
    }))
}

async fn section_all(
    State(state): State<ServerState>,
    Path(key): Path<String>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Json<Value>) {
    *state.last_query.lock().unwrap() = query;
    if key != "2" {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "MediaContainer": {
                "Metadata": [
                    {"ratingKey": "501", "title": "Pilot", "grandparentTitle": "Show",
                     "parentIndex": 1, "index": 1},
                    {"ratingKey": "502", "title": "Second", "grandparentTitle": "Show",
                     "parentIndex": 1, "index": 2}
                ]
            }
        })),
    )
}

async fn metadata(Path(key): Path<String>) -> (StatusCode, Json<Value>) {
    if key != "501" {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "MediaContainer": {
                "Metadata": [{
                    "ratingKey": "501",
                    "title": "Pilot",
                    "Media": [{"Part": [{"file": "/tv/Show/S01E01.mkv", "Stream": [
                        {"streamType": 1, "codec": "h264"},
                        {"streamType": 2, "languageCode": "eng"},
                        {"streamType": 3, "languageCode": "eng"},
                        {"streamType": 2}
                    ]}]}]
                }]
            }
        })),
    )
}

async fn analyze(State(state): State<ServerState>, Path(_key): Path<String>) -> StatusCode {
    state.analyzed.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn spawn(state: ServerState) -> String {
    let app = Router::new()
        .route("/", get(identity))
        .route("/library/sections", get(sections))
        .route("/library/sections/:key/all", get(section_all))
        .route("/library/metadata/:key", get(metadata))
        .route("/library/metadata/:key/analyze", put(analyze))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn connect(base: &str) -> PlexCatalog {
    PlexCatalog::connect(base, TOKEN, Duration::from_secs(5)).await.unwrap()
}

#[tokio::test]
async fn test_rejected_token_fails_connect() {
    let base = spawn(ServerState::default()).await;

    let err = PlexCatalog::connect(&base, "wrong", Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, LangtagError::Catalog(_)));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_section_lookup_by_title() {
    let base = spawn(ServerState::default()).await;
    let catalog = connect(&base).await;

    let section = catalog.section("TV Shows").await.unwrap();
    assert_eq!(section.key, "2");

    let err = catalog.section("Anime").await.unwrap_err();
    assert!(err.to_string().contains("Anime"));
}

#[tokio::test]
async fn test_search_excludes_languages() {
    let state = ServerState::default();
    let base = spawn(state.clone()).await;
    let catalog = connect(&base).await;
    let section = catalog.section("TV Shows").await.unwrap();

    let episodes = catalog
        .search_episodes(&section, &["kor".to_string(), "en".to_string()])
        .await
        .unwrap();

    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].human_label(), "Show S01E01");
    assert_eq!(episodes[1].rating_key, "502");

    let query = state.last_query.lock().unwrap().clone().unwrap();
    assert!(query.starts_with("type=4"));
    assert!(query.contains("episode.audioLanguage!=kor"));
    assert!(query.contains("episode.audioLanguage!=en"));
}

#[tokio::test]
async fn test_audio_streams_keep_audio_only_in_order() {
    let base = spawn(ServerState::default()).await;
    let catalog = connect(&base).await;
    let section = catalog.section("TV Shows").await.unwrap();
    let episodes = catalog.search_episodes(&section, &[]).await.unwrap();

    let streams = catalog.audio_streams(&episodes[0]).await.unwrap();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].index, 0);
    assert_eq!(streams[0].language_code.as_deref(), Some("eng"));
    assert_eq!(streams[1].index, 1);
    assert_eq!(streams[1].language_code, None);
    assert_eq!(streams[1].part_file, PathBuf::from("/tv/Show/S01E01.mkv"));

    // 502 has no metadata on the stub server
    assert!(catalog.audio_streams(&episodes[1]).await.is_err());
}

#[tokio::test]
async fn test_analyze_issues_put() {
    let state = ServerState::default();
    let base = spawn(state.clone()).await;
    let catalog = connect(&base).await;

    catalog.analyze("501").await.unwrap();

    assert_eq!(state.analyzed.load(Ordering::SeqCst), 1);
}
