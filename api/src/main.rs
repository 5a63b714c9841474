use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use quran_search::{
    match_spans, parse, Config, CorpusError, Match, QuranSearchError, Script, SearchEngine,
    TextPattern, Verse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

/// Widest context window a client may ask for.
const MAX_CONTEXT_RADIUS: u32 = 50;

struct AppState {
    search_engine: Arc<SearchEngine>,
    max_page_size: usize,
    context_radius: u32,
    vocabulary: Vec<(String, usize)>,
}

// === Request/Response types ===

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Deserialize)]
struct VerseQuery {
    chapter: u32,
    verse: u32,
}

#[derive(Deserialize)]
struct ContextQuery {
    chapter: u32,
    verse: u32,
    radius: Option<u32>,
}

#[derive(Deserialize)]
struct VocabularyQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    verses: usize,
    cached_queries: usize,
}

#[derive(Serialize)]
struct SearchResponse {
    query: quran_search::Query,
    total: usize,
    total_occurrences: u64,
    offset: usize,
    matches: Vec<MatchView>,
}

#[derive(Serialize)]
struct MatchView {
    chapter: u32,
    verse: u32,
    score: f32,
    matched_script: Script,
    occurrences: u32,
    text_uthmani: String,
    text_simplified: String,
    /// Byte ranges of `matched_script`'s text to highlight
    highlights: Vec<(usize, usize)>,
}

impl MatchView {
    fn new(m: &Match, pattern: Option<&TextPattern>) -> Self {
        let highlights = pattern
            .map(|p| {
                match_spans(m.verse.text(m.matched_script), p)
                    .into_iter()
                    .map(|r| (r.start, r.end))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            chapter: m.verse.chapter,
            verse: m.verse.verse,
            score: m.score,
            matched_script: m.matched_script,
            occurrences: m.occurrences,
            text_uthmani: m.verse.text_uthmani.clone(),
            text_simplified: m.verse.text_simplified.clone(),
            highlights,
        }
    }
}

#[derive(Serialize)]
struct ChapterInfo {
    chapter: u32,
    name: Option<String>,
    verse_count: u32,
}

#[derive(Serialize)]
struct WordCount {
    word: String,
    count: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn query_error(e: QuranSearchError) -> ApiError {
    match e {
        QuranSearchError::Corpus(CorpusError::VerseOutOfRange { .. }) => {
            api_error(StatusCode::NOT_FOUND, e)
        }
        e if e.is_validation() => api_error(StatusCode::BAD_REQUEST, e),
        e => {
            tracing::error!("Request failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        verses: state.search_engine.corpus().len(),
        cached_queries: state.search_engine.cache_stats().0,
    })
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limit = params.limit.unwrap_or(50).min(state.max_page_size);
    let offset = params.offset.unwrap_or(0);

    let query = parse(&params.q).map_err(|e| query_error(e.into()))?;
    let pattern = match &query {
        quran_search::Query::Text { raw } => TextPattern::parse(raw).ok(),
        _ => None,
    };

    // A text query scans the whole corpus.
    let engine = Arc::clone(&state.search_engine);
    let to_execute = query.clone();
    let results = tokio::task::spawn_blocking(move || engine.execute(&to_execute))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?
        .map_err(|e| query_error(e.into()))?;

    let matches = results
        .page(offset, limit)
        .iter()
        .map(|m| MatchView::new(m, pattern.as_ref()))
        .collect();

    Ok(Json(SearchResponse {
        query,
        total: results.len(),
        total_occurrences: results.total_occurrences(),
        offset,
        matches,
    }))
}

async fn chapters(State(state): State<Arc<AppState>>) -> Json<Vec<ChapterInfo>> {
    let corpus = state.search_engine.corpus();
    let chapters = (1..=corpus.chapter_count())
        .map(|chapter| ChapterInfo {
            chapter,
            name: corpus.chapter_name(chapter).map(str::to_string),
            verse_count: corpus.verse_count(chapter).unwrap_or(0),
        })
        .collect();
    Json(chapters)
}

async fn get_verse(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerseQuery>,
) -> Result<Json<Verse>, ApiError> {
    state
        .search_engine
        .corpus()
        .verse_at(params.chapter, params.verse)
        .map(|v| Json((**v).clone()))
        .map_err(|e| query_error(e.into()))
}

async fn get_context(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContextQuery>,
) -> Result<Json<Vec<Verse>>, ApiError> {
    let radius = params
        .radius
        .unwrap_or(state.context_radius)
        .min(MAX_CONTEXT_RADIUS);
    state
        .search_engine
        .corpus()
        .verses_around(params.chapter, params.verse, radius)
        .map(|verses| Json(verses.iter().map(|v| (**v).clone()).collect()))
        .map_err(|e| query_error(e.into()))
}

async fn vocabulary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VocabularyQuery>,
) -> Json<Vec<WordCount>> {
    let limit = params.limit.unwrap_or(100);
    Json(
        state
            .vocabulary
            .iter()
            .take(limit)
            .map(|(word, count)| WordCount {
                word: word.clone(),
                count: *count,
            })
            .collect(),
    )
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/chapters", get(chapters))
        .route("/verse", get(get_verse))
        .route("/context", get(get_context))
        .route("/vocabulary", get(vocabulary))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var_os("QURAN_SEARCH_CONFIG").map(std::path::PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let engine_settings = config.engine()?;
    let api_settings = config.api()?;

    let app_state = quran_search::AppState::new(engine_settings)?;
    let vocabulary = app_state.search_engine.corpus().vocabulary();

    let state = Arc::new(AppState {
        search_engine: Arc::clone(&app_state.search_engine),
        max_page_size: api_settings.max_page_size.max(1),
        context_radius: app_state.settings.context_radius,
        vocabulary,
    });

    let listener = tokio::net::TcpListener::bind(&api_settings.bind).await?;
    tracing::info!("Listening on http://{}", api_settings.bind);
    axum::serve(listener, router(state)).await?;

    Ok(())
}
