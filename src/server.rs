//! Read-only JSON API over the synchronized data.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Health check (returns version) |
//! | `GET` | `/openstreetmap_elements` | Map elements |
//! | `GET` | `/wikidata_entries` | Knowledge-graph entries |
//! | `GET` | `/wikidata_entries/{id}` | One entry with labels, pages and occupations |
//! | `GET` | `/commons_categories` | Media categories |
//! | `GET` | `/commons_categories/{title}` | One media category |
//! | `GET` | `/commons_files` | Media files |
//! | `GET` | `/wikipedia_pages` | Encyclopedia pages |
//! | `GET` | `/occupations` | Occupations |
//! | `GET` | `/synchronizations` | Last outcome of every sync |
//!
//! List endpoints accept `page` (1-based), `page_size` (default 25, at most
//! 100) and `modified_since` (`YYYY-MM-DD`), and answer with a page
//! envelope:
//!
//! ```json
//! { "current_page": 2, "number_of_pages": 3, "number_of_results": 61,
//!   "number_of_results_on_page": 25, "previous_page": 1, "next_page": 3,
//!   "results": [ ... ] }
//! ```
//!
//! A `page` that is not a number falls back to the first page; a page past
//! the end falls back to the last one.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no wikidata entry Q1" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use lachaise_sync_core::fields::Record;
use lachaise_sync_core::models::{
    CommonsCategory, CommonsFile, OpenStreetMapElement, Synchronization, WikidataEntry,
    WikidataLocalizedEntry, WikidataOccupation, WikipediaPage,
};
use lachaise_sync_core::store::{Store, Table};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

const DEFAULT_PAGE_SIZE: usize = 25;
const MAX_PAGE_SIZE: usize = 100;

struct AppState<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

/// Serve the configured database on `[server].bind` until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let app = router(Arc::new(SqliteStore::new(pool)));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "listening");
    println!("API listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the API router over any store.
pub fn router<S: Store + 'static>(store: Arc<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/openstreetmap_elements",
            get(handle_list::<S, OpenStreetMapElement>),
        )
        .route("/wikidata_entries", get(handle_list::<S, WikidataEntry>))
        .route("/wikidata_entries/{id}", get(handle_entry::<S>))
        .route("/commons_categories", get(handle_list::<S, CommonsCategory>))
        .route("/commons_categories/{title}", get(handle_category::<S>))
        .route("/commons_files", get(handle_list::<S, CommonsFile>))
        .route("/wikipedia_pages", get(handle_list::<S, WikipediaPage>))
        .route("/occupations", get(handle_list::<S, WikidataOccupation>))
        .route("/synchronizations", get(handle_synchronizations::<S>))
        .layer(cors)
        .with_state(AppState { store })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: format!("{err:#}"),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

// ============ Pagination ============

#[derive(Deserialize, Default)]
struct ListQuery {
    page: Option<String>,
    page_size: Option<String>,
    modified_since: Option<String>,
}

impl ListQuery {
    fn page_size(&self) -> Result<usize, AppError> {
        match &self.page_size {
            None => Ok(DEFAULT_PAGE_SIZE),
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => Ok(n),
                _ => Err(bad_request(format!(
                    "page_size must be between 1 and {MAX_PAGE_SIZE}"
                ))),
            },
        }
    }

    /// Unix timestamp of midnight UTC of `modified_since`.
    fn modified_since(&self) -> Result<Option<i64>, AppError> {
        let Some(raw) = &self.modified_since else {
            return Ok(None);
        };
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| bad_request("invalid parameter: modified_since"))?;
        Ok(date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp()))
    }
}

#[derive(Serialize)]
struct Page<T> {
    current_page: usize,
    number_of_pages: usize,
    number_of_results: usize,
    number_of_results_on_page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page: Option<usize>,
    results: Vec<T>,
}

fn paginate<T>(items: Vec<T>, requested: Option<&str>, page_size: usize) -> Page<T> {
    let number_of_results = items.len();
    let number_of_pages = number_of_results.div_ceil(page_size).max(1);
    let current_page = requested
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, number_of_pages);

    let results: Vec<T> = items
        .into_iter()
        .skip((current_page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        current_page,
        number_of_pages,
        number_of_results,
        number_of_results_on_page: results.len(),
        previous_page: (current_page > 1).then(|| current_page - 1),
        next_page: (current_page < number_of_pages).then(|| current_page + 1),
        results,
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_list<S, R>(
    State(state): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<R>>, AppError>
where
    S: Store + Table<R> + 'static,
    R: Record + Serialize,
{
    let page_size = query.page_size()?;
    let modified_since = query.modified_since()?;

    let mut records = Table::<R>::all(state.store.as_ref()).await?;
    if let Some(since) = modified_since {
        records.retain(|r| r.modified_at() > since);
    }
    Ok(Json(paginate(records, query.page.as_deref(), page_size)))
}

#[derive(Serialize)]
struct EntryDetail {
    #[serde(flatten)]
    entry: WikidataEntry,
    localizations: Vec<WikidataLocalizedEntry>,
    wikipedia_pages: Vec<WikipediaPage>,
    occupations: Vec<WikidataOccupation>,
}

async fn handle_entry<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<EntryDetail>, AppError> {
    let store = state.store.as_ref();
    let entry = Table::<WikidataEntry>::get(store, &id)
        .await?
        .ok_or_else(|| not_found(format!("no wikidata entry {id}")))?;

    let localizations: Vec<WikidataLocalizedEntry> = Table::<WikidataLocalizedEntry>::all(store)
        .await?
        .into_iter()
        .filter(|l| l.wikidata_id == id)
        .collect();
    let wikipedia_pages: Vec<WikipediaPage> = Table::<WikipediaPage>::all(store)
        .await?
        .into_iter()
        .filter(|p| p.wikidata_id == id)
        .collect();

    let mut occupations = Vec::new();
    for (entry_id, occupation_id) in store.occupation_links().await? {
        if entry_id != id {
            continue;
        }
        if let Some(occupation) = Table::<WikidataOccupation>::get(store, &occupation_id).await? {
            occupations.push(occupation);
        }
    }

    Ok(Json(EntryDetail {
        entry,
        localizations,
        wikipedia_pages,
        occupations,
    }))
}

async fn handle_category<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Path(title): Path<String>,
) -> Result<Json<CommonsCategory>, AppError> {
    Table::<CommonsCategory>::get(state.store.as_ref(), &title)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("no commons category {title}")))
}

async fn handle_synchronizations<S: Store + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Synchronization>>, AppError> {
    Ok(Json(state.store.synchronizations().await?))
}
