//! Document API endpoints
//!
//! - `GET  /:id/meta`             page count and page-1 dimensions
//! - `GET  /:id/page/:n?scale=`   rendered page image
//! - `GET  /:id/page/:n/text`     word overlay for one page
//! - `GET  /:id/search?q=`        full-text matches
//! - `GET|HEAD /:id/stream`       original bytes with range support

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::document::{DocumentMetadata, SearchHit, TextLayer, PAGE_IMAGE_CONTENT_TYPE};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Rendered pages never change once written
const PAGE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

const DEFAULT_SCALE: f32 = 1.0;

/// Query parameters for page rendering
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Zoom factor; parsed by hand so bad values become a JSON 400
    pub scale: Option<String>,
}

/// Query parameters for search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/meta", get(get_metadata))
        .route("/:id/page/:page", get(get_page_image))
        .route("/:id/page/:page/text", get(get_page_text))
        .route("/:id/search", get(search_document))
        // axum answers HEAD through the GET handler; the method is passed on
        .route("/:id/stream", get(stream_document))
}

fn parse_page(raw: &str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(AppError::BadRequest(format!(
            "Invalid page number '{}': pages start at 1",
            raw
        ))),
    }
}

fn parse_scale(raw: Option<&str>) -> Result<f32> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_SCALE);
    };
    match raw.trim().parse::<f32>() {
        Ok(scale) if scale.is_finite() => Ok(scale),
        _ => Err(AppError::BadRequest(format!("Invalid scale '{}'", raw))),
    }
}

async fn get_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentMetadata>> {
    let meta = state.documents().metadata(&id).await?;
    Ok(Json(meta))
}

async fn get_page_image(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Response> {
    let page = parse_page(&page)?;
    let scale = parse_scale(query.scale.as_deref())?;

    let path = state.documents().page_image(&id, page, scale).await?;
    let data = tokio::fs::read(&path).await.map_err(|e| {
        AppError::Internal(format!("Failed to read render {}: {}", path.display(), e))
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PAGE_IMAGE_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, PAGE_CACHE_CONTROL)
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

async fn get_page_text(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, String)>,
) -> Result<Json<TextLayer>> {
    let page = parse_page(&page)?;
    let layer = state.documents().page_text(&id, page).await?;
    Ok(Json(layer))
}

async fn search_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>> {
    let q = query
        .q
        .ok_or_else(|| AppError::BadRequest("Missing query parameter 'q'".to_string()))?;
    let hits = state.documents().search(&id, &q).await?;
    Ok(Json(hits))
}

async fn stream_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response> {
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());
    let response = state.documents().stream(&id, &method, range).await?;
    Ok(response)
}
