//! Route handlers.
//!
//! Each handler extracts its parameters, runs one operation through the
//! request's [`RequestScope`] and serializes the result as JSON.

use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thrones_core::{House, InternalId, NewCharacter, Person, Region};
use thrones_executor::RequestScope;
use thrones_storage::MissingParamPolicy;

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Parameters
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CharacterParams {
    pub name: Option<String>,
    #[serde(rename = "playedBy")]
    pub played_by: Option<String>,
    pub culture: Option<String>,
    #[serde(rename = "isFemale")]
    pub is_female: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelParams {
    pub houseid: Option<String>,
    pub characterid: Option<String>,
}

/// JSON shape a route answers with when a parameter is missing under the
/// `empty` policy.
#[derive(Debug, Clone, Copy)]
enum EmptyShape {
    Array,
    Text,
}

fn missing(policy: MissingParamPolicy, name: &'static str, shape: EmptyShape) -> ApiResult<Response> {
    match policy {
        MissingParamPolicy::Reject => Err(ApiError::MissingParameter(name)),
        MissingParamPolicy::Empty => {
            tracing::debug!(parameter = name, "Missing parameter answered with empty result");
            Ok(match shape {
                EmptyShape::Array => Json(json!([])).into_response(),
                EmptyShape::Text => Json(json!("")).into_response(),
            })
        }
    }
}

fn parse_int(name: &'static str, raw: &str) -> ApiResult<i64> {
    raw.trim().parse().map_err(|_| ApiError::InvalidParameter {
        name,
        value: raw.to_string(),
    })
}

// =============================================================================
// Static pages
// =============================================================================

pub async fn index_page() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

pub async fn characters_page() -> Html<&'static str> {
    Html(include_str!("../static/characters.html"))
}

pub async fn stats_page() -> Html<&'static str> {
    Html(include_str!("../static/stats.html"))
}

// =============================================================================
// Houses
// =============================================================================

/// `GET /list`
pub async fn list_houses(Extension(scope): Extension<RequestScope>) -> ApiResult<Json<Vec<House>>> {
    Ok(Json(scope.lock().await.top_houses().await?))
}

/// `GET /allies/{house_id}`
pub async fn ally_count(
    Extension(scope): Extension<RequestScope>,
    Path(house_id): Path<String>,
) -> ApiResult<Json<i64>> {
    let house_id = parse_int("house_id", &house_id)?;
    Ok(Json(scope.lock().await.ally_count(house_id).await?))
}

/// `GET /foundedBy/{house_id}`
pub async fn founded_by(
    Extension(scope): Extension<RequestScope>,
    Path(house_id): Path<String>,
) -> ApiResult<Json<String>> {
    let house_id = parse_int("house_id", &house_id)?;
    Ok(Json(scope.lock().await.founder_name(house_id).await?))
}

/// `GET /searchHouse?q=`
pub async fn search_house(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<RequestScope>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    let Some(term) = params.q else {
        return missing(state.missing_params, "q", EmptyShape::Array);
    };
    let houses = scope.lock().await.search_houses(&term).await?;
    Ok(Json(houses).into_response())
}

// =============================================================================
// Characters
// =============================================================================

/// `GET /searchCharacter?q=`
pub async fn search_character(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<RequestScope>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    let Some(term) = params.q else {
        return missing(state.missing_params, "q", EmptyShape::Array);
    };
    let persons: Vec<(Person, InternalId)> = scope.lock().await.search_characters(&term).await?;
    Ok(Json(persons).into_response())
}

/// `GET /createCharacter?name=&playedBy=&culture=&isFemale=`
pub async fn create_character(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<RequestScope>,
    Query(params): Query<CharacterParams>,
) -> ApiResult<Response> {
    let Some(name) = params.name else {
        return missing(state.missing_params, "name", EmptyShape::Text);
    };
    let Some(played_by) = params.played_by else {
        return missing(state.missing_params, "playedBy", EmptyShape::Text);
    };
    let Some(culture) = params.culture else {
        return missing(state.missing_params, "culture", EmptyShape::Text);
    };

    let character = NewCharacter {
        name,
        is_female: NewCharacter::parse_is_female(params.is_female.as_deref()),
        played_by,
        culture,
    };
    let created = scope.lock().await.create_character(character).await?;
    tracing::info!(internal_id = created.1.as_i64(), "Character created");
    Ok(Json(created).into_response())
}

/// `GET /createRel?houseid=&characterid=`
pub async fn create_rel(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<RequestScope>,
    Query(params): Query<RelParams>,
) -> ApiResult<Response> {
    let Some(house_id) = params.houseid else {
        return missing(state.missing_params, "houseid", EmptyShape::Text);
    };
    let Some(character_id) = params.characterid else {
        return missing(state.missing_params, "characterid", EmptyShape::Text);
    };
    let house_id = parse_int("houseid", &house_id)?;
    let character = InternalId(parse_int("characterid", &character_id)?);

    let created = scope.lock().await.create_alliance(house_id, character).await?;
    tracing::info!(house_id, character = character.as_i64(), created, "Alliance requested");
    Ok(Json(created).into_response())
}

// =============================================================================
// Regions
// =============================================================================

/// `GET /searchRegion?q=<region internal id>`
pub async fn search_region(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<RequestScope>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    let Some(region) = params.q else {
        return missing(state.missing_params, "q", EmptyShape::Array);
    };
    let region = InternalId(parse_int("q", &region)?);
    let seats = scope.lock().await.region_seat_count(region).await?;
    Ok(Json(seats).into_response())
}

/// `GET /regions`
pub async fn regions(Extension(scope): Extension<RequestScope>) -> ApiResult<Json<Vec<(Region, InternalId)>>> {
    Ok(Json(scope.lock().await.regions().await?))
}

// =============================================================================
// Health & Metrics
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs a trivial query through the normal pipeline.
pub async fn health(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<RequestScope>,
) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.provider.backend_kind();
    match scope.lock().await.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                backend,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    backend,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Exports metrics in Prometheus text format for scraping.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, (StatusCode, String)> {
    state.metrics.export().map_err(|e| {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to export metrics: {}", e))
    })
}
