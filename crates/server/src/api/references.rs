//! Direction, author and tag handlers.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use libris_core::{validation::rules, Author, Direction, Tag};

use super::error::{ApiError, InfoResponse};
use crate::state::AppState;

const NAME_MAX: usize = 255;

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthorRequest {
    pub full_name: String,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}

fn created(kind: &str, id: i64) -> (StatusCode, Json<InfoResponse>) {
    (
        StatusCode::CREATED,
        InfoResponse::new(format!("{} created successfully. id: {}", kind, id)),
    )
}

/// GET /api/v1/directions
pub async fn list_directions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Direction>>, ApiError> {
    Ok(Json(state.references().list_directions()?))
}

/// POST /api/v1/directions
pub async fn create_direction(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<InfoResponse>), ApiError> {
    let request: NameRequest = parse_body(&body)?;
    let name = request.name.trim();
    rules::text("name", name, 1, NAME_MAX)?;

    let direction = state.references().create_direction(name)?;
    Ok(created("Direction", direction.id))
}

/// GET /api/v1/authors
pub async fn list_authors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.references().list_authors()?))
}

/// POST /api/v1/authors
pub async fn create_author(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<InfoResponse>), ApiError> {
    let request: AuthorRequest = parse_body(&body)?;
    let full_name = request.full_name.trim();
    rules::text("full_name", full_name, 1, NAME_MAX)?;

    let author = state.references().create_author(full_name)?;
    Ok(created("Author", author.id))
}

/// GET /api/v1/tags
pub async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.references().list_tags()?))
}

/// POST /api/v1/tags
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<InfoResponse>), ApiError> {
    let request: NameRequest = parse_body(&body)?;
    let name = request.name.trim();
    rules::text("name", name, 1, NAME_MAX)?;

    let tag = state.references().create_tag(name)?;
    Ok(created("Tag", tag.id))
}
