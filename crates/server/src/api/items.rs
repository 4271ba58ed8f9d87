//! Catalog item handlers, shared by every content-type collection.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use libris_core::{
    validation::rules, CatalogItem, ContentType, FieldError, FileUpload, MetadataUpdate,
    NewItemBuilder, RawListParams,
};

use super::error::{ApiError, InfoResponse};
use crate::state::AppState;

/// Response header carrying the page count of a list request.
pub const PAGES_HEADER: HeaderName = HeaderName::from_static("pages");

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReplaceFileParams {
    #[serde(default)]
    pub old_name: Option<String>,
    #[serde(default)]
    pub new_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateParams {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    #[serde(rename = "infoMsg")]
    pub info_msg: String,
    pub rating: f64,
}

// ============================================================================
// Helpers
// ============================================================================

fn content_type(collection: &str) -> Result<ContentType, ApiError> {
    collection
        .parse()
        .map_err(|_| ApiError::not_found(format!("Unknown collection: {}", collection)))
}

fn item_id(raw: &str) -> Result<i64, ApiError> {
    Ok(rules::parse_id("id", raw)?)
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), e.body_text())
}

fn info(content_type: ContentType, action: &str, id: i64) -> Json<InfoResponse> {
    InfoResponse::new(format!(
        "{} {} successfully. id: {}",
        content_type.display_name(),
        action,
        id
    ))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/{type}
///
/// List items with optional `sort_by`, `sort_order`, `filter`, `limit` and
/// `page`. The page count is returned in the `pages` header.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Query(params): Query<RawListParams>,
) -> Result<Response, ApiError> {
    let content_type = content_type(&collection)?;
    let descriptor = state.translator().translate(&params);

    let page = state
        .service(content_type)
        .get_all(&state.request_token(), &descriptor)
        .await?;

    Ok((
        [(PAGES_HEADER, HeaderValue::from(page.total_pages))],
        Json(page.items),
    )
        .into_response())
}

/// POST /api/v1/{type}
///
/// Create an item from a multipart form. Text parts carry the metadata; the
/// optional `file` and `image` parts carry the assets.
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<InfoResponse>), ApiError> {
    let content_type = content_type(&collection)?;

    let mut builder = NewItemBuilder::new(content_type);
    let mut file: Option<FileUpload> = None;
    let mut image: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part when no file was chosen
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                if filename.is_empty() {
                    return Err(FieldError::missing("file name").into());
                }
                file = Some(FileUpload::new(filename, bytes.to_vec()));
            }
            "image" => {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !bytes.is_empty() {
                    image = Some(bytes.to_vec());
                }
            }
            _ => {
                let text = field.text().await.map_err(multipart_error)?;
                builder.field(&name, text);
            }
        }
    }

    let item = builder.build()?;
    let id = state
        .service(content_type)
        .create(&state.request_token(), item, file, image)
        .await?;

    Ok((StatusCode::CREATED, info(content_type, "created", id)))
}

/// PUT /api/v1/{type}
///
/// Partial metadata update. The JSON body must carry `id`; asset pointer
/// fields and other unknown fields are ignored.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    body: Bytes,
) -> Result<Json<InfoResponse>, ApiError> {
    let content_type = content_type(&collection)?;
    let update: MetadataUpdate = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
    let id = update.id;

    state
        .service(content_type)
        .update(&state.request_token(), update)
        .await?;

    Ok(info(content_type, "updated", id))
}

/// GET /api/v1/{type}/{id}
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<CatalogItem>, ApiError> {
    let content_type = content_type(&collection)?;
    let id = item_id(&id)?;

    let item = state
        .service(content_type)
        .get_by_id(&state.request_token(), id)
        .await?;
    Ok(Json(item))
}

/// DELETE /api/v1/{type}/{id}
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<InfoResponse>, ApiError> {
    let content_type = content_type(&collection)?;
    let id = item_id(&id)?;

    state
        .service(content_type)
        .delete(&state.request_token(), id)
        .await?;
    Ok(info(content_type, "deleted", id))
}

/// PUT /api/v1/{type}/{id}/file?old_name=&new_name=
///
/// Replace the primary file with the raw request body.
pub async fn replace_file(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    Query(params): Query<ReplaceFileParams>,
    body: Bytes,
) -> Result<Json<InfoResponse>, ApiError> {
    let content_type = content_type(&collection)?;
    let id = item_id(&id)?;
    let new_name = params
        .new_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| FieldError::missing("new_name"))?;
    let old_name = params.old_name.unwrap_or_default();

    state
        .service(content_type)
        .replace_file(&state.request_token(), id, &old_name, &new_name, &body)
        .await?;
    Ok(info(content_type, "file replaced", id))
}

/// PUT /api/v1/{type}/{id}/image
///
/// Replace the cover image with the raw request body.
pub async fn replace_image(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<InfoResponse>, ApiError> {
    let content_type = content_type(&collection)?;
    let id = item_id(&id)?;
    if body.is_empty() {
        return Err(FieldError::missing("image").into());
    }

    state
        .service(content_type)
        .replace_image(&state.request_token(), id, &body)
        .await?;
    Ok(info(content_type, "image replaced", id))
}

/// PATCH /api/v1/{type}/rate?id=&rating=
pub async fn rate_item(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Query(params): Query<RateParams>,
) -> Result<Json<RateResponse>, ApiError> {
    let content_type = content_type(&collection)?;
    let id = item_id(params.id.as_deref().unwrap_or(""))?;
    let rating: f64 = params
        .rating
        .as_deref()
        .ok_or_else(|| FieldError::missing("rating"))?
        .trim()
        .parse()
        .map_err(|_| FieldError::invalid("rating", "must be a number"))?;

    let average = state
        .service(content_type)
        .rate(&state.request_token(), id, rating)
        .await?;

    Ok(Json(RateResponse {
        info_msg: format!(
            "{} rated successfully. id: {}",
            content_type.display_name(),
            id
        ),
        rating: average,
    }))
}

/// GET /api/v1/{type}/{id}/download
///
/// Stream the primary file and count the download.
pub async fn download_item(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let content_type = content_type(&collection)?;
    let id = item_id(&id)?;

    let (filename, bytes) = state
        .service(content_type)
        .download(&state.request_token(), id)
        .await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        filename.replace('"', "\\\"")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/v1/{type}/{id}/image
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let content_type = content_type(&collection)?;
    let id = item_id(&id)?;

    let bytes = state
        .service(content_type)
        .image(&state.request_token(), id)
        .await?;

    Ok(([(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"))], bytes).into_response())
}
