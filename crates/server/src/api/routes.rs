use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{handlers, items, references};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config().server.max_upload_bytes;

    // Reads are public
    let public_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Reference entities
        .route("/directions", get(references::list_directions))
        .route("/authors", get(references::list_authors))
        .route("/tags", get(references::list_tags))
        // Items
        .route("/{collection}", get(items::list_items))
        .route("/{collection}/{id}", get(items::get_item))
        .route("/{collection}/{id}/download", get(items::download_item))
        .route("/{collection}/{id}/image", get(items::get_image));

    // Mutations go through the authenticator
    let protected_routes = Router::new()
        .route("/directions", post(references::create_direction))
        .route("/authors", post(references::create_author))
        .route("/tags", post(references::create_tag))
        .route(
            "/{collection}",
            post(items::create_item).put(items::update_item),
        )
        .route("/{collection}/rate", patch(items::rate_item))
        .route("/{collection}/{id}", axum::routing::delete(items::delete_item))
        .route("/{collection}/{id}/file", put(items::replace_file))
        .route("/{collection}/{id}/image", put(items::replace_image))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes).with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
