//! Record routes, one set per registered resource.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::handlers::{
    find_domain, handle_count, handle_create, handle_destroy, handle_fetch, handle_query,
    handle_update, CountResponse, FetchParams, QueryRequest,
};
use crate::AppState;

/// Create record routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{resource}", post(create_handler))
        .route("/{resource}/query", post(query_handler))
        .route("/{resource}/count", post(count_handler))
        .route(
            "/{resource}/{id}",
            get(fetch_handler).put(update_handler).delete(destroy_handler),
        )
}

/// POST /{resource} - Create a record.
async fn create_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let domain = find_domain(&state.registry, &resource)?;
    let response = handle_create(&state.syncer, &domain, &body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /{resource}/{id} - Fetch a record.
async fn fetch_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Query(params): Query<FetchParams>,
) -> Result<Json<serde_json::Value>> {
    let domain = find_domain(&state.registry, &resource)?;
    let response = handle_fetch(&state.syncer, &domain, &id, &params).await?;
    Ok(Json(response))
}

/// PUT /{resource}/{id} - Update a record.
async fn update_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>> {
    let domain = find_domain(&state.registry, &resource)?;
    let response = handle_update(&state.syncer, &domain, &id, &body).await?;
    Ok(Json(response))
}

/// DELETE /{resource}/{id} - Delete a record.
async fn destroy_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let domain = find_domain(&state.registry, &resource)?;
    handle_destroy(&state.syncer, &domain, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /{resource}/query - Query records.
async fn query_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<serde_json::Value>> {
    let domain = find_domain(&state.registry, &resource)?;
    let response = handle_query(&state.syncer, &domain, &request).await?;
    Ok(Json(response))
}

/// POST /{resource}/count - Count matching records.
async fn count_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<CountResponse>> {
    let domain = find_domain(&state.registry, &resource)?;
    let response = handle_count(&state.syncer, &domain, &request).await?;
    Ok(Json(response))
}
