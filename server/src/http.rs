//! Thin `axum` routing over [`typed_kv_core::kv::KVStore`]. The HTTP layer
//! is deliberately minimal: it validates `type`/`key` path segments, clamps
//! `limit`, maps `Error` to a status code, and gets out of the way.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use typed_kv_core::error::Error;
use typed_kv_core::kv::KVStore;

use crate::config::ConfigLoad;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct AppState {
    store: KVStore,
    config: Arc<ConfigLoad>,
}

/// Builds the full router: routes, auth, CORS, request-id, and tracing
/// layers, in that order from innermost to outermost.
pub fn app(store: KVStore, config: Arc<ConfigLoad>) -> Router {
    let state = AppState { store, config: config.clone() };

    let router = Router::new()
        .route("/v1/status", get(status))
        .route("/v1/:type/:key", put(put_value).get(get_value).head(head_value).delete(delete_value))
        .route("/v1/:type", get(list_keys))
        .with_state(state);

    let header_name = axum::http::HeaderName::from_static(REQUEST_ID_HEADER);

    // Layers wrap outside-in in the order they're added: the request-id is
    // stamped before anything else sees it, propagated back onto the
    // response after everything else has run, with auth closest to the
    // route handlers it guards.
    router
        .layer(SetRequestIdLayer::new(header_name.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(header_name))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn_with_state(config, bearer_auth))
}

/// Single shared-secret comparison against `Authorization: Bearer <token>`.
/// A full auth subsystem is out of scope; this documents the seam.
async fn bearer_auth(
    State(config): State<Arc<ConfigLoad>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let Some(expected) = config.bearer_token.as_deref() else {
        return next.run(request).await;
    };

    let provided = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => next.run(request).await,
        _ => ApiError::from(Error::InvalidArgument("missing or invalid bearer token".to_string()))
            .into_response_with_status(StatusCode::UNAUTHORIZED),
    }
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError { error: err.to_string() }
    }
}

impl ApiError {
    fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: Error) -> Response {
    let status = status_for(&err);
    ApiError::from(err).into_response_with_status(status)
}

/// Rejects path segments carrying `/`, newlines, or control bytes, per the
/// collaborator contract §6 pins on `type`/`key`.
fn validate_segment(segment: &str) -> Result<(), Error> {
    if segment.is_empty() || segment.bytes().any(|b| b <= 0x1F || b == 0x7F || b == b'/') {
        return Err(Error::InvalidArgument(format!("invalid path segment: {segment:?}")));
    }
    Ok(())
}

async fn put_value(
    State(state): State<AppState>,
    Path((type_, key)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> Response {
    if let Err(err) = validate_segment(&type_).and_then(|_| validate_segment(&key)) {
        return error_response(err);
    }
    if body.len() > state.config.max_body_bytes {
        return error_response(Error::InvalidArgument("body exceeds max_body_bytes".to_string()));
    }

    match state.store.put(type_, key, body.to_vec()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_value(State(state): State<AppState>, Path((type_, key)): Path<(String, String)>) -> Response {
    if let Err(err) = validate_segment(&type_).and_then(|_| validate_segment(&key)) {
        return error_response(err);
    }

    match state.store.get(type_, key).await {
        Ok(Some(value)) => (StatusCode::OK, value).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => error_response(err),
    }
}

async fn head_value(State(state): State<AppState>, Path((type_, key)): Path<(String, String)>) -> Response {
    if let Err(err) = validate_segment(&type_).and_then(|_| validate_segment(&key)) {
        return error_response(err);
    }

    match state.store.exists(type_, key).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_value(State(state): State<AppState>, Path((type_, key)): Path<(String, String)>) -> Response {
    if let Err(err) = validate_segment(&type_).and_then(|_| validate_segment(&key)) {
        return error_response(err);
    }

    match state.store.delete(type_, key).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    prefix: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    keys: Vec<String>,
}

async fn list_keys(
    State(state): State<AppState>,
    Path(type_): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    if let Err(err) = validate_segment(&type_) {
        return error_response(err);
    }

    let limit = query.limit.unwrap_or(state.config.default_list_limit).clamp(0, state.config.max_list_limit);

    match state.store.list(type_, query.prefix, limit).await {
        Ok(keys) => Json(ListResponse { keys }).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    keys: i64,
    active_log_bytes: Option<u64>,
}

async fn status(State(state): State<AppState>) -> Response {
    match state.store.status().await {
        Ok(status) => {
            Json(StatusResponse { keys: status.keys, active_log_bytes: status.active_log_bytes }).into_response()
        }
        Err(err) => error_response(err),
    }
}

