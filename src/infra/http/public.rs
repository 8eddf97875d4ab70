use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::CACHE_CONTROL},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};

use crate::application::{
    collections::{CollectionPageService, collection_path},
    partials::{COMPONENT_PARAM, FragmentRequest, PartialResolver},
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub resolver: PartialResolver,
    pub collections: Arc<CollectionPageService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/partials", get(partials))
        .route("/_collections", get(collections_index))
        .route("/_collections/{*path}", get(collection_page))
        .route("/_health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn partials(
    State(state): State<HttpState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let (component, params): (Vec<_>, Vec<_>) = params
        .into_iter()
        .partition(|(key, _)| key == COMPONENT_PARAM);
    let component = component
        .into_iter()
        .last()
        .map(|(_, value)| value)
        .unwrap_or_default();

    let produced = match state
        .resolver
        .resolve(&component, FragmentRequest::from_query(params))
        .await
    {
        Ok(produced) => produced,
        Err(err) => return err.into_response(),
    };

    let mut headers = HeaderMap::new();
    if let Some(cache_control) = produced.cache_control {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));
    }
    (headers, Json(produced.payload)).into_response()
}

async fn collections_index(State(state): State<HttpState>) -> Response {
    render_collection(&state, collection_path(None)).await
}

async fn collection_page(State(state): State<HttpState>, Path(rest): Path<String>) -> Response {
    render_collection(&state, collection_path(Some(&rest))).await
}

async fn render_collection(state: &HttpState, path: String) -> Response {
    let ttl = state.collections.default_ttl();
    match state.collections.get_cached_page(&path, ttl).await {
        Ok(markup) => Html(markup).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
