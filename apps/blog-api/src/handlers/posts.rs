//! Public post endpoints.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use super::presenter::{Projection, paginate, present, present_all};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const ERROR_LIST: &str = "Failed to retrieve posts";
const ERROR_SHOW: &str = "Failed to retrieve post";
const ERROR_FEATURED: &str = "Failed to retrieve featured posts";
const ERROR_LATEST: &str = "Failed to retrieve latest posts";
const ERROR_SEARCH: &str = "Failed to search posts";

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// GET /api/v1/posts
pub async fn index(state: web::Data<AppState>, query: web::Query<PageQuery>) -> AppResult<HttpResponse> {
    let page = state
        .posts
        .list_public(query.page.unwrap_or(1))
        .await
        .map_err(|e| AppError::operation(ERROR_LIST, e, &serde_json::json!({ "page": query.page }), None))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "posts": paginate(&state.posts, page, Projection::Full),
    })))
}

/// GET /api/v1/posts/{slug}
pub async fn show(state: web::Data<AppState>, slug: web::Path<String>) -> AppResult<HttpResponse> {
    let details = state
        .posts
        .show_public(&slug)
        .await
        .map_err(|e| AppError::operation(ERROR_SHOW, e, &serde_json::json!({ "slug": slug.as_str() }), None))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "post": present(&state.posts, details, Projection::Full),
    })))
}

/// GET /api/v1/posts/featureds
pub async fn featured(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state
        .posts
        .featured()
        .await
        .map_err(|e| AppError::operation(ERROR_FEATURED, e, &serde_json::Value::Null, None))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "featureds": present_all(&state.posts, posts, Projection::Card),
    })))
}

/// GET /api/v1/posts/latest
pub async fn latest(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state
        .posts
        .latest()
        .await
        .map_err(|e| AppError::operation(ERROR_LATEST, e, &serde_json::Value::Null, None))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "latest": present_all(&state.posts, posts, Projection::Teaser),
    })))
}

/// GET /api/v1/posts/search?query=
pub async fn search(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
    let term = query.query.as_deref().unwrap_or_default();
    let posts = state
        .posts
        .search(term)
        .await
        .map_err(|e| AppError::operation(ERROR_SEARCH, e, &serde_json::json!({ "query": term }), None))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "results": present_all(&state.posts, posts, Projection::Card),
    })))
}
