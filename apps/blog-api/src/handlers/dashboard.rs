//! Dashboard post endpoints. Every route requires a bearer token; the post
//! policy decides the rest.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use blog_core::domain::{PostQuery, PublishState, SortOrder};
use blog_shared::MessageResponse;

use super::form::PostForm;
use super::presenter::{Projection, paginate, present, tag};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const ERROR_LIST: &str = "Failed to retrieve posts";
const ERROR_SHOW: &str = "Failed to retrieve post";
const ERROR_CREATE: &str = "Failed to create post";
const ERROR_UPDATE: &str = "Failed to update post";
const ERROR_DELETE: &str = "Failed to delete post";
const ERROR_RESTORE: &str = "Failed to restore post";
const ERROR_FORCE_DELETE: &str = "Failed to permanently delete post";
const ERROR_TAGS: &str = "Failed to retrieve tags";

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub page: Option<u64>,
    #[serde(rename = "filter[publish]")]
    pub publish: Option<String>,
    pub sort: Option<String>,
}

impl AdminListQuery {
    fn to_query(&self) -> Result<PostQuery, AppError> {
        let publish = self
            .publish
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse::<PublishState>().map_err(|_| {
                    AppError::Validation(format!("Requested filter publish `{p}` is not allowed."))
                })
            })
            .transpose()?;
        let sort = SortOrder::from_param(self.sort.as_deref()).ok_or_else(|| {
            AppError::Validation(format!(
                "Requested sort `{}` is not allowed.",
                self.sort.as_deref().unwrap_or_default()
            ))
        })?;

        Ok(PostQuery::admin(self.page.unwrap_or(1), publish, sort))
    }
}

/// GET /api/v1/dashboard/posts
pub async fn index(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<AdminListQuery>,
) -> AppResult<HttpResponse> {
    let post_query = query.to_query()?;
    let page = state
        .posts
        .list_admin(&identity.actor(), post_query)
        .await
        .map_err(|e| {
            let request = serde_json::json!({
                "page": query.page,
                "filter": { "publish": query.publish },
                "sort": query.sort,
            });
            AppError::operation(ERROR_LIST, e, &request, Some(identity.user_id))
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "posts": paginate(&state.posts, page, Projection::Full),
    })))
}

/// POST /api/v1/dashboard/posts
pub async fn store(
    identity: Identity,
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Payload,
) -> AppResult<HttpResponse> {
    let form = PostForm::read(&req, payload).await?;
    let request = form.log_payload();
    let (draft, attachments) = form.into_draft()?;

    let details = state
        .posts
        .create(&identity.actor(), draft, attachments)
        .await
        .map_err(|e| AppError::operation(ERROR_CREATE, e, &request, Some(identity.user_id)))?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "post": present(&state.posts, details, Projection::Full),
    })))
}

/// GET /api/v1/dashboard/posts/{post}
pub async fn show(
    identity: Identity,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let details = state
        .posts
        .show(&identity.actor(), id)
        .await
        .map_err(|e| {
            AppError::operation(ERROR_SHOW, e, &serde_json::json!({ "post": id }), Some(identity.user_id))
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "post": present(&state.posts, details, Projection::Full),
    })))
}

/// PUT /api/v1/dashboard/posts/{post}
pub async fn update(
    identity: Identity,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    req: HttpRequest,
    payload: web::Payload,
) -> AppResult<HttpResponse> {
    let form = PostForm::read(&req, payload).await?;
    let request = form.log_payload();
    let (changes, attachments) = form.into_changes()?;

    let details = state
        .posts
        .update(&identity.actor(), id.into_inner(), changes, attachments)
        .await
        .map_err(|e| AppError::operation(ERROR_UPDATE, e, &request, Some(identity.user_id)))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "post": present(&state.posts, details, Projection::Full),
    })))
}

/// DELETE /api/v1/dashboard/posts/{post}
pub async fn destroy(
    identity: Identity,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .delete(&identity.actor(), id.into_inner())
        .await
        .map_err(|e| AppError::operation(ERROR_DELETE, e, &serde_json::Value::Null, Some(identity.user_id)))?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Post deleted successfully.")))
}

/// POST /api/v1/dashboard/posts/{post}/restore
pub async fn restore(
    identity: Identity,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let details = state
        .posts
        .restore(&identity.actor(), id.into_inner())
        .await
        .map_err(|e| AppError::operation(ERROR_RESTORE, e, &serde_json::Value::Null, Some(identity.user_id)))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "post": present(&state.posts, details, Projection::Full),
    })))
}

/// DELETE /api/v1/dashboard/posts/{post}/force
pub async fn force_delete(
    identity: Identity,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .force_delete(&identity.actor(), id.into_inner())
        .await
        .map_err(|e| {
            AppError::operation(ERROR_FORCE_DELETE, e, &serde_json::Value::Null, Some(identity.user_id))
        })?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Post permanently deleted.")))
}

/// GET /api/v1/dashboard/tags
pub async fn tags(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let tags = state
        .posts
        .tags()
        .await
        .map_err(|e| AppError::operation(ERROR_TAGS, e, &serde_json::Value::Null, Some(identity.user_id)))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "tags": tags.into_iter().map(tag).collect::<Vec<_>>(),
    })))
}
