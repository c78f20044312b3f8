use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{Router, middleware};
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use crate::db::{CommentExt, ProjectExt};
use crate::dtos::{
    CommentListResponse, PaginationDto, RequestQueryDto, SaveCommentDto, SingleCommentResponse,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth};
use crate::models::Project;

pub fn comment_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_comments))
        .route(
            "/",
            post(create_comment)
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

async fn load_project(app_state: &AppState, slug: &str) -> Result<Project, HttpError> {
    app_state
        .db_client
        .get_project_record(slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting project: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ProjectNotFound.to_string()))
}

/// Paginated comment threads, newest top-level comment first with replies
/// oldest first underneath.
#[instrument(skip(app_state))]
pub async fn get_comments(
    Path(slug): Path<String>,
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_comments input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1) as i32;
    let limit = query_params.limit.unwrap_or(10) as i32;

    let project = load_project(&app_state, &slug).await?;

    let threads = app_state
        .db_client
        .get_comment_threads(project.id, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comment threads: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .get_top_level_comment_count(project.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comment count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total_pages = (total as f64 / limit as f64).ceil() as i32;

    let response = Json(CommentListResponse {
        status: "success".to_string(),
        data: threads,
        pagination: PaginationDto {
            page,
            limit,
            total: total as i32,
            total_pages,
        },
    });
    Ok(response)
}

/// Comment on a project or reply to a top-level comment. Threads stay one
/// level deep, so replying to a reply is rejected rather than re-anchored.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn create_comment(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<SaveCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let project = load_project(&app_state, &slug).await?;

    if let Some(parent_id) = body.parent_id {
        let parent = app_state
            .db_client
            .get_comment(parent_id)
            .await
            .map_err(|e| {
                tracing::error!("DB error, getting parent comment: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?
            .ok_or_else(|| HttpError::bad_request("Parent comment does not exist".to_string()))?;

        if parent.project_id != project.id {
            return Err(HttpError::bad_request(
                "Parent comment belongs to a different project".to_string(),
            ));
        }

        if parent.parent_id.is_some() {
            return Err(HttpError::bad_request(
                "Replies to replies are not allowed".to_string(),
            ));
        }
    }

    let comment = app_state
        .db_client
        .create_comment(jwt.user.id, project.id, &body.content, body.parent_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(slug = %slug, comment_id = comment.id, "create_comment successful");
    let response = Json(SingleCommentResponse {
        status: "success".to_string(),
        data: comment,
    });
    Ok((StatusCode::CREATED, response))
}
