use axum::Extension;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::{Router, middleware};
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use crate::db::{CommentExt, ProjectExt, ReportExt};
use crate::dtos::{Response, SaveReportDto};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth};
use crate::models::ReportTarget;

pub fn report_handler(app_state: AppState) -> Router<AppState> {
    Router::new().route(
        "/{target}/{id}",
        post(create_report).route_layer(middleware::from_fn_with_state(app_state, auth)),
    )
}

/// Report a project or a comment for moderation. The target must exist;
/// the report row keeps a type tag plus the matching foreign key.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn create_report(
    Path((target, id)): Path<(ReportTarget, i32)>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<SaveReportDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_report input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let (project_id, comment_id) = match target {
        ReportTarget::Project => {
            let exists = app_state.db_client.project_exists(id).await.map_err(|e| {
                tracing::error!("DB error, checking project: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
            if !exists {
                return Err(HttpError::not_found(
                    ErrorMessage::ProjectNotFound.to_string(),
                ));
            }
            (Some(id), None)
        }
        ReportTarget::Comment => {
            let comment = app_state.db_client.get_comment(id).await.map_err(|e| {
                tracing::error!("DB error, checking comment: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
            if comment.is_none() {
                return Err(HttpError::not_found("Comment not found".to_string()));
            }
            (None, Some(id))
        }
    };

    let report_id = app_state
        .db_client
        .create_report(jwt.user.id, target, project_id, comment_id, &body.reason)
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating report: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(report_id, target = target.to_str(), "create_report successful");
    let response = Json(Response {
        status: "success",
        message: "Report submitted".to_string(),
    });
    Ok((StatusCode::CREATED, response))
}
