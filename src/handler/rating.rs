use axum::Extension;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use axum::routing::put;
use axum::{Router, middleware};
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use crate::db::{ProjectExt, RatingExt};
use crate::dtos::{RatingResponseDto, SaveRatingDto};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth};

pub fn rating_handler(app_state: AppState) -> Router<AppState> {
    Router::new().route(
        "/",
        put(upsert_rating).route_layer(middleware::from_fn_with_state(app_state, auth)),
    )
}

/// Rate a project from 1 to 5. Rating again overwrites the previous value;
/// creators cannot rate their own projects.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn upsert_rating(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<SaveRatingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid upsert_rating input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let project = app_state
        .db_client
        .get_project_record(&slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting project: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ProjectNotFound.to_string()))?;

    if project.creator_id == jwt.user.id {
        return Err(HttpError::forbidden(
            "You cannot rate your own project".to_string(),
        ));
    }

    let value = app_state
        .db_client
        .upsert_rating(jwt.user.id, project.id, body.value)
        .await
        .map_err(|e| {
            tracing::error!("DB error, upserting rating: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let average_rating = app_state
        .db_client
        .get_average_rating(project.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting average rating: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(slug = %slug, value, "upsert_rating successful");
    let response = Json(RatingResponseDto {
        status: "success".to_string(),
        value,
        average_rating,
    });
    Ok(response)
}
