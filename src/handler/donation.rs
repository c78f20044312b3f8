use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{Router, middleware};
use chrono::Utc;
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use crate::db::{DonationExt, ProjectExt};
use crate::dtos::{
    DonationListResponse, PaginationDto, RequestQueryDto, SaveDonationDto, SingleDonationResponse,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth};
use crate::models::Project;

pub fn donation_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_donations))
        .route(
            "/",
            post(create_donation)
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

/// Donate to a project. Cancelled and expired projects take no money.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn create_donation(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<SaveDonationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_donation input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let project = load_project(&app_state, &slug).await?;

    if project.is_cancelled {
        return Err(HttpError::bad_request(
            "Cancelled projects cannot accept donations".to_string(),
        ));
    }

    if project.end_time <= Utc::now() {
        return Err(HttpError::bad_request(
            "This campaign has ended".to_string(),
        ));
    }

    let donation = app_state
        .db_client
        .create_donation(jwt.user.id, project.id, body.amount)
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating donation: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(slug = %slug, amount = %donation.amount, "create_donation successful");
    let response = Json(SingleDonationResponse {
        status: "success".to_string(),
        data: donation,
    });
    Ok((StatusCode::CREATED, response))
}

/// Paginated donation history of a project, newest first.
#[instrument(skip(app_state))]
pub async fn get_donations(
    Path(slug): Path<String>,
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_donations input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1) as i32;
    let limit = query_params.limit.unwrap_or(10) as i32;

    let project = load_project(&app_state, &slug).await?;

    let donations = app_state
        .db_client
        .get_donations(project.id, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting donations: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .get_project_donation_count(project.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting donation count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total_pages = (total as f64 / limit as f64).ceil() as i32;

    let response = Json(DonationListResponse {
        status: "success".to_string(),
        data: donations,
        pagination: PaginationDto {
            page,
            limit,
            total: total as i32,
            total_pages,
        },
    });
    Ok(response)
}
