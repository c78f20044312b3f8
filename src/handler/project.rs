use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use crate::db::{CategoryExt, DonationExt, ProjectExt, RatingExt};
use crate::dtos::{
    PaginationDto, ProjectDetailDto, ProjectDetailResponseDto, ProjectListResponseDto,
    ProjectResponseDto, ProjectsQueryParams, Response, SaveProjectDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::handler::comment::comment_handler;
use crate::handler::donation::donation_handler;
use crate::handler::rating::rating_handler;
use crate::middleware::{JWTAuthMiddleware, auth};
use crate::utils::funding;

const FEATURED_LIMIT: i32 = 5;
const RECENT_DONATIONS_LIMIT: i32 = 5;

pub fn project_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_projects))
        .route(
            "/",
            post(create_project)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/featured", get(get_featured_projects))
        .route(
            "/dashboard",
            get(get_my_projects)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{slug}", get(get_project))
        .route(
            "/{slug}",
            put(edit_project).route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{slug}/cancel",
            post(cancel_project)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/{slug}/donations", donation_handler(app_state.clone()))
        .nest("/{slug}/comments", comment_handler(app_state.clone()))
        .nest("/{slug}/ratings", rating_handler(app_state))
}

/// Paginated listing of active projects with optional category filter and
/// title/tag search. Cancelled and expired projects never show up here.
#[instrument(skip(app_state))]
pub async fn get_projects(
    Query(params): Query<ProjectsQueryParams>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_projects input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);
    let search = params.q.as_deref();

    let projects = app_state
        .db_client
        .get_projects(page, limit, params.category, search)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting projects: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .get_project_count(params.category, search)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting project count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total_pages = (total as f64 / limit as f64).ceil() as i32;

    let response = Json(ProjectListResponseDto {
        status: "success".to_string(),
        data: projects,
        pagination: Some(PaginationDto {
            page,
            limit,
            total: total as i32,
            total_pages,
        }),
    });
    Ok(response)
}

/// The homepage highlight: latest five featured projects.
#[instrument(skip(app_state))]
pub async fn get_featured_projects(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let projects = app_state
        .db_client
        .get_featured_projects(FEATURED_LIMIT)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting featured projects: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = Json(ProjectListResponseDto {
        status: "success".to_string(),
        data: projects,
        pagination: None,
    });
    Ok(response)
}

/// Project detail page: the row plus tags, donation totals, funding
/// percentage, average rating, and the latest donations.
#[instrument(skip(app_state))]
pub async fn get_project(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let project = app_state
        .db_client
        .get_project_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting project: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ProjectNotFound.to_string()))?;

    let tags = app_state
        .db_client
        .get_project_tags(project.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting project tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total_donations = app_state
        .db_client
        .get_total_donations(project.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting donation total: {}", e);
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

    let recent_donations = app_state
        .db_client
        .get_recent_donations(project.id, RECENT_DONATIONS_LIMIT)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting recent donations: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let donation_percentage = funding::donation_percentage(total_donations, project.total_target);

    let response = Json(ProjectDetailResponseDto {
        status: "success".to_string(),
        data: ProjectDetailDto {
            project,
            tags,
            total_donations,
            donation_percentage,
            average_rating,
            recent_donations,
        },
    });
    Ok(response)
}

#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn create_project(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<SaveProjectDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_project input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let category_ok = app_state
        .db_client
        .category_exists(body.category_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking category: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if !category_ok {
        return Err(HttpError::bad_request("Category does not exist".to_string()));
    }

    let result = app_state
        .db_client
        .create_project(jwt.user.id, &body)
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating project: {}", e);
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    // slug race lost against a concurrent insert
                    return HttpError::unique_constraint_violation(
                        "A project with a conflicting slug was just created, please retry"
                            .to_string(),
                    );
                }
            }
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(slug = %result.slug, "create_project successful");
    let response = Json(ProjectResponseDto {
        status: "success".to_string(),
        data: result,
    });
    Ok((StatusCode::CREATED, response))
}

/// A project is frozen against edits once anybody has donated; that is a
/// client error (400), unlike the 403 a non-creator gets.
fn check_not_funded(donation_count: i64) -> Result<(), HttpError> {
    if donation_count > 0 {
        return Err(HttpError::bad_request(
            "Project can no longer be edited after receiving donations".to_string(),
        ));
    }
    Ok(())
}

/// Edit a project. Only the creator may edit, and only while nobody has
/// donated yet; the slug never changes so shared links keep working.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn edit_project(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<SaveProjectDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid edit_project input: {}", e);
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

    if project.creator_id != jwt.user.id {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let donation_count = app_state
        .db_client
        .get_project_donation_count(project.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting donation count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    check_not_funded(donation_count)?;

    let category_ok = app_state
        .db_client
        .category_exists(body.category_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking category: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if !category_ok {
        return Err(HttpError::bad_request("Category does not exist".to_string()));
    }

    let result = app_state
        .db_client
        .edit_project(project.id, &body)
        .await
        .map_err(|e| {
            tracing::error!("DB error, editing project: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(slug = %slug, "edit_project successful");
    let response = Json(ProjectResponseDto {
        status: "success".to_string(),
        data: result,
    });
    Ok(response)
}

/// Cancel a project. Only the creator, and only while donations sit below a
/// quarter of the target. Cancelling twice is a no-op.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn cancel_project(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let project = app_state
        .db_client
        .get_project_record(&slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting project: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ProjectNotFound.to_string()))?;

    if project.creator_id != jwt.user.id {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    if project.is_cancelled {
        let response = Json(Response {
            status: "success",
            message: "Project is already cancelled".to_string(),
        });
        return Ok(response.into_response());
    }

    let total_donations = app_state
        .db_client
        .get_total_donations(project.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting donation total: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if !funding::can_cancel(total_donations, project.total_target) {
        return Err(HttpError::forbidden(
            "Project cannot be cancelled once donations reach 25% of the target".to_string(),
        ));
    }

    app_state
        .db_client
        .cancel_project(project.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, cancelling project: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(slug = %slug, "cancel_project successful");
    let response = Json(Response {
        status: "success",
        message: "Project cancelled".to_string(),
    });
    Ok(response.into_response())
}

/// The caller's own projects, cancelled and expired ones included.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn get_my_projects(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let projects = app_state
        .db_client
        .get_user_projects(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting dashboard projects: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = Json(ProjectListResponseDto {
        status: "success".to_string(),
        data: projects,
        pagination: None,
    });
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfunded_project_stays_editable() {
        assert!(check_not_funded(0).is_ok());
    }

    #[test]
    fn funded_project_edit_is_a_bad_request() {
        let err = check_not_funded(1).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = check_not_funded(37).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
