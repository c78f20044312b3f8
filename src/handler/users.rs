use crate::db::{DonationExt, ProjectExt};
use crate::{
    AppState,
    db::UserExt,
    dtos::{
        DoubleCheckDto, FilterUserDto, NameUpdateDto, PhoneUpdateDto, RequestQueryDto, Response,
        UserData, UserListResponseDto, UserMeData, UserMeResponseDto, UserPasswordUpdateDto,
        UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, role_check},
    models::UserRole,
    utils::password,
};
use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use axum_extra::extract::cookie::Cookie;
use tracing::instrument;
use validator::Validate;

/// Router for user management endpoints.
///
/// The whole router sits behind the auth middleware (applied in routes.rs);
/// the listing additionally requires the admin role.
pub fn users_handler() -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(get_me).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin, UserRole::User])
            })),
        )
        .route(
            "/all",
            get(get_users).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        .route("/username", put(update_user_name))
        .route("/phone", put(update_user_phone))
        .route("/password", put(update_user_password))
        .route("/logout", post(logout))
        .route("/delete-me", delete(delete_me))
}

/// Current user's profile with project and donation counts.
#[instrument(skip(user, app_state), fields(username = %user.user.username))]
pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let filtered_user = FilterUserDto::filter_user(&user.user);

    let project_count = app_state
        .db_client
        .get_user_project_count(user.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user project count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let donation_count = app_state
        .db_client
        .get_user_donation_count(&user.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user donation count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response_data = UserMeResponseDto {
        status: "success".to_string(),
        data: UserMeData {
            user: filtered_user,
            project_count,
            donation_count,
        },
    };
    tracing::info!("get_me successful");
    Ok(Json(response_data))
}

/// Paginated user listing (admin only).
#[instrument(skip(app_state))]
pub async fn get_users(
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_users input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page as u32, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting users: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user_count = app_state.db_client.get_user_count().await.map_err(|e| {
        tracing::error!("DB error, getting user count: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    };
    tracing::info!("get_users successful");
    Ok(Json(response))
}

/// Update the display name.
#[instrument(skip(app_state, user, body), fields(username = %user.user.username))]
pub async fn update_user_name(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<NameUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_user_name input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = app_state
        .db_client
        .update_user_name(user.user.id, &body.name)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating user name: {}", e);
            // Postgres unique violation has SQLSTATE code 23505
            if let sqlx::Error::Database(ref db_err) = e {
                if let Some(code) = db_err.code() {
                    if code == "23505" {
                        return HttpError::new(
                            "Username already exists".to_string(),
                            StatusCode::BAD_REQUEST,
                        );
                    }
                }
            }
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = UserResponseDto {
        data: UserData {
            user: FilterUserDto::filter_user(&result),
        },
        status: "success".to_string(),
    };
    tracing::info!("update_user_name successful");
    Ok(Json(response))
}

/// Update the mobile phone number.
#[instrument(skip(app_state, user, body), fields(username = %user.user.username))]
pub async fn update_user_phone(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<PhoneUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_user_phone input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = app_state
        .db_client
        .update_user_phone(user.user.id, &body.mobile_phone)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating user phone: {}", e);
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return HttpError::unique_constraint_violation(
                        "Phone number already in use".to_string(),
                    );
                }
            }
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = UserResponseDto {
        data: UserData {
            user: FilterUserDto::filter_user(&result),
        },
        status: "success".to_string(),
    };
    tracing::info!("update_user_phone successful");
    Ok(Json(response))
}

/// Change password after verifying the old one.
#[instrument(skip(app_state, user, body), fields(username = %user.user.username))]
pub async fn update_user_password(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UserPasswordUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_user_password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = &user.user;

    let password_match = password::compare(&body.old_password, &user.password).map_err(|e| {
        tracing::error!("Password comparison error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    if !password_match {
        tracing::error!("Old password is incorrect");
        return Err(HttpError::bad_request(
            "Old password is incorrect".to_string(),
        ));
    }

    let hash_password = password::hash(&body.new_password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    app_state
        .db_client
        .update_user_password(user.id, hash_password)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating user password: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // revoke the refresh token so other sessions drop off
    if let Err(e) = app_state
        .redis_client
        .delete_refresh_token(&user.id.to_string())
        .await
    {
        tracing::warn!("RedisDB error, deleting refresh token: {:?}", e);
    }

    let response = Response {
        message: "Password updated successfully.".to_string(),
        status: "success",
    };
    tracing::info!("update_user_password successful");
    Ok(Json(response))
}

/// Logout: revoke the refresh token and expire both cookies.
#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn logout(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    if let Err(e) = app_state
        .redis_client
        .delete_refresh_token(&user.user.id.to_string())
        .await
    {
        tracing::warn!("RedisDB error, deleting refresh token: {:?}", e);
    }

    let access_cookie = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .secure(true)
        .build();

    let refresh_cookie = Cookie::build(("refresh_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .secure(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        access_cookie.to_string().parse().unwrap(),
    );
    headers.append(
        header::SET_COOKIE,
        refresh_cookie.to_string().parse().unwrap(),
    );

    let response = Json(Response {
        status: "success",
        message: "You have been logged out successfully.".to_string(),
    });

    let mut response = response.into_response();
    response.headers_mut().extend(headers);
    tracing::info!("logout successful");
    Ok(response)
}

/// Delete the account after a password re-check. Projects, donations,
/// comments, and ratings go with it via cascade.
#[instrument(skip(app_state, user, body), fields(username = %user.user.username))]
pub async fn delete_me(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<DoubleCheckDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid delete_me input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = &user.user;

    let password_match = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password comparison error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    if !password_match {
        tracing::error!("Password is incorrect");
        return Err(HttpError::bad_request("Password is incorrect".to_string()));
    }

    app_state.db_client.delete_user(user.id).await.map_err(|e| {
        tracing::error!("DB error, deleting user: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    if let Err(e) = app_state
        .redis_client
        .delete_refresh_token(&user.id.to_string())
        .await
    {
        tracing::warn!("RedisDB error, deleting refresh token: {:?}", e);
    }

    tracing::info!(user_id = %user.id, "delete_me successful");
    Ok(StatusCode::NO_CONTENT)
}
