use crate::{
    AppState,
    db::UserExt,
    dtos::{
        ActivateQueryDto, ForgotPasswordRequestDto, LoginUserDto, RefreshResponseDto,
        RegisterUserDto, ResetPasswordRequestDto, Response, UserLoginResponseDto,
    },
    error::{ErrorMessage, HttpError},
    mail::mails::{send_activation_email, send_forgot_password_email, send_welcome_email},
    utils::{password, token},
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{Duration, Utc};
use validator::Validate;

use axum_client_ip::ClientIp;

use tracing::instrument;

/// Router for authentication endpoints
pub fn auth_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route(
            "/login",
            post(login).layer(app_state.ip_extraction.into_extension()),
        )
        .route("/verify", get(activate_account))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/refresh", post(refresh))
}

/// Register a new account: hash the password, store the user unactivated,
/// email the activation token.
#[instrument(skip(app_state, body), fields(username = %body.username, email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    // activation token valid for 24 hours
    let activation_token = uuid::Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::hours(24);

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let result = app_state
        .db_client
        .save_user(
            &body.username,
            &body.email,
            &body.mobile_phone,
            &hash_password,
            &activation_token,
            expires_at,
        )
        .await;

    match result {
        Ok(_user) => {
            // registration stands even if the email fails; the cleanup job
            // reaps accounts that never activate
            let send_email_result = send_activation_email(
                &body.email,
                &body.username,
                &activation_token,
                &app_state.env.frontend_url,
            )
            .await;

            if let Err(e) = send_email_result {
                tracing::error!("Failed to send activation email: {}", e);
            }

            tracing::info!(username = %body.username, email = %body.email, "Register Successful");
            Ok((
                StatusCode::CREATED,
                Json(Response {
                    status: "success",
                    message:
                        "Registration successful! Please check your email to activate your account."
                            .to_string(),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) => {
            // email, username, or phone already taken
            if db_err.is_unique_violation() {
                tracing::error!("DB error, saving user, unique_violation: {}", db_err);
                Err(HttpError::unique_constraint_violation(db_err.to_string()))
            } else {
                tracing::error!("DB error, saving user: {}", db_err);
                Err(HttpError::server_error(
                    ErrorMessage::ServerError.to_string(),
                ))
            }
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

/// Login with rate limiting (100 attempts per IP per day, 10 per identifier
/// per hour)
#[instrument(skip(app_state, body), fields(identifier = %body.identifier))]
pub async fn login(
    ClientIp(ip): ClientIp,
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ip_attempts = app_state
        .redis_client
        .get_ip_attempts(ip)
        .await
        .map_err(|e| {
            tracing::error!("RedisDB error, getting ip attempts: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .unwrap_or(0);
    if ip_attempts >= 100 {
        tracing::error!("Login attempt exceeded the limit");
        return Err(HttpError::server_error("Login failed"));
    }

    let identifier_ip_attempts = app_state
        .redis_client
        .get_identifier_ip_attempts(ip, &body.identifier)
        .await
        .map_err(|e| {
            tracing::error!("RedisDB error, getting identifier+ip attempts: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .unwrap_or(0);

    if identifier_ip_attempts >= 10 {
        tracing::error!("Login attempt exceeded the limit");
        return Err(HttpError::server_error("Login failed"));
    }

    match authenticate_process(State(app_state.clone()), &body).await {
        Ok(response) => {
            if let Err(e) = app_state
                .redis_client
                .delete_identifier_ip_attempts(ip, &body.identifier)
                .await
            {
                tracing::warn!("Failed to clear rate limit: {:?}", e);
            }
            tracing::info!(identifier = %body.identifier, ip = %ip, "Login Successful");
            Ok(response)
        }
        Err(e) => {
            if let Err(e) = app_state
                .redis_client
                .increment_attempts(ip, &body.identifier)
                .await
            {
                tracing::warn!("Failed to increment the rate {:?}", e);
            }
            Err(e)
        }
    }
}

/// Check credentials and issue access + refresh cookies.
async fn authenticate_process(
    State(app_state): State<AppState>,
    body: &LoginUserDto,
) -> Result<impl IntoResponse + use<>, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::server_error("Login failed")
    })?;

    // identifier containing '@' is treated as an email
    let result = if body.identifier.contains('@') {
        app_state
            .db_client
            .get_user(None, None, Some(&body.identifier), None)
            .await
            .map_err(|e| {
                tracing::error!("DB error, getting user: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?
    } else {
        app_state
            .db_client
            .get_user(None, Some(&body.identifier), None, None)
            .await
            .map_err(|e| {
                tracing::error!("DB error, getting user: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?
    };

    let user = result.ok_or_else(|| {
        tracing::error!("User not found");
        HttpError::server_error("Login failed")
    })?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::server_error("Login failed")
    })?;

    if !password_matched {
        tracing::error!("password mismatch");
        return Err(HttpError::server_error("Login failed"));
    }

    // unactivated accounts cannot log in, even with correct credentials
    if !user.verified {
        tracing::error!(user_id = %user.id, "Account not activated");
        return Err(HttpError::forbidden(
            ErrorMessage::AccountNotActivated.to_string(),
        ));
    }

    let access_token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let access_cookie = Cookie::build(("access_token", access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .build();

    let response = axum::response::Json(UserLoginResponseDto {
        status: "success".to_string(),
        access_token,
        username: user.username,
    });

    let refresh_token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.refresh_token_maxage,
    )
    .map_err(|e| {
        tracing::error!("Refresh token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let refresh_cookie = Cookie::build(("refresh_token", &refresh_token))
        .path("/")
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

    // refresh token lives in redis so it can be revoked on logout
    app_state
        .redis_client
        .save_refresh_token(
            &user.id.to_string(),
            &refresh_token,
            app_state.env.refresh_token_maxage,
        )
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.id, "RedisDB error, saving refresh token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let mut response = response.into_response();
    response.headers_mut().extend(headers);
    tracing::info!("authenticate_process successful");
    Ok(response)
}

/// Activate an account via the emailed token.
#[instrument(skip(app_state))]
pub async fn activate_account(
    Query(query_params): Query<ActivateQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid activation input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = app_state
        .db_client
        .get_user(None, None, None, Some(&query_params.token))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user = result.ok_or({
        tracing::error!("User not found by activation token");
        HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())
    })?;

    if let Some(expires_at) = user.token_expires_at {
        if Utc::now() > expires_at {
            tracing::error!(user_id = %user.id, "Activation token expired");
            return Err(HttpError::bad_request(
                ErrorMessage::InvalidToken.to_string(),
            ));
        }
    } else {
        tracing::error!(user_id = %user.id, "Expire time not set");
        return Err(HttpError::bad_request(
            ErrorMessage::InvalidToken.to_string(),
        ));
    }

    app_state
        .db_client
        .consume_activation_token(&query_params.token)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.id, "Activation error: {}", e);
            HttpError::server_error(e.to_string())
        })?;

    let send_welcome_email_result = send_welcome_email(&user.email, &user.username).await;

    if let Err(e) = send_welcome_email_result {
        tracing::error!("Failed to send welcome email: {}", e);
    }

    tracing::info!(user_id = %user.id, "Account activation successful");
    Ok((
        StatusCode::OK,
        Json(Response {
            status: "success",
            message: "Account activated successfully. You can now login.".to_string(),
        }),
    ))
}

/// Request a password reset link (identifier can be email or username)
#[instrument(skip(app_state))]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    Json(body): Json<ForgotPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid forgot_password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = match body.identifier.as_str() {
        email if email.contains('@') => {
            app_state
                .db_client
                .get_user(None, None, Some(email), None)
                .await
        }
        username => {
            app_state
                .db_client
                .get_user(None, Some(username), None, None)
                .await
        }
    }
    .map_err(|e| {
        tracing::error!("Failed to fetch user: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let user = result.ok_or_else(|| {
        tracing::error!("Email not found");
        HttpError::bad_request("No account found with this email address.".to_string())
    })?;

    // reset token valid for 30 minutes
    let reset_token = uuid::Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::minutes(30);

    app_state
        .db_client
        .add_activation_token(user.id, &reset_token, expires_at)
        .await
        .map_err(|e| {
            tracing::error!("DB error, adding reset token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let reset_link = format!(
        "{}/auth/password/reset/{}",
        app_state.env.frontend_url, &reset_token
    );

    let email_sent = send_forgot_password_email(&user.email, &reset_link, &user.username).await;

    if let Err(e) = email_sent {
        tracing::error!("Failed to send forgot password email: {}", e);
        return Err(HttpError::server_error("Failed to send email".to_string()));
    }

    let response = Response {
        message: "Password reset link has been sent to your email.".to_string(),
        status: "success",
    };
    tracing::info!(email = %user.email, "Forgot password email sent successfully");
    Ok(Json(response))
}

/// Reset password with the token from the email.
#[instrument(skip(app_state, body))]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(body): Json<ResetPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid reset_password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = app_state
        .db_client
        .get_user(None, None, None, Some(&body.token))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user by token: {}", e);
            HttpError::server_error(e.to_string())
        })?;

    let user = result.ok_or_else(|| {
        tracing::error!("User not found by reset token");
        HttpError::bad_request("Invalid or expired token".to_string())
    })?;

    if let Some(expires_at) = user.token_expires_at {
        if Utc::now() > expires_at {
            tracing::error!(user_id = %user.id, "Reset token has expired");
            return Err(HttpError::bad_request(
                "Reset token has expired".to_string(),
            ));
        }
    } else {
        tracing::error!(user_id = %user.id, "Expire time not set for reset token");
        return Err(HttpError::bad_request("Invalid reset token".to_string()));
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

    // token is single-use; clearing it must not activate the account
    app_state
        .db_client
        .consume_reset_token(&body.token)
        .await
        .map_err(|e| {
            tracing::error!("DB error, nullifying token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = Response {
        message: "Password has been successfully reset.".to_string(),
        status: "success",
    };
    tracing::info!(user_id = %user.id, "Password reset successfully");
    Ok(Json(response))
}

/// Issue a new access token from the refresh cookie.
#[instrument(skip(app_state, cookie_jar))]
pub async fn refresh(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let cookies = cookie_jar
        .get("refresh_token")
        .map(|cookie| cookie.value().to_string());

    let token = cookies.ok_or_else(|| {
        tracing::error!("Refresh token not provided");
        HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string())
    })?;

    let token_details = match token::decode_token(&token, app_state.env.jwt_secret.as_bytes()) {
        Ok(token_details) => token_details,
        Err(e) => {
            tracing::error!("Invalid refresh token: {}", e);
            return Err(HttpError::unauthorized(
                ErrorMessage::InvalidToken.to_string(),
            ));
        }
    };

    // must still be present in redis (not revoked by logout)
    let stored_refresh_token = app_state
        .redis_client
        .get_refresh_token(&token_details)
        .await
        .map_err(|e| {
            tracing::error!("RedisDB error, getting refresh token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if stored_refresh_token.is_none() || stored_refresh_token.unwrap() != token {
        tracing::error!("Refresh token mismatch or not found in Redis");
        return Err(HttpError::unauthorized(
            ErrorMessage::InvalidToken.to_string(),
        ));
    }

    let access_token = token::create_token(
        &token_details,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let access_cookie = Cookie::build(("access_token", access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .build();

    let response = axum::response::Json(RefreshResponseDto {
        status: "access_token recreated".to_string(),
        access_token,
    });

    let mut headers = HeaderMap::new();

    headers.append(
        header::SET_COOKIE,
        access_cookie.to_string().parse().unwrap(),
    );

    let mut response = response.into_response();
    response.headers_mut().extend(headers);
    tracing::info!("Access token refreshed successfully");
    Ok(response)
}
