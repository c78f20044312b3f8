use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use tracing::instrument;

use crate::AppState;
use crate::db::CategoryExt;
use crate::dtos::CategoryListResponse;
use crate::error::{ErrorMessage, HttpError};

pub fn category_handler() -> Router<AppState> {
    Router::new().route("/", get(get_categories))
}

/// The fixed category list used by project forms and listing filters.
#[instrument(skip(app_state))]
pub async fn get_categories(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state.db_client.get_categories().await.map_err(|e| {
        tracing::error!("DB error, getting categories: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = Json(CategoryListResponse {
        status: "success".to_string(),
        data: categories,
    });
    Ok(response)
}
