use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        auth::auth_handler, category::category_handler, project::project_handler,
        report::report_handler, users::users_handler,
    },
    middleware::auth,
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler(app_state.clone()))
        .nest(
            "/users",
            users_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/projects", project_handler(app_state.clone()))
        .nest("/categories", category_handler())
        .nest("/reports", report_handler(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route)
}
