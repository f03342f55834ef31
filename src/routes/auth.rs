use axum::routing::get;
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/login",
            get(handlers::login_page).post(handlers::login),
        )
        .route(
            "/accounts/logout",
            get(handlers::logout).post(handlers::logout),
        )
        .route(
            "/accounts/register",
            get(handlers::register_page).post(handlers::register),
        )
}
