pub mod assets;
pub mod auth;
pub mod home;
pub mod posts;
pub mod profile;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::db::models::MEDIA_URL;
use crate::state::AppState;

/// The whole application: pages, static assets and uploaded media.
pub fn build_router(state: AppState) -> Router {
    let media = ServeDir::new(state.config.media_path());
    let body_limit = state.config.storage.max_upload_bytes;

    Router::new()
        .route("/", get(home::index).post(home::create_post))
        .route("/assets/{*path}", get(assets::serve))
        .merge(auth::router())
        .merge(posts::router())
        .merge(profile::router())
        .nest_service(MEDIA_URL, media)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
