use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, Method};

use crate::auth::session;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub session_token: String,
}

/// Extractor that requires authentication.
/// Without a live session the request is redirected to the login page.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let login_required = || AppError::LoginRequired {
            next: return_path(parts),
        };

        let token = extract_session_token(parts, &state.config.auth.cookie_name)
            .ok_or_else(login_required)?
            .to_string();

        let conn = state.db.get()?;
        match session::lookup_session(&conn, &token)? {
            Some(user) => Ok(CurrentUser {
                id: user.user_id,
                username: user.username,
                session_token: token,
            }),
            None => Err(login_required()),
        }
    }
}

/// Optional user extractor: `None` instead of a redirect when not authenticated.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::LoginRequired { .. }) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// Where login should send the user back to. Only GETs can be replayed by a
/// redirect, so anything else returns home.
fn return_path(parts: &Parts) -> String {
    if parts.method != Method::GET {
        return "/".to_string();
    }
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

pub fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
