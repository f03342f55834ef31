use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    /// No valid session; `next` is the path to come back to after login.
    #[error("Login required")]
    LoginRequired { next: String },

    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::LoginRequired { next } => {
                return Redirect::to(&login_url(next)).into_response();
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                internal()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                internal()
            }
            AppError::Bcrypt(e) => {
                tracing::error!("Password hashing error: {}", e);
                internal()
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                internal()
            }
            AppError::Template(e) => {
                tracing::error!("Template render error: {}", e);
                internal()
            }
        };

        (status, message).into_response()
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Login page URL that returns the user to `next` afterwards.
pub fn login_url(next: &str) -> String {
    if next.is_empty() || next == "/" {
        return "/accounts/login".to_string();
    }
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/accounts/login?next={}", encoded)
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn forbidden_returns_403() {
        assert_eq!(response_status(AppError::Forbidden), StatusCode::FORBIDDEN);
    }

    #[test]
    fn bad_request_returns_400() {
        assert_eq!(
            response_status(AppError::BadRequest("oops".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn io_error_returns_500() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(
            response_status(AppError::Io(err)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn template_error_returns_500() {
        let err = AppError::from(askama::Error::Fmt(std::fmt::Error));
        assert_eq!(response_status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn login_required_redirects_with_next() {
        let response = AppError::LoginRequired {
            next: "/post/3".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/accounts/login?next=%2Fpost%2F3"
        );
    }

    #[test]
    fn login_url_omits_next_for_home() {
        assert_eq!(login_url("/"), "/accounts/login");
        assert_eq!(login_url(""), "/accounts/login");
    }
}
