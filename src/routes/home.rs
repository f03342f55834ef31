use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use rusqlite::Connection;

use crate::db::models::Post;
use crate::db::posts;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::forms::{FormErrors, PostForm};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub viewer: String,
    pub viewer_id: i64,
    pub posts: Vec<Post>,
    pub form: PostForm,
    pub errors: FormErrors,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => AppError::from(e).into_response(),
        }
    }
}

fn index_page(
    conn: &Connection,
    user: CurrentUser,
    form: PostForm,
    errors: FormErrors,
) -> AppResult<Response> {
    let posts = posts::list_posts(conn)?;
    Ok(Html(IndexTemplate {
        viewer: user.username,
        viewer_id: user.id,
        posts,
        form,
        errors,
    })
    .into_response())
}

/// GET /: every post, newest first, with the new-post form.
pub async fn index(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    index_page(&conn, user, PostForm::default(), FormErrors::default())
}

/// POST /
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    match form.validate() {
        Ok(text) => {
            let id = posts::create_post(&conn, user.id, &text)?;
            tracing::info!(post_id = id, user_id = user.id, "Post created");
            Ok(Redirect::to("/").into_response())
        }
        Err(errors) => index_page(&conn, user, form, errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    struct Unprintable;

    impl fmt::Display for Unprintable {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[derive(Template)]
    #[template(source = "<p>{{ value }}</p>", ext = "html")]
    struct Broken {
        value: Unprintable,
    }

    #[derive(Template)]
    #[template(source = "<p>{{ value }}</p>", ext = "html")]
    struct Greeting {
        value: &'static str,
    }

    #[test]
    fn html_sets_content_type() {
        let response = Html(Greeting { value: "hi" }).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn render_failure_is_a_server_error() {
        let response = Html(Broken { value: Unprintable }).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
