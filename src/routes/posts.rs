use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use rusqlite::Connection;

use crate::access;
use crate::db::models::{Comment, Post};
use crate::db::{comments, posts};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::routes::home::Html;
use crate::state::AppState;

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/post_details.html")]
pub struct PostDetailsTemplate {
    pub viewer: String,
    pub viewer_id: i64,
    pub post: Post,
    pub comments: Vec<Comment>,
    pub likers: Vec<String>,
    pub dislikers: Vec<String>,
    pub form: CommentForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/edit_post.html")]
pub struct EditPostTemplate {
    pub viewer: String,
    pub post_id: i64,
    pub form: PostForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/edit_comment.html")]
pub struct EditCommentTemplate {
    pub viewer: String,
    pub comment_id: i64,
    pub post_id: i64,
    pub form: CommentForm,
    pub errors: FormErrors,
}

// --- Router ---

/// In the `*_comment` routes `{id}` names the comment, not the post.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/{id}", get(post_details).post(add_comment))
        .route("/post/{id}/like", post(like))
        .route("/post/{id}/dislike", post(dislike))
        .route("/post/{id}/edit", get(edit_post_page).post(edit_post))
        .route("/post/{id}/delete", post(delete_post))
        .route("/post/{id}/delete_comment", post(delete_comment))
        .route(
            "/post/{id}/edit_comment",
            get(edit_comment_page).post(edit_comment),
        )
}

fn post_url(id: i64) -> String {
    format!("/post/{}", id)
}

fn load_post(conn: &Connection, id: i64) -> AppResult<Post> {
    posts::get_post(conn, id)?.ok_or(AppError::NotFound)
}

fn load_comment(conn: &Connection, id: i64) -> AppResult<Comment> {
    comments::get_comment(conn, id)?.ok_or(AppError::NotFound)
}

fn details_page(
    conn: &Connection,
    user: CurrentUser,
    post: Post,
    form: CommentForm,
    errors: FormErrors,
) -> AppResult<Response> {
    let comments = comments::list_for_post(conn, post.id)?;
    let likers = posts::likers(conn, post.id)?;
    let dislikers = posts::dislikers(conn, post.id)?;

    Ok(Html(PostDetailsTemplate {
        viewer: user.username,
        viewer_id: user.id,
        post,
        comments,
        likers,
        dislikers,
        form,
        errors,
    })
    .into_response())
}

// --- Post handlers ---

async fn post_details(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = load_post(&conn, id)?;
    details_page(&conn, user, post, CommentForm::default(), FormErrors::default())
}

async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = load_post(&conn, id)?;

    match form.validate() {
        Ok(text) => {
            comments::create_comment(&conn, post.id, user.id, &text)?;
            Ok(Redirect::to(&post_url(post.id)).into_response())
        }
        Err(errors) => details_page(&conn, user, post, form, errors),
    }
}

/// Any signed-in user may like any post, their own included.
async fn like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = load_post(&conn, id)?;
    posts::add_liker(&conn, post.id, user.id)?;
    Ok(Redirect::to(&post_url(post.id)).into_response())
}

/// Disliking leaves an existing like in place.
async fn dislike(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = load_post(&conn, id)?;
    posts::add_disliker(&conn, post.id, user.id)?;
    Ok(Redirect::to(&post_url(post.id)).into_response())
}

async fn edit_post_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = load_post(&conn, id)?;
    access::ensure_owner(&user, &post)?;

    Ok(Html(EditPostTemplate {
        viewer: user.username,
        post_id: post.id,
        form: PostForm { text: post.text },
        errors: FormErrors::default(),
    })
    .into_response())
}

async fn edit_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = load_post(&conn, id)?;
    access::ensure_owner(&user, &post)?;

    match form.validate() {
        Ok(text) => {
            posts::update_post_text(&conn, post.id, &text)?;
            Ok(Redirect::to("/").into_response())
        }
        Err(errors) => Ok(Html(EditPostTemplate {
            viewer: user.username,
            post_id: post.id,
            form,
            errors,
        })
        .into_response()),
    }
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = load_post(&conn, id)?;
    access::ensure_owner(&user, &post)?;

    posts::delete_post(&conn, post.id)?;
    tracing::info!(post_id = post.id, user_id = user.id, "Post deleted");
    Ok(Redirect::to("/").into_response())
}

// --- Comment handlers ---

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let comment = load_comment(&conn, id)?;
    access::ensure_owner(&user, &comment)?;

    comments::delete_comment(&conn, comment.id)?;
    Ok(Redirect::to(&post_url(comment.post_id)).into_response())
}

async fn edit_comment_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let comment = load_comment(&conn, id)?;
    access::ensure_owner(&user, &comment)?;

    Ok(Html(EditCommentTemplate {
        viewer: user.username,
        comment_id: comment.id,
        post_id: comment.post_id,
        form: CommentForm { text: comment.text },
        errors: FormErrors::default(),
    })
    .into_response())
}

async fn edit_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let comment = load_comment(&conn, id)?;
    access::ensure_owner(&user, &comment)?;

    match form.validate() {
        Ok(text) => {
            comments::update_comment_text(&conn, comment.id, &text)?;
            Ok(Redirect::to(&post_url(comment.post_id)).into_response())
        }
        Err(errors) => Ok(Html(EditCommentTemplate {
            viewer: user.username,
            comment_id: comment.id,
            post_id: comment.post_id,
            form,
            errors,
        })
        .into_response()),
    }
}
