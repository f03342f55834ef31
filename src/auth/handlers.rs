use askama::Template;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::{password, session};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::forms::{FormErrors, LoginForm, RegisterForm, DUPLICATE_USERNAME};
use crate::routes::home::Html;
use crate::state::AppState;

/// Shown for any failed login, whatever the cause.
pub const LOGIN_FAILED: &str = "Wrong user and/or password!";

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub form: LoginForm,
    pub errors: FormErrors,
    pub message: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub form: RegisterForm,
    pub errors: FormErrors,
}

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct NextQuery {
    pub next: String,
}

/// Only same-site absolute paths are followed after login. Browsers drop
/// tabs and newlines while parsing, so any whitespace or control byte
/// disqualifies the path.
pub fn safe_next(next: &str) -> &str {
    if next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && next.bytes().all(|b| b.is_ascii_graphic())
    {
        next
    } else {
        "/"
    }
}

fn login_form_page(form: LoginForm, errors: FormErrors, message: Option<String>) -> Response {
    let form = LoginForm {
        password: String::new(),
        ..form
    };
    Html(LoginTemplate {
        form,
        errors,
        message,
    })
    .into_response()
}

fn register_form_page(form: RegisterForm, errors: FormErrors) -> Response {
    let form = RegisterForm {
        password: String::new(),
        password_confirmation: String::new(),
        ..form
    };
    Html(RegisterTemplate { form, errors }).into_response()
}

// -- Login handlers --

/// GET /accounts/login
pub async fn login_page(
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to(safe_next(&query.next)).into_response());
    }

    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };
    Ok(login_form_page(form, FormErrors::default(), None))
}

/// POST /accounts/login
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let credentials = match form.validate() {
        Ok(c) => c,
        Err(errors) => return Ok(login_form_page(form, errors, None)),
    };

    let conn = state.db.get()?;
    let user = users::find_by_username(&conn, &credentials.username)?;
    let verified = password::verify_password(
        &credentials.password,
        user.as_ref().map(|u| u.password_hash.as_str()),
        state.config.auth.bcrypt_cost,
    )?;

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::info!(username = %credentials.username, "Login failed");
            return Ok(login_form_page(
                form,
                FormErrors::default(),
                Some(LOGIN_FAILED.to_string()),
            ));
        }
    };

    let target = safe_next(&form.next);

    let purged = session::purge_expired(&conn)?;
    if purged > 0 {
        tracing::debug!("Purged {} expired sessions", purged);
    }

    let hours = state.config.auth.session_hours;
    let token = session::create_session(&conn, user.id, hours)?;
    tracing::info!(user_id = user.id, username = %user.username, "Logged in");

    let cookie = session::session_cookie(&state.config.auth.cookie_name, &token, hours);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to(target),
    )
        .into_response())
}

/// GET|POST /accounts/logout
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    session::delete_session(&conn, &user.session_token)?;
    tracing::info!(user_id = user.id, "Logged out");

    Ok((
        [(
            header::SET_COOKIE,
            session::clear_session_cookie(&state.config.auth.cookie_name),
        )],
        Redirect::to("/accounts/login"),
    )
        .into_response())
}

// -- Registration handlers --

/// GET /accounts/register
pub async fn register_page(MaybeUser(user): MaybeUser) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(register_form_page(
        RegisterForm::default(),
        FormErrors::default(),
    ))
}

/// POST /accounts/register
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let credentials = match form.validate(&conn)? {
        Ok(c) => c,
        Err(errors) => return Ok(register_form_page(form, errors)),
    };

    let hash = password::hash_password(&credentials.password, state.config.auth.bcrypt_cost)?;
    match users::create_user(&mut conn, &credentials.username, &hash) {
        Ok(_) => Ok(Redirect::to("/accounts/login").into_response()),
        // Lost a race with a concurrent registration of the same name.
        Err(AppError::Database(rusqlite::Error::SqliteFailure(e, _)))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let mut errors = FormErrors::default();
            errors.add("username", DUPLICATE_USERNAME);
            Ok(register_form_page(form, errors))
        }
        Err(e) => Err(e),
    }
}
