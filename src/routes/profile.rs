use askama::Template;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use rusqlite::Connection;

use crate::access;
use crate::db::models::{Gender, Gift, Profile, ProfileChanges};
use crate::db::{gifts, users};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::forms::{FormErrors, GiftForm, ProfileForm};
use crate::routes::home::Html;
use crate::state::AppState;
use crate::uploads::{self, MultipartForm};

// --- View structs ---

pub struct GenderOption {
    pub code: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn gender_options(selected: &str) -> Vec<GenderOption> {
    Gender::ALL
        .into_iter()
        .map(|g| GenderOption {
            code: g.code(),
            label: g.label(),
            selected: g.code() == selected,
        })
        .collect()
}

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub viewer: String,
    pub is_owner: bool,
    pub profile: Profile,
}

#[derive(Template)]
#[template(path = "pages/edit_profile.html")]
pub struct EditProfileTemplate {
    pub viewer: String,
    pub profile: Profile,
    pub form: ProfileForm,
    pub genders: Vec<GenderOption>,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/send_gift.html")]
pub struct SendGiftTemplate {
    pub viewer: String,
    pub recipient: Profile,
    pub message: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/show_gift.html")]
pub struct ShowGiftTemplate {
    pub viewer: String,
    pub recipient: Profile,
    pub gifts: Vec<Gift>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/{username}", get(profile_view))
        .route(
            "/profile/{username}/edit",
            get(edit_profile_page).post(edit_profile),
        )
        .route(
            "/profile/{username}/send_gift",
            get(send_gift_page).post(send_gift),
        )
        .route("/profile/{username}/show_gift", get(show_gift))
}

fn load_profile(conn: &Connection, username: &str) -> AppResult<Profile> {
    users::get_profile(conn, username)?.ok_or(AppError::NotFound)
}

fn profile_url(username: &str) -> String {
    format!("/profile/{}", username)
}

fn write_profile(state: &AppState, user_id: i64, changes: &ProfileChanges) -> AppResult<()> {
    let conn = state.db.get()?;
    users::update_profile(&conn, user_id, changes)
}

fn edit_profile_form_page(
    user: CurrentUser,
    profile: Profile,
    form: ProfileForm,
    errors: FormErrors,
) -> Response {
    let genders = gender_options(&form.gender);
    Html(EditProfileTemplate {
        viewer: user.username,
        profile,
        form,
        genders,
        errors,
    })
    .into_response()
}

// --- Profile handlers ---

async fn profile_view(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let profile = {
        let conn = state.db.get()?;
        load_profile(&conn, &username)?
    };
    let is_owner = access::is_owner(&user, &profile);

    Ok(Html(ProfileTemplate {
        viewer: user.username,
        is_owner,
        profile,
    })
    .into_response())
}

async fn edit_profile_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let profile = {
        let conn = state.db.get()?;
        load_profile(&conn, &username)?
    };
    access::ensure_owner(&user, &profile)?;

    let form = ProfileForm {
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        gender: profile.gender.code().to_string(),
        date_of_birth: profile.date_of_birth_display(),
        avatar: None,
    };
    Ok(edit_profile_form_page(
        user,
        profile,
        form,
        FormErrors::default(),
    ))
}

async fn edit_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let profile = {
        let conn = state.db.get()?;
        load_profile(&conn, &username)?
    };
    access::ensure_owner(&user, &profile)?;

    let form = ProfileForm::from_multipart(MultipartForm::read(multipart).await?);
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            let form = ProfileForm {
                avatar: None,
                ..form
            };
            return Ok(edit_profile_form_page(user, profile, form, errors));
        }
    };

    let media_root = state.config.media_path();
    let mut changes = input.changes;
    if let Some((format, file)) = input.avatar {
        let path =
            uploads::save_image(&media_root, uploads::AVATAR_DIR, format, &file.bytes).await?;
        changes.avatar_path = Some(path);
    }

    if let Err(e) = write_profile(&state, profile.user_id, &changes) {
        if let Some(path) = &changes.avatar_path {
            uploads::discard_image(&media_root, path).await;
        }
        return Err(e);
    }
    tracing::info!(user_id = profile.user_id, "Profile updated");

    Ok(Redirect::to(&profile_url(&profile.username)).into_response())
}

// --- Gift handlers ---

async fn send_gift_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let recipient = {
        let conn = state.db.get()?;
        load_profile(&conn, &username)?
    };

    Ok(Html(SendGiftTemplate {
        viewer: user.username,
        recipient,
        message: String::new(),
        errors: FormErrors::default(),
    })
    .into_response())
}

/// Any signed-in user may send a gift to any user.
async fn send_gift(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let recipient = {
        let conn = state.db.get()?;
        load_profile(&conn, &username)?
    };

    let form = GiftForm::from_multipart(MultipartForm::read(multipart).await?);
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            return Ok(Html(SendGiftTemplate {
                viewer: user.username,
                recipient,
                message: form.message,
                errors,
            })
            .into_response());
        }
    };

    let media_root = state.config.media_path();
    let snapshot_path = match input.snapshot {
        Some((format, file)) => Some(
            uploads::save_image(&media_root, uploads::SNAPSHOT_DIR, format, &file.bytes)
                .await?,
        ),
        None => None,
    };

    let written = state.db.get().map_err(AppError::from).and_then(|conn| {
        gifts::create_gift(
            &conn,
            user.id,
            recipient.user_id,
            &input.message,
            snapshot_path.as_deref(),
        )
    });
    if let Err(e) = written {
        if let Some(path) = &snapshot_path {
            uploads::discard_image(&media_root, path).await;
        }
        return Err(e);
    }

    Ok(Redirect::to(&format!("{}/show_gift", profile_url(&recipient.username))).into_response())
}

async fn show_gift(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let (recipient, gifts) = {
        let conn = state.db.get()?;
        let recipient = load_profile(&conn, &username)?;
        let gifts = gifts::list_received(&conn, recipient.user_id)?;
        (recipient, gifts)
    };

    Ok(Html(ShowGiftTemplate {
        viewer: user.username,
        recipient,
        gifts,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_options_mark_selection() {
        let options = gender_options("F");
        assert_eq!(options.len(), 3);
        let selected: Vec<&str> = options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.code)
            .collect();
        assert_eq!(selected, vec!["F"]);
        assert_eq!(options[0].label, "Unknown");
    }
}
