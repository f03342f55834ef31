//! Input schemas for every user-facing action.
//!
//! Each form validates into a cleaned value or a [`FormErrors`] set keyed by
//! field name. Handlers re-render the form with those errors; validation never
//! turns into an HTTP error on its own.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::db::models::{Gender, ProfileChanges};
use crate::db::users;
use crate::error::AppResult;
use crate::uploads::{sniff_image, ImageFormat, MultipartForm, UploadedFile};

pub const POST_MAX_CHARS: usize = 200;
pub const COMMENT_MAX_CHARS: usize = 100;
pub const GIFT_MAX_CHARS: usize = 250;
pub const USERNAME_MAX_CHARS: usize = 30;
pub const NAME_MAX_CHARS: usize = 100;

pub const REQUIRED: &str = "This field is required.";
pub const DUPLICATE_USERNAME: &str = "There is another user with this username";
pub const PASSWORD_MISMATCH: &str = "The passwords don't match";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers and underscores.";
pub const INVALID_DATE: &str = "Enter a valid date.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

/// Validation outcome: the cleaned value, or per-field messages.
pub type Validated<T> = Result<T, FormErrors>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn finish<T>(self, value: T) -> Validated<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Trim, then enforce presence and a character limit.
fn clean_text(errors: &mut FormErrors, field: &str, raw: &str, max: usize, required: bool) -> String {
    let value = raw.trim();
    if value.is_empty() {
        if required {
            errors.add(field, REQUIRED);
        }
        return String::new();
    }
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
    }
    value.to_string()
}

/// Passwords are taken verbatim; only presence is checked.
fn clean_password(errors: &mut FormErrors, field: &str, raw: &str) -> String {
    if raw.is_empty() {
        errors.add(field, REQUIRED);
    }
    raw.to_string()
}

fn clean_image(errors: &mut FormErrors, field: &str, file: Option<&UploadedFile>) -> Option<ImageFormat> {
    let file = file?;
    match sniff_image(&file.bytes) {
        Some(format) => Some(format),
        None => {
            errors.add(field, INVALID_IMAGE);
            None
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub text: String,
}

impl PostForm {
    pub fn validate(&self) -> Validated<String> {
        let mut errors = FormErrors::default();
        let text = clean_text(&mut errors, "text", &self.text, POST_MAX_CHARS, true);
        errors.finish(text)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Validated<String> {
        let mut errors = FormErrors::default();
        let text = clean_text(&mut errors, "text", &self.text, COMMENT_MAX_CHARS, true);
        errors.finish(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Where to go after a successful login.
    pub next: String,
}

impl LoginForm {
    pub fn validate(&self) -> Validated<Credentials> {
        let mut errors = FormErrors::default();
        let username = clean_text(
            &mut errors,
            "username",
            &self.username,
            USERNAME_MAX_CHARS,
            true,
        );
        let password = clean_password(&mut errors, "password", &self.password);
        errors.finish(Credentials { username, password })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
}

impl RegisterForm {
    /// Field checks plus the cross-field rules: the username must be free and
    /// the confirmation must match. The outer `Result` carries store failures.
    pub fn validate(&self, conn: &Connection) -> AppResult<Validated<Credentials>> {
        let mut errors = FormErrors::default();

        let username = clean_text(
            &mut errors,
            "username",
            &self.username,
            USERNAME_MAX_CHARS,
            true,
        );
        if !errors.has("username") {
            if !is_valid_username(&username) {
                errors.add("username", INVALID_USERNAME);
            } else if users::username_exists(conn, &username)? {
                errors.add("username", DUPLICATE_USERNAME);
            }
        }

        let password = clean_password(&mut errors, "password", &self.password);
        clean_password(
            &mut errors,
            "password_confirmation",
            &self.password_confirmation,
        );
        if !errors.has("password")
            && !errors.has("password_confirmation")
            && self.password != self.password_confirmation
        {
            errors.add("password_confirmation", PASSWORD_MISMATCH);
        }

        Ok(errors.finish(Credentials { username, password }))
    }
}

/// Usernames appear in profile URLs, so they are limited to word characters.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Raw profile edit input, as submitted or as pre-filled from the stored profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub avatar: Option<UploadedFile>,
}

/// A validated profile edit. The avatar still has to be stored before the
/// changes can be written.
#[derive(Debug, Clone)]
pub struct ProfileInput {
    pub changes: ProfileChanges,
    pub avatar: Option<(ImageFormat, UploadedFile)>,
}

impl ProfileForm {
    pub fn from_multipart(mut form: MultipartForm) -> Self {
        Self {
            first_name: form.text("first_name"),
            last_name: form.text("last_name"),
            gender: form.text("gender"),
            date_of_birth: form.text("date_of_birth"),
            avatar: form.take_file("avatar"),
        }
    }

    pub fn validate(&self) -> Validated<ProfileInput> {
        let mut errors = FormErrors::default();

        let first_name = clean_text(
            &mut errors,
            "first_name",
            &self.first_name,
            NAME_MAX_CHARS,
            false,
        );
        let last_name = clean_text(
            &mut errors,
            "last_name",
            &self.last_name,
            NAME_MAX_CHARS,
            false,
        );

        let gender_code = self.gender.trim();
        let gender = if gender_code.is_empty() {
            Gender::Unknown
        } else {
            Gender::from_code(gender_code).unwrap_or_else(|| {
                errors.add(
                    "gender",
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        gender_code
                    ),
                );
                Gender::Unknown
            })
        };

        let dob_raw = self.date_of_birth.trim();
        let date_of_birth = if dob_raw.is_empty() {
            None
        } else {
            let parsed = parse_date(dob_raw);
            if parsed.is_none() {
                errors.add("date_of_birth", INVALID_DATE);
            }
            parsed
        };

        let avatar = clean_image(&mut errors, "avatar", self.avatar.as_ref())
            .zip(self.avatar.clone());

        errors.finish(ProfileInput {
            changes: ProfileChanges {
                first_name,
                last_name,
                gender,
                date_of_birth,
                avatar_path: None,
            },
            avatar,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct GiftForm {
    pub message: String,
    pub snapshot: Option<UploadedFile>,
}

#[derive(Debug, Clone)]
pub struct GiftInput {
    pub message: String,
    pub snapshot: Option<(ImageFormat, UploadedFile)>,
}

impl GiftForm {
    pub fn from_multipart(mut form: MultipartForm) -> Self {
        Self {
            message: form.text("message"),
            snapshot: form.take_file("snapshot"),
        }
    }

    pub fn validate(&self) -> Validated<GiftInput> {
        let mut errors = FormErrors::default();
        let message = clean_text(&mut errors, "message", &self.message, GIFT_MAX_CHARS, true);
        let snapshot = clean_image(&mut errors, "snapshot", self.snapshot.as_ref())
            .zip(self.snapshot.clone());
        errors.finish(GiftInput { message, snapshot })
    }
}
