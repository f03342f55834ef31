use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::parse_and_format_time;

/// Served when a profile has no avatar or a gift has no snapshot.
pub const DEFAULT_AVATAR_URL: &str = "/assets/img/default-avatar.svg";

/// URL prefix under which the media root is served.
pub const MEDIA_URL: &str = "/media";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Unknown,
    Female,
    Male,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Unknown, Gender::Female, Gender::Male];

    /// Single-character code stored in the database and used as the form value.
    pub fn code(self) -> &'static str {
        match self {
            Gender::Unknown => "-",
            Gender::Female => "F",
            Gender::Male => "M",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Unknown => "Unknown",
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }

    pub fn from_code(code: &str) -> Option<Gender> {
        Gender::ALL.into_iter().find(|g| g.code() == code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub avatar_path: Option<String>,
}

impl Profile {
    pub fn avatar_url(&self) -> String {
        media_url_or_default(self.avatar_path.as_deref())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn date_of_birth_display(&self) -> String {
        self.date_of_birth
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Fields a profile edit may change. `avatar_path: None` keeps the current avatar.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub avatar_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created_at: String,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
}

impl Post {
    pub fn created_ago(&self) -> String {
        parse_and_format_time(&self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created_at: String,
}

impl Comment {
    pub fn created_ago(&self) -> String {
        parse_and_format_time(&self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gift {
    pub id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub recipient_id: i64,
    pub recipient_username: String,
    pub message: String,
    pub snapshot_path: Option<String>,
    pub created_at: String,
}

impl Gift {
    pub fn created_ago(&self) -> String {
        parse_and_format_time(&self.created_at)
    }

    pub fn snapshot_url(&self) -> String {
        media_url_or_default(self.snapshot_path.as_deref())
    }
}

fn media_url_or_default(path: Option<&str>) -> String {
    match path {
        Some(p) => format!("{}/{}", MEDIA_URL, p),
        None => DEFAULT_AVATAR_URL.to_string(),
    }
}
