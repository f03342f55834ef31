use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Gender, Profile, ProfileChanges, User};
use crate::error::AppResult;

const USER_COLUMNS: &str = "id, username, password_hash, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Insert a user and its empty profile in one transaction.
pub fn create_user(conn: &mut Connection, username: &str, password_hash: &str) -> AppResult<User> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
        params![username, password_hash],
    )?;
    let user_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO profiles (user_id) VALUES (?1)",
        params![user_id],
    )?;
    let user = tx.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![user_id],
        user_from_row,
    )?;
    tx.commit()?;

    tracing::info!(user_id, username, "Created user");
    Ok(user)
}

pub fn find_by_username(conn: &Connection, username: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            params![username],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn username_exists(conn: &Connection, username: &str) -> AppResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn get_profile(conn: &Connection, username: &str) -> AppResult<Option<Profile>> {
    let profile = conn
        .query_row(
            "SELECT u.id, u.username, p.first_name, p.last_name, p.gender, p.date_of_birth, p.avatar_path
             FROM users u
             JOIN profiles p ON p.user_id = u.id
             WHERE u.username = ?1",
            params![username],
            |row| {
                let gender: String = row.get(4)?;
                Ok(Profile {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    gender: Gender::from_code(&gender).unwrap_or_default(),
                    date_of_birth: row.get(5)?,
                    avatar_path: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(profile)
}

pub fn update_profile(conn: &Connection, user_id: i64, changes: &ProfileChanges) -> AppResult<()> {
    conn.execute(
        "UPDATE profiles
         SET first_name = ?2, last_name = ?3, gender = ?4, date_of_birth = ?5,
             avatar_path = COALESCE(?6, avatar_path)
         WHERE user_id = ?1",
        params![
            user_id,
            changes.first_name,
            changes.last_name,
            changes.gender.code(),
            changes.date_of_birth,
            changes.avatar_path,
        ],
    )?;
    Ok(())
}
