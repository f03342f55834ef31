use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

/// The user a live session token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
}

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: i64, hours: u64) -> Result<String, rusqlite::Error> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Resolve an unexpired session token to its user.
pub fn lookup_session(conn: &Connection, token: &str) -> Result<Option<SessionUser>, rusqlite::Error> {
    conn.query_row(
        "SELECT u.id, u.username FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            Ok(SessionUser {
                user_id: row.get(0)?,
                username: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop every expired session. Returns how many were removed.
pub fn purge_expired(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )
}

pub fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

pub fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, users};

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn session_round_trip() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();

        let token = create_session(&conn, alice.id, 1).unwrap();
        assert_eq!(
            lookup_session(&conn, &token).unwrap(),
            Some(SessionUser {
                user_id: alice.id,
                username: "alice".into()
            })
        );

        delete_session(&conn, &token).unwrap();
        assert_eq!(lookup_session(&conn, &token).unwrap(), None);
    }

    #[test]
    fn expired_sessions_do_not_resolve_and_are_purged() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();
        let token = create_session(&conn, alice.id, 1).unwrap();
        conn.execute(
            "UPDATE sessions SET expires_at = datetime('now', '-1 hours')",
            [],
        )
        .unwrap();

        assert_eq!(lookup_session(&conn, &token).unwrap(), None);
        assert_eq!(purge_expired(&conn).unwrap(), 1);
    }

    #[test]
    fn cookies_carry_name_and_lifetime() {
        assert_eq!(
            session_cookie("fb_session", "abc", 2),
            "fb_session=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=7200"
        );
        assert!(clear_session_cookie("fb_session").contains("Max-Age=0"));
    }
}
