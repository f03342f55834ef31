use rusqlite::{params, Connection};

use crate::db::models::Gift;
use crate::error::AppResult;

pub fn create_gift(
    conn: &Connection,
    sender_id: i64,
    recipient_id: i64,
    message: &str,
    snapshot_path: Option<&str>,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO gifts (sender_id, recipient_id, message, snapshot_path)
         VALUES (?1, ?2, ?3, ?4)",
        params![sender_id, recipient_id, message, snapshot_path],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(gift_id = id, sender_id, recipient_id, "Gift sent");
    Ok(id)
}

/// Gifts received by a user, oldest first.
pub fn list_received(conn: &Connection, recipient_id: i64) -> AppResult<Vec<Gift>> {
    let mut stmt = conn.prepare(
        "SELECT g.id, g.sender_id, s.username, g.recipient_id, r.username,
                g.message, g.snapshot_path, g.created_at
         FROM gifts g
         JOIN users s ON s.id = g.sender_id
         JOIN users r ON r.id = g.recipient_id
         WHERE g.recipient_id = ?1
         ORDER BY g.created_at ASC, g.id ASC",
    )?;
    let gifts = stmt
        .query_map(params![recipient_id], |row| {
            Ok(Gift {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                sender_username: row.get(2)?,
                recipient_id: row.get(3)?,
                recipient_username: row.get(4)?,
                message: row.get(5)?,
                snapshot_path: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(gifts)
}
