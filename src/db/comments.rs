use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::Comment;
use crate::error::AppResult;

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.author_id, u.username, c.text, c.created_at
    FROM comments c
    JOIN users u ON u.id = c.author_id";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row.get(3)?,
        text: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn create_comment(conn: &Connection, post_id: i64, author_id: i64, text: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO comments (post_id, author_id, text) VALUES (?1, ?2, ?3)",
        params![post_id, author_id, text],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_comment(conn: &Connection, id: i64) -> AppResult<Option<Comment>> {
    let comment = conn
        .query_row(
            &format!("{} WHERE c.id = ?1", COMMENT_SELECT),
            params![id],
            comment_from_row,
        )
        .optional()?;
    Ok(comment)
}

/// Comments on a post, oldest first.
pub fn list_for_post(conn: &Connection, post_id: i64) -> AppResult<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE c.post_id = ?1 ORDER BY c.created_at ASC, c.id ASC",
        COMMENT_SELECT
    ))?;
    let comments = stmt
        .query_map(params![post_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

pub fn update_comment_text(conn: &Connection, id: i64, text: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE comments SET text = ?2 WHERE id = ?1",
        params![id, text],
    )?;
    Ok(())
}

pub fn delete_comment(conn: &Connection, id: i64) -> AppResult<bool> {
    let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{posts, test_pool, users};

    #[test]
    fn comments_are_oldest_first_and_scoped_to_post() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();
        let post = posts::create_post(&conn, alice.id, "hi").unwrap();
        let other = posts::create_post(&conn, alice.id, "other").unwrap();

        let first = create_comment(&conn, post, alice.id, "one").unwrap();
        let second = create_comment(&conn, post, alice.id, "two").unwrap();
        create_comment(&conn, other, alice.id, "elsewhere").unwrap();
        conn.execute(
            "UPDATE comments SET created_at = '2030-01-01 00:00:00' WHERE id = ?1",
            params![first],
        )
        .unwrap();

        let ids: Vec<i64> = list_for_post(&conn, post)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn edit_and_delete_comment() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();
        let post = posts::create_post(&conn, alice.id, "hi").unwrap();
        let id = create_comment(&conn, post, alice.id, "typo").unwrap();

        update_comment_text(&conn, id, "fixed").unwrap();
        let comment = get_comment(&conn, id).unwrap().unwrap();
        assert_eq!(comment.text, "fixed");
        assert_eq!(comment.post_id, post);
        assert_eq!(comment.author_username, "alice");

        assert!(delete_comment(&conn, id).unwrap());
        assert!(get_comment(&conn, id).unwrap().is_none());
        assert!(posts::get_post(&conn, post).unwrap().is_some());
    }

    #[test]
    fn comment_on_missing_post_is_rejected() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();
        assert!(create_comment(&conn, 404, alice.id, "ghost").is_err());
    }
}
