use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::Post;
use crate::error::AppResult;

const POST_SELECT: &str = "
    SELECT p.id, p.author_id, u.username, p.text, p.created_at,
           (SELECT COUNT(*) FROM post_likers l WHERE l.post_id = p.id),
           (SELECT COUNT(*) FROM post_dislikers d WHERE d.post_id = p.id),
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)
    FROM posts p
    JOIN users u ON u.id = p.author_id";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
        like_count: row.get(5)?,
        dislike_count: row.get(6)?,
        comment_count: row.get(7)?,
    })
}

pub fn create_post(conn: &Connection, author_id: i64, text: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO posts (author_id, text) VALUES (?1, ?2)",
        params![author_id, text],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_post(conn: &Connection, id: i64) -> AppResult<Option<Post>> {
    let post = conn
        .query_row(
            &format!("{} WHERE p.id = ?1", POST_SELECT),
            params![id],
            post_from_row,
        )
        .optional()?;
    Ok(post)
}

/// All posts, newest first.
pub fn list_posts(conn: &Connection) -> AppResult<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY p.created_at DESC, p.id DESC",
        POST_SELECT
    ))?;
    let posts = stmt
        .query_map([], post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn update_post_text(conn: &Connection, id: i64, text: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE posts SET text = ?2 WHERE id = ?1",
        params![id, text],
    )?;
    Ok(())
}

/// Hard delete. Comments and reactions go with it through `ON DELETE CASCADE`.
pub fn delete_post(conn: &Connection, id: i64) -> AppResult<bool> {
    let deleted = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Set insert; liking twice leaves one membership row.
pub fn add_liker(conn: &Connection, post_id: i64, user_id: i64) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO post_likers (post_id, user_id) VALUES (?1, ?2)",
        params![post_id, user_id],
    )?;
    Ok(())
}

/// Set insert. Does not touch `post_likers`.
pub fn add_disliker(conn: &Connection, post_id: i64, user_id: i64) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO post_dislikers (post_id, user_id) VALUES (?1, ?2)",
        params![post_id, user_id],
    )?;
    Ok(())
}

pub fn likers(conn: &Connection, post_id: i64) -> AppResult<Vec<String>> {
    reaction_usernames(conn, "post_likers", post_id)
}

pub fn dislikers(conn: &Connection, post_id: i64) -> AppResult<Vec<String>> {
    reaction_usernames(conn, "post_dislikers", post_id)
}

fn reaction_usernames(conn: &Connection, table: &str, post_id: i64) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT u.username FROM {} r JOIN users u ON u.id = r.user_id
         WHERE r.post_id = ?1 ORDER BY u.username",
        table
    ))?;
    let names = stmt
        .query_map(params![post_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{comments, test_pool, users};

    #[test]
    fn list_posts_is_newest_first() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();

        let first = create_post(&conn, alice.id, "first").unwrap();
        let second = create_post(&conn, alice.id, "second").unwrap();
        conn.execute(
            "UPDATE posts SET created_at = '2020-01-01 00:00:00' WHERE id = ?1",
            params![second],
        )
        .unwrap();
        let third = create_post(&conn, alice.id, "third").unwrap();

        let ids: Vec<i64> = list_posts(&conn).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![third, first, second]);
    }

    #[test]
    fn same_second_posts_order_by_id() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();
        let a = create_post(&conn, alice.id, "a").unwrap();
        let b = create_post(&conn, alice.id, "b").unwrap();
        conn.execute("UPDATE posts SET created_at = '2024-05-05 10:00:00'", [])
            .unwrap();

        let posts = list_posts(&conn).unwrap();
        assert_eq!(posts[0].id, b);
        assert_eq!(posts[1].id, a);
        assert_eq!(posts[0].author_username, "alice");
    }

    #[test]
    fn liking_twice_keeps_one_membership() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();
        let post = create_post(&conn, alice.id, "hi").unwrap();

        add_liker(&conn, post, alice.id).unwrap();
        add_liker(&conn, post, alice.id).unwrap();

        assert_eq!(likers(&conn, post).unwrap(), vec!["alice".to_string()]);
        assert_eq!(get_post(&conn, post).unwrap().unwrap().like_count, 1);
    }

    #[test]
    fn like_and_dislike_are_independent_sets() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();
        let post = create_post(&conn, alice.id, "hi").unwrap();

        add_liker(&conn, post, alice.id).unwrap();
        add_disliker(&conn, post, alice.id).unwrap();

        let post = get_post(&conn, post).unwrap().unwrap();
        assert_eq!((post.like_count, post.dislike_count), (1, 1));
        assert_eq!(dislikers(&conn, post.id).unwrap(), vec!["alice".to_string()]);
    }

    #[test]
    fn delete_post_cascades_to_comments_and_reactions() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();
        let bob = users::create_user(&mut conn, "bob", "h").unwrap();
        let post = create_post(&conn, alice.id, "hi").unwrap();
        comments::create_comment(&conn, post, bob.id, "nice").unwrap();
        comments::create_comment(&conn, post, alice.id, "thanks").unwrap();
        add_liker(&conn, post, bob.id).unwrap();
        add_disliker(&conn, post, alice.id).unwrap();

        assert!(delete_post(&conn, post).unwrap());
        assert!(get_post(&conn, post).unwrap().is_none());

        for table in ["comments", "post_likers", "post_dislikers"] {
            let remaining: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {} WHERE post_id = ?1", table),
                    params![post],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(remaining, 0, "{} not cleaned up", table);
        }
        assert!(!delete_post(&conn, post).unwrap());
    }

    #[test]
    fn update_post_text_changes_only_text() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = users::create_user(&mut conn, "alice", "h").unwrap();
        let id = create_post(&conn, alice.id, "draft").unwrap();
        let before = get_post(&conn, id).unwrap().unwrap();

        update_post_text(&conn, id, "final").unwrap();

        let after = get_post(&conn, id).unwrap().unwrap();
        assert_eq!(after.text, "final");
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.author_id, alice.id);
    }
}
