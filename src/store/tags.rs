//! Tag setters. Tags are addressed by name and garbage-collected once no
//! feed references them.

use rusqlite::{params, Connection};

use crate::app::Result;
use crate::domain::FeedId;
use crate::util::clean_tags;

pub(crate) fn feed_tags(conn: &Connection, feed_id: FeedId) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM feed_tags ft JOIN tags t ON t.id = ft.tag_id
         WHERE ft.feed_id = ?1 ORDER BY t.name",
    )?;
    let tags = stmt
        .query_map(params![feed_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(tags)
}

/// Replaces the feed's tag set with `tags` and drops tags left unreferenced.
///
/// Only the difference is written, so replacing a set with itself leaves the
/// join table untouched.
pub(crate) fn set_feed_tags(conn: &Connection, feed_id: FeedId, tags: &[String]) -> Result<()> {
    let wanted = clean_tags(tags);
    let current = feed_tags(conn, feed_id)?;

    for name in current.iter().filter(|t| !wanted.contains(t)) {
        conn.execute(
            "DELETE FROM feed_tags
             WHERE feed_id = ?1 AND tag_id = (SELECT id FROM tags WHERE name = ?2)",
            params![feed_id, name],
        )?;
    }

    for name in wanted.iter().filter(|t| !current.contains(t)) {
        conn.execute(
            "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            params![name],
        )?;
        conn.execute(
            "INSERT INTO feed_tags (feed_id, tag_id) SELECT ?1, id FROM tags WHERE name = ?2",
            params![feed_id, name],
        )?;
    }

    gc_tags(conn)?;
    Ok(())
}

/// Deletes tags no feed refers to. Returns how many were removed.
pub(crate) fn gc_tags(conn: &Connection) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM tags WHERE id NOT IN (SELECT tag_id FROM feed_tags)",
        [],
    )?;
    if removed > 0 {
        tracing::debug!("Removed {} orphaned tags", removed);
    }
    Ok(removed)
}

pub(crate) fn list_tags(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM tags ORDER BY name")?;
    let tags = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(tags)
}
