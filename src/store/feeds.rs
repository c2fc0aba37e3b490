//! Feed rows: the feed upsert, partial edits, deletion and feed queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};

use crate::app::{BrookError, Result};
use crate::domain::{Entry, Feed, FeedEdit, FeedId, NewFeed};
use crate::parser::ParsedFeed;
use crate::util::{dedup, non_empty};

use super::entries;
use super::record::{encode_dt, feed_from_row, to_id, FEED_COLUMNS, FEED_ORDER};
use super::tags;

/// Inserts `feed`, or edits the existing row with the same URL.
///
/// On insert, caller-supplied fields win over `parsed` ones and the title
/// falls back to the URL. On conflict only the caller-supplied fields are
/// applied; `sub_time`, `last_pull_time` and `update_time` keep their values.
/// Returns the feed id and whether the row was created.
pub(crate) fn upsert_feed(
    conn: &Connection,
    feed: &NewFeed,
    parsed: Option<&ParsedFeed>,
    now: DateTime<Utc>,
) -> Result<(FeedId, bool)> {
    let title = feed
        .title
        .as_deref()
        .and_then(non_empty)
        .or_else(|| parsed.and_then(|p| non_empty(&p.title)))
        .unwrap_or_else(|| feed.url.clone());
    let description = feed
        .description
        .clone()
        .or_else(|| parsed.and_then(|p| non_empty(&p.description)));
    let site_url = feed
        .site_url
        .clone()
        .or_else(|| parsed.and_then(|p| non_empty(&p.site_link)));
    let update_time = parsed.and_then(|p| p.effective_update_time());
    let sub_time = encode_dt(now);

    let inserted = conn
        .execute(
            "INSERT INTO feeds (feed_url, title, description, site_url, is_starred,
                                sub_time, update_time, last_pull_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6)",
            params![
                feed.url,
                title,
                description,
                site_url,
                feed.is_starred.unwrap_or(false),
                sub_time,
                update_time.map(encode_dt),
            ],
        )
        .map_err(BrookError::from_sqlite);

    match inserted {
        Ok(_) => Ok((to_id(conn.last_insert_rowid())?, true)),
        Err(BrookError::UniqueViolation) => {
            let id = feed_id_by_url(conn, &feed.url)?
                .ok_or_else(|| BrookError::Internal(format!("feed {} vanished", feed.url)))?;
            let edit = FeedEdit {
                id,
                title: feed.title.as_deref().and_then(non_empty),
                description: feed.description.clone(),
                site_url: feed.site_url.clone(),
                is_starred: feed.is_starred,
                ..Default::default()
            };
            apply_edit(conn, &edit)?;
            Ok((id, false))
        }
        Err(e) => Err(e),
    }
}

fn feed_id_by_url(conn: &Connection, url: &str) -> Result<Option<FeedId>> {
    let id = conn
        .query_row("SELECT id FROM feeds WHERE feed_url = ?1", params![url], |row| row.get(0))
        .optional()?;
    Ok(id)
}

pub(crate) fn ensure_feed(conn: &Connection, id: FeedId) -> Result<()> {
    let exists = conn
        .query_row("SELECT 1 FROM feeds WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    exists.ok_or(BrookError::FeedNotFound(id))
}

fn set_column(conn: &Connection, id: FeedId, column: &str, value: &dyn ToSql) -> Result<()> {
    let sql = format!("UPDATE feeds SET {column} = ?1 WHERE id = ?2");
    let changed = conn
        .execute(&sql, params![value, id])
        .map_err(BrookError::from_sqlite)?;
    if changed == 0 {
        return Err(BrookError::FeedNotFound(id));
    }
    Ok(())
}

/// Applies every present field of `edit` to its row.
pub(crate) fn apply_edit(conn: &Connection, edit: &FeedEdit) -> Result<()> {
    ensure_feed(conn, edit.id)?;

    if let Some(ref title) = edit.title {
        if title.trim().is_empty() {
            return Err(BrookError::Invalid("feed title must not be empty".into()));
        }
        set_column(conn, edit.id, "title", title)?;
    }
    if let Some(ref url) = edit.feed_url {
        if url.trim().is_empty() {
            return Err(BrookError::Invalid("feed url must not be empty".into()));
        }
        set_column(conn, edit.id, "feed_url", url).map_err(|e| match e {
            BrookError::UniqueViolation => {
                BrookError::Invalid(format!("feed url {url} is already subscribed"))
            }
            e => e,
        })?;
    }
    if let Some(ref description) = edit.description {
        set_column(conn, edit.id, "description", description)?;
    }
    if let Some(ref site_url) = edit.site_url {
        set_column(conn, edit.id, "site_url", site_url)?;
    }
    if let Some(is_starred) = edit.is_starred {
        set_column(conn, edit.id, "is_starred", &is_starred)?;
    }
    if let Some(ref tags) = edit.tags {
        tags::set_feed_tags(conn, edit.id, tags)?;
    }

    Ok(())
}

/// Applies `edits` in order and returns the resulting rows in the same order.
pub(crate) fn edit_feeds(conn: &Connection, edits: &[FeedEdit]) -> Result<Vec<Feed>> {
    for edit in edits {
        apply_edit(conn, edit)?;
    }
    edits.iter().map(|edit| get_feed(conn, edit.id)).collect()
}

/// Deletes every id; any unknown id fails the whole call.
pub(crate) fn delete_feeds(conn: &Connection, ids: &[FeedId]) -> Result<usize> {
    let ids = dedup(ids);
    for &id in &ids {
        let deleted = conn.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(BrookError::FeedNotFound(id));
        }
    }
    tags::gc_tags(conn)?;
    Ok(ids.len())
}

/// Stamps a successful pull on the feed row.
pub(crate) fn record_pull(
    conn: &Connection,
    id: FeedId,
    update_time: Option<DateTime<Utc>>,
    pulled_at: DateTime<Utc>,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE feeds SET update_time = ?1, last_pull_time = ?2 WHERE id = ?3",
        params![update_time.map(encode_dt), encode_dt(pulled_at), id],
    )?;
    if changed == 0 {
        return Err(BrookError::FeedNotFound(id));
    }
    Ok(())
}

/// The feed row with its tags; entries are not loaded.
pub(crate) fn get_feed(conn: &Connection, id: FeedId) -> Result<Feed> {
    let sql = format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.id = ?1");
    conn.query_row(&sql, params![id], feed_from_row)
        .optional()?
        .ok_or(BrookError::FeedNotFound(id))
}

/// The feed with its tags and all its entries.
pub(crate) fn get_feed_with_entries(conn: &Connection, id: FeedId) -> Result<Feed> {
    let mut feed = get_feed(conn, id)?;
    feed.entries = entries::list_entries(conn, &[id], None)?;
    Ok(feed)
}

/// All feeds, most recently updated first, without entries.
pub(crate) fn list_feeds(conn: &Connection) -> Result<Vec<Feed>> {
    let sql = format!("SELECT {FEED_COLUMNS} FROM feeds f ORDER BY {FEED_ORDER}");
    let mut stmt = conn.prepare(&sql)?;
    let feeds = stmt
        .query_map([], feed_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(feeds)
}

/// All feeds with their entries inlined.
pub(crate) fn list_feeds_with_entries(conn: &Connection) -> Result<Vec<Feed>> {
    let mut by_feed: HashMap<FeedId, Vec<Entry>> = HashMap::new();
    for entry in entries::list_entries(conn, &[], None)? {
        by_feed.entry(entry.feed_id).or_default().push(entry);
    }

    let mut feeds = list_feeds(conn)?;
    for feed in &mut feeds {
        feed.entries = by_feed.remove(&feed.id).unwrap_or_default();
    }
    Ok(feeds)
}

/// Resolves a pull working set to `(id, feed_url)` pairs.
///
/// An empty `ids` selects every feed; unknown ids are an error.
pub(crate) fn pull_targets(conn: &Connection, ids: &[FeedId]) -> Result<Vec<(FeedId, String)>> {
    if ids.is_empty() {
        let mut stmt = conn.prepare("SELECT id, feed_url FROM feeds ORDER BY id")?;
        let targets = stmt
            .query_map([], |row| Ok((row.get::<_, FeedId>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        return Ok(targets);
    }

    dedup(ids)
        .into_iter()
        .map(|id| {
            conn.query_row("SELECT feed_url FROM feeds WHERE id = ?1", params![id], |row| {
                row.get::<_, String>(0)
            })
            .optional()?
            .map(|url| (id, url))
            .ok_or(BrookError::FeedNotFound(id))
        })
        .collect()
}
