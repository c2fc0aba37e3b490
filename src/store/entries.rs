//! Entry rows: the entry upsert, annotation edits and entry queries.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::app::{BrookError, Result};
use crate::domain::{Entry, EntryEdit, EntryId, FeedId};
use crate::parser::ParsedItem;
use crate::util::non_empty;

use super::record::{decode_dt, encode_dt, entry_from_row, to_id, ENTRY_COLUMNS, ENTRY_ORDER};

/// What an upsert did to one entry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Upserted {
    Inserted(EntryId),
    /// The upstream update time changed; the row was rewritten and marked unread.
    Updated(EntryId),
    Unchanged(EntryId),
}

impl Upserted {
    /// The id of a row this upsert created or rewrote.
    pub(crate) fn changed(self) -> Option<EntryId> {
        match self {
            Upserted::Inserted(id) | Upserted::Updated(id) => Some(id),
            Upserted::Unchanged(_) => None,
        }
    }
}

/// Upserts every parsed item of one feed, keyed by `(feed_id, external_id)`.
///
/// Items without an external id cannot be matched on a later pull and are
/// skipped.
pub(crate) fn upsert_entries(
    conn: &Connection,
    feed_id: FeedId,
    items: &[ParsedItem],
) -> Result<Vec<Upserted>> {
    let mut outcomes = Vec::with_capacity(items.len());
    for item in items {
        if item.external_id.is_empty() {
            tracing::debug!("Skipping item without id in feed {}", feed_id);
            continue;
        }
        outcomes.push(upsert_entry(conn, feed_id, item)?);
    }
    Ok(outcomes)
}

fn upsert_entry(conn: &Connection, feed_id: FeedId, item: &ParsedItem) -> Result<Upserted> {
    let update_time = item.effective_update_time();
    let pub_time = item.effective_pub_time();

    let inserted = conn
        .execute(
            "INSERT INTO entries (feed_id, external_id, title, url, description, content,
                                  pub_time, update_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                feed_id,
                item.external_id,
                item.title,
                non_empty(&item.link),
                non_empty(&item.description),
                non_empty(&item.content),
                pub_time.map(encode_dt),
                update_time.map(encode_dt),
            ],
        )
        .map_err(BrookError::from_sqlite);

    match inserted {
        Ok(_) => Ok(Upserted::Inserted(to_id(conn.last_insert_rowid())?)),
        Err(BrookError::UniqueViolation) => {
            let (id, stored): (EntryId, Option<String>) = conn.query_row(
                "SELECT id, update_time FROM entries WHERE feed_id = ?1 AND external_id = ?2",
                params![feed_id, item.external_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let stored = stored
                .as_deref()
                .map(decode_dt)
                .transpose()
                .map_err(|e| BrookError::Internal(format!("entry {id} has a bad update_time: {e}")))?;

            if stored == update_time {
                return Ok(Upserted::Unchanged(id));
            }

            conn.execute(
                "UPDATE entries SET title = ?1, url = ?2, description = ?3, content = ?4,
                        pub_time = ?5, update_time = ?6, is_read = 0
                 WHERE id = ?7",
                params![
                    item.title,
                    non_empty(&item.link),
                    non_empty(&item.description),
                    non_empty(&item.content),
                    pub_time.map(encode_dt),
                    update_time.map(encode_dt),
                    id,
                ],
            )?;
            Ok(Upserted::Updated(id))
        }
        Err(e) => Err(e),
    }
}

/// Applies each edit in order and returns the resulting rows in the same order.
pub(crate) fn edit_entries(conn: &Connection, edits: &[EntryEdit]) -> Result<Vec<Entry>> {
    for edit in edits {
        get_entry(conn, edit.id)?;

        if let Some(is_read) = edit.is_read {
            conn.execute(
                "UPDATE entries SET is_read = ?1 WHERE id = ?2",
                params![is_read, edit.id],
            )?;
        }
        if let Some(is_bookmarked) = edit.is_bookmarked {
            conn.execute(
                "UPDATE entries SET is_bookmarked = ?1 WHERE id = ?2",
                params![is_bookmarked, edit.id],
            )?;
        }
    }
    edits.iter().map(|edit| get_entry(conn, edit.id)).collect()
}

pub(crate) fn get_entry(conn: &Connection, id: EntryId) -> Result<Entry> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.id = ?1");
    conn.query_row(&sql, params![id], entry_from_row)
        .optional()?
        .ok_or(BrookError::EntryNotFound(id))
}

/// Entries of `feed_ids` (every feed when empty), filtered by read state when
/// `is_read` is given, newest first.
pub(crate) fn list_entries(
    conn: &Connection,
    feed_ids: &[FeedId],
    is_read: Option<bool>,
) -> Result<Vec<Entry>> {
    let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE 1 = 1");
    let mut args: Vec<Value> = Vec::new();

    if !feed_ids.is_empty() {
        sql.push_str(&format!(" AND e.feed_id IN ({})", placeholders(feed_ids.len())));
        args.extend(feed_ids.iter().map(|&id| Value::Integer(i64::from(id))));
    }
    if let Some(is_read) = is_read {
        sql.push_str(" AND e.is_read = ?");
        args.push(Value::Integer(i64::from(is_read)));
    }
    sql.push_str(&format!(" ORDER BY {ENTRY_ORDER}"));

    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params_from_iter(args), entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// The still-unread rows among `ids`, newest first.
pub(crate) fn unread_among(conn: &Connection, ids: &[EntryId]) -> Result<Vec<Entry>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.is_read = 0 AND e.id IN ({}) ORDER BY {ENTRY_ORDER}",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params_from_iter(ids.iter()), entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(entries)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn test_changed_ids() {
        assert_eq!(Upserted::Inserted(1).changed(), Some(1));
        assert_eq!(Upserted::Updated(2).changed(), Some(2));
        assert_eq!(Upserted::Unchanged(3).changed(), None);
    }
}
