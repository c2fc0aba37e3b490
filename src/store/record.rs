//! Row <-> domain mapping.
//!
//! Timestamps are stored as RFC 3339 UTC strings with nanosecond precision,
//! which keeps lexical and chronological order identical.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::app::{BrookError, Result};
use crate::domain::{Entry, Feed};

/// Feed columns with the tag names aggregated into a JSON array, sorted.
pub(crate) const FEED_COLUMNS: &str = "f.id, f.feed_url, f.title, f.description, f.site_url,
    f.is_starred, f.sub_time, f.update_time, f.last_pull_time,
    (SELECT json_group_array(name) FROM (
        SELECT t.name FROM feed_tags ft JOIN tags t ON t.id = ft.tag_id
        WHERE ft.feed_id = f.id ORDER BY t.name
    )) AS tags";

pub(crate) const ENTRY_COLUMNS: &str = "e.id, e.feed_id, e.external_id, e.title, e.url,
    e.description, e.content, e.pub_time, e.update_time, e.is_read, e.is_bookmarked";

pub(crate) const FEED_ORDER: &str = "coalesce(f.update_time, f.sub_time) DESC, f.id DESC";

pub(crate) const ENTRY_ORDER: &str = "coalesce(e.update_time, e.pub_time) DESC, e.id DESC";

pub(crate) fn encode_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_dt(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Converts a SQLite rowid into a 32-bit id.
pub(crate) fn to_id(rowid: i64) -> Result<u32> {
    u32::try_from(rowid).map_err(|_| BrookError::Internal(format!("row id {rowid} out of range")))
}

fn dt_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    decode_dt(&s).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_dt_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| {
            decode_dt(&s)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

/// Maps a row selected with [`FEED_COLUMNS`]. Entries are left empty.
pub(crate) fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
    let tags: String = row.get(9)?;
    let tags: Vec<String> = serde_json::from_str(&tags)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

    Ok(Feed {
        id: row.get(0)?,
        feed_url: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        site_url: row.get(4)?,
        is_starred: row.get(5)?,
        sub_time: dt_col(row, 6)?,
        update_time: opt_dt_col(row, 7)?,
        last_pull_time: dt_col(row, 8)?,
        tags,
        entries: Vec::new(),
    })
}

/// Maps a row selected with [`ENTRY_COLUMNS`].
pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        external_id: row.get(2)?,
        title: row.get(3)?,
        url: row.get(4)?,
        description: row.get(5)?,
        content: row.get(6)?,
        pub_time: opt_dt_col(row, 7)?,
        update_time: opt_dt_col(row, 8)?,
        is_read: row.get(9)?,
        is_bookmarked: row.get(10)?,
    })
}
