use rusqlite::Connection;

use crate::app::Result;
use crate::domain::Stats;

pub(crate) fn stats(conn: &Connection) -> Result<Stats> {
    let stats = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM feeds),
            (SELECT COUNT(*) FROM feeds WHERE is_starred = 1),
            (SELECT COUNT(*) FROM entries),
            (SELECT COUNT(*) FROM entries WHERE is_read = 0),
            (SELECT COUNT(*) FROM entries WHERE is_read = 1),
            (SELECT COUNT(*) FROM entries WHERE is_bookmarked = 1),
            (SELECT COUNT(*) FROM tags)",
        [],
        |row| {
            Ok(Stats {
                feeds: row.get(0)?,
                starred_feeds: row.get(1)?,
                entries: row.get(2)?,
                unread_entries: row.get(3)?,
                read_entries: row.get(4)?,
                bookmarked_entries: row.get(5)?,
                tags: row.get(6)?,
            })
        },
    )?;
    Ok(stats)
}
