//! Forward-only schema migrations, applied on open.
//!
//! The applied version lives in SQLite's `user_version`, managed by
//! `rusqlite_migration`.

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::app::Result;

pub(crate) fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(include_str!("../../migrations/001-initial/up.sql"))
            .down(include_str!("../../migrations/001-initial/down.sql")),
        M::up(include_str!("../../migrations/002-ordering-indexes/up.sql"))
            .down(include_str!("../../migrations/002-ordering-indexes/down.sql")),
    ])
}

/// Migrates `conn` to the latest schema version.
///
/// Fails when the file was written by a newer schema than this build knows.
pub(crate) fn run(conn: &mut Connection) -> Result<()> {
    migrations().to_latest(conn)?;
    Ok(())
}
