use thiserror::Error;

use crate::domain::{EntryId, FeedId};

#[derive(Error, Debug)]
pub enum BrookError {
    #[error("feed not found: {0}")]
    FeedNotFound(FeedId),

    #[error("entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("invalid id: {0:?}")]
    InvalidId(String),

    #[error("invalid argument: {0}")]
    Invalid(String),

    #[error("parse failed for {url}: {source}")]
    ParseFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("canceled")]
    Canceled,

    /// Per-feed failures of a pull batch, joined by the caller.
    #[error("{} of {total} feeds failed to pull", .failures.len())]
    PullFailed {
        total: usize,
        failures: Vec<(String, BrookError)>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OPML error: {0}")]
    Opml(#[from] opml::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// An inner error prefixed with the name of the operation that failed.
    #[error("{op}: {source}")]
    Op {
        op: &'static str,
        #[source]
        source: Box<BrookError>,
    },
}

impl BrookError {
    pub fn parse_failed(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ParseFailed {
            url: url.into(),
            source: source.into(),
        }
    }

    /// The innermost error once every operation prefix is stripped.
    pub fn root(&self) -> &BrookError {
        let mut err = self;
        while let BrookError::Op { source, .. } = err {
            err = source;
        }
        err
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self.root(), BrookError::Canceled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            BrookError::FeedNotFound(_) | BrookError::EntryNotFound(_)
        )
    }

    /// Classifies SQLite unique-constraint failures so upserts can branch on them.
    pub(crate) fn from_sqlite(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                BrookError::UniqueViolation
            }
            _ => BrookError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrookError>;

/// Prefixes errors with the operation that produced them.
pub trait ResultExt<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T, E: Into<BrookError>> ResultExt<T> for std::result::Result<T, E> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|e| BrookError::Op {
            op,
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_prefix_in_message() {
        let err: Result<()> = Err(BrookError::FeedNotFound(99));
        let err = err.op("DeleteFeeds").unwrap_err();
        assert_eq!(err.to_string(), "DeleteFeeds: feed not found: 99");
    }

    #[test]
    fn test_root_walks_nested_prefixes() {
        let err: Result<()> = Err(BrookError::Canceled);
        let err = err.op("inner").op("outer").unwrap_err();
        assert!(matches!(err.root(), BrookError::Canceled));
        assert!(err.is_canceled());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_parse_failed_keeps_cause() {
        let err = BrookError::parse_failed("http://a.com/feed.xml", "bad xml");
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "bad xml");
        assert!(err.to_string().contains("http://a.com/feed.xml"));
    }

    #[test]
    fn test_pull_failed_counts_failures() {
        let err = BrookError::PullFailed {
            total: 3,
            failures: vec![
                ("http://a.com/feed.xml".into(), BrookError::Canceled),
                ("http://b.com/feed.xml".into(), BrookError::Canceled),
            ],
        };
        assert_eq!(err.to_string(), "2 of 3 feeds failed to pull");
    }

    #[test]
    fn test_other_sqlite_errors_stay_database() {
        let err = BrookError::from_sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, BrookError::Database(_)));
    }
}
