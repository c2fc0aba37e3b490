//! Subscription import (bulk upsert without fetching) and export.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::app::{BrookError, Result};
use crate::domain::{NewFeed, Subscription, SubscriptionFeed};

use super::{feeds, tags};

pub(crate) const EXPORT_TITLE: &str = "brook subscriptions";

/// Upserts every document feed. Returns `(processed, imported)`, where
/// `imported` counts the feeds that did not exist before.
pub(crate) fn import(
    conn: &Connection,
    document: &Subscription,
    now: DateTime<Utc>,
) -> Result<(usize, usize)> {
    let mut imported = 0;

    for doc_feed in &document.feeds {
        if doc_feed.feed_url.trim().is_empty() {
            return Err(BrookError::Invalid(format!(
                "subscription feed {:?} has no url",
                doc_feed.title
            )));
        }
        url::Url::parse(&doc_feed.feed_url).map_err(|e| {
            BrookError::Invalid(format!("feed url {:?}: {}", doc_feed.feed_url, e))
        })?;

        let feed = NewFeed::from(doc_feed);
        let (id, added) = feeds::upsert_feed(conn, &feed, None, now)?;
        tags::set_feed_tags(conn, id, &feed.tags)?;
        if added {
            imported += 1;
        }
    }

    Ok((document.feeds.len(), imported))
}

/// Every feed with its tags, in listing order.
pub(crate) fn export(conn: &Connection) -> Result<Subscription> {
    let feeds = feeds::list_feeds(conn)?
        .into_iter()
        .map(|feed| SubscriptionFeed {
            feed_url: feed.feed_url,
            title: feed.title,
            site_url: feed.site_url,
            description: feed.description,
            is_starred: Some(feed.is_starred),
            tags: feed.tags,
        })
        .collect();

    Ok(Subscription {
        title: Some(EXPORT_TITLE.to_string()),
        feeds,
    })
}
