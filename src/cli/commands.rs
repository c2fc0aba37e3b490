use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, BrookError, Result};
use crate::daemon::{parse_interval, Daemon};
use crate::domain::{Entry, EntryEdit, EntryId, FeedEdit, FeedId, NewFeed, PullStatus};
use crate::opml;
use crate::store::Store;

pub async fn add_feed(ctx: &AppContext, cancel: &CancellationToken, feed: NewFeed) -> Result<()> {
    let (feed, added) = ctx.store.add_feed(cancel, feed).await?;
    println!(
        "{} feed {}: {}",
        if added { "Added" } else { "Updated" },
        feed.id,
        feed.display_title()
    );
    println!("  {} entries, {} unread", feed.entries.len(), feed.unread_count());
    Ok(())
}

pub async fn remove_feeds(ctx: &AppContext, cancel: &CancellationToken, ids: Vec<FeedId>) -> Result<()> {
    let count = ids.len();
    ctx.store.delete_feeds(cancel, ids).await?;
    println!("Removed {} feed(s)", count);
    Ok(())
}

pub async fn list_feeds(ctx: &AppContext, cancel: &CancellationToken) -> Result<()> {
    let feeds = ctx.store.list_feeds(cancel).await?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let star = if feed.is_starred { "*" } else { " " };
        println!(
            "{}{:>4} {} ({} unread)\n      {}",
            star,
            feed.id,
            feed.display_title(),
            feed.unread_count(),
            feed.feed_url
        );
        if !feed.tags.is_empty() {
            println!("      tags: {}", feed.tags.join(", "));
        }
    }

    Ok(())
}

pub async fn list_entries(
    ctx: &AppContext,
    cancel: &CancellationToken,
    feeds: Vec<FeedId>,
    is_read: Option<bool>,
) -> Result<()> {
    let entries = ctx.store.list_entries(cancel, feeds, is_read).await?;

    if entries.is_empty() {
        println!("No entries");
        return Ok(());
    }

    for entry in entries {
        print_entry_line(&entry);
    }

    Ok(())
}

fn print_entry_line(entry: &Entry) {
    let read_marker = if entry.is_read { " " } else { "●" };
    let bookmark = if entry.is_bookmarked { "+" } else { " " };
    let date = entry
        .sort_time()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "          ".to_string());

    println!(
        "{}{} {:>5} {} {}",
        read_marker,
        bookmark,
        entry.id,
        date,
        entry.display_title()
    );
}

pub async fn show_entry(ctx: &AppContext, cancel: &CancellationToken, id: EntryId) -> Result<()> {
    let entry = ctx.store.get_entry(cancel, id).await?;

    println!("{}", entry.display_title());
    if let Some(ref url) = entry.url {
        println!("{}", url);
    }
    if let Some(time) = entry.sort_time() {
        println!("{}", time.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();
    println!("{}", entry.display_content());
    Ok(())
}

pub async fn mark_entries(
    ctx: &AppContext,
    cancel: &CancellationToken,
    ids: Vec<EntryId>,
    is_read: Option<bool>,
    is_bookmarked: Option<bool>,
) -> Result<()> {
    let edits = ids
        .into_iter()
        .map(|id| EntryEdit {
            id,
            is_read,
            is_bookmarked,
        })
        .collect();

    let entries = ctx.store.edit_entries(cancel, edits).await?;
    for entry in &entries {
        print_entry_line(entry);
    }
    Ok(())
}

pub async fn star_feed(ctx: &AppContext, cancel: &CancellationToken, id: FeedId, starred: bool) -> Result<()> {
    let edit = FeedEdit {
        is_starred: Some(starred),
        ..FeedEdit::new(id)
    };
    let feeds = ctx.store.edit_feeds(cancel, vec![edit]).await?;
    for feed in feeds {
        println!(
            "{} {}",
            if feed.is_starred { "Starred" } else { "Unstarred" },
            feed.display_title()
        );
    }
    Ok(())
}

pub async fn tag_feed(
    ctx: &AppContext,
    cancel: &CancellationToken,
    id: FeedId,
    tags: Vec<String>,
) -> Result<()> {
    let edit = FeedEdit {
        tags: Some(tags),
        ..FeedEdit::new(id)
    };
    let feeds = ctx.store.edit_feeds(cancel, vec![edit]).await?;
    for feed in feeds {
        if feed.tags.is_empty() {
            println!("{}: no tags", feed.display_title());
        } else {
            println!("{}: {}", feed.display_title(), feed.tags.join(", "));
        }
    }
    Ok(())
}

/// Pulls feeds and prints one line per feed.
///
/// Returns [`BrookError::PullFailed`] when at least one feed failed.
pub async fn pull_feeds(ctx: &AppContext, cancel: &CancellationToken, ids: Vec<FeedId>) -> Result<()> {
    let mut results = ctx.store.pull_feeds(cancel.clone(), ids).await?;

    let mut total = 0;
    let mut total_new = 0;
    let mut failures = Vec::new();

    while let Some(result) = results.recv().await {
        let url = result.feed_url.unwrap_or_default();
        match result.status {
            PullStatus::Success => {
                total += 1;
                let new = result.feed.map_or(0, |f| f.entries.len());
                total_new += new;
                if new > 0 {
                    println!("  {} new entries from {}", new, url);
                }
            }
            PullStatus::Fail => {
                total += 1;
                let err = result
                    .error
                    .unwrap_or_else(|| BrookError::Internal("pull failed without an error".into()));
                eprintln!("  Error pulling {}: {}", url, err);
                failures.push((url, err));
            }
            PullStatus::Idle | PullStatus::Pulling => {
                println!("No feeds to pull");
            }
        }
    }

    println!(
        "Pull complete: {} new entries, {} errors",
        total_new,
        failures.len()
    );

    if failures.is_empty() {
        Ok(())
    } else {
        Err(BrookError::PullFailed { total, failures })
    }
}

/// Import subscriptions from an OPML file
pub async fn import_opml(ctx: &AppContext, cancel: &CancellationToken, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let document = opml::from_opml(&content)?;

    if document.feeds.is_empty() {
        println!("No feeds found in OPML file");
        return Ok(());
    }

    let (processed, imported) = ctx.store.import_subscription(cancel, document).await?;
    println!(
        "Import complete: {} added, {} already subscribed",
        imported,
        processed - imported
    );
    Ok(())
}

/// Export subscriptions as OPML to `path`, or stdout when `None`.
pub async fn export_opml(
    ctx: &AppContext,
    cancel: &CancellationToken,
    path: Option<&Path>,
) -> Result<()> {
    let document = ctx.store.export_subscription(cancel).await?;
    let xml = opml::to_opml(&document)?;

    match path {
        Some(path) => {
            std::fs::write(path, xml)?;
            println!("Exported {} feeds to {}", document.feeds.len(), path.display());
        }
        None => println!("{}", xml),
    }
    Ok(())
}

pub async fn show_stats(ctx: &AppContext, cancel: &CancellationToken) -> Result<()> {
    let stats = ctx.store.stats(cancel).await?;
    println!("Feeds:      {} ({} starred)", stats.feeds, stats.starred_feeds);
    println!(
        "Entries:    {} ({} unread, {} read)",
        stats.entries, stats.unread_entries, stats.read_entries
    );
    println!("Bookmarked: {}", stats.bookmarked_entries);
    println!("Tags:       {}", stats.tags);
    Ok(())
}

pub async fn run_daemon(
    ctx: &AppContext,
    cancel: &CancellationToken,
    interval: Option<&str>,
    pull_on_start: bool,
) -> Result<()> {
    let interval = parse_interval(interval.unwrap_or(&ctx.config.daemon.interval))?;
    Daemon::new(ctx.store.clone(), interval)
        .pull_on_start(pull_on_start)
        .run(cancel.clone())
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::parser::mock::{MockParser, Script};
    use crate::parser::{ParsedFeed, ParsedItem};

    const A: &str = "http://a.com/feed.xml";
    const B: &str = "http://b.com/feed.xml";

    fn feed(title: &str, guids: &[&str]) -> ParsedFeed {
        ParsedFeed {
            title: title.into(),
            items: guids
                .iter()
                .map(|guid| ParsedItem {
                    external_id: guid.to_string(),
                    title: guid.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    async fn context() -> (AppContext, Arc<MockParser>) {
        let parser = Arc::new(MockParser::new());
        parser.set_feed(A, feed("A", &["a1", "a2"]));
        parser.set_feed(B, feed("B", &["b1"]));
        let ctx = AppContext::in_memory(Config::default(), parser.clone()).unwrap();

        let cancel = CancellationToken::new();
        add_feed(&ctx, &cancel, NewFeed::new(A)).await.unwrap();
        add_feed(&ctx, &cancel, NewFeed::new(B)).await.unwrap();
        (ctx, parser)
    }

    #[tokio::test]
    async fn test_pull_reports_failures() {
        let (ctx, parser) = context().await;
        parser.set(B, Script::Fail("unreachable".into()));

        let err = pull_feeds(&ctx, &CancellationToken::new(), vec![])
            .await
            .unwrap_err();
        match err {
            BrookError::PullFailed { total, failures } => {
                assert_eq!(total, 2);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, B);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_pull_succeeds_when_every_feed_does() {
        let (ctx, _) = context().await;
        tokio_test::assert_ok!(pull_feeds(&ctx, &CancellationToken::new(), vec![]).await);
    }

    #[tokio::test]
    async fn test_mark_and_tag() {
        let (ctx, _) = context().await;
        let cancel = CancellationToken::new();
        let entries = ctx.store.list_entries(&cancel, vec![], None).await.unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id).take(2).collect();

        mark_entries(&ctx, &cancel, ids.clone(), Some(true), Some(true))
            .await
            .unwrap();
        let read = ctx.store.list_entries(&cancel, vec![], Some(true)).await.unwrap();
        assert_eq!(read.len(), 2);
        assert!(read.iter().all(|e| e.is_bookmarked));

        let feed_id = entries[0].feed_id;
        tag_feed(&ctx, &cancel, feed_id, vec!["news".into()]).await.unwrap();
        star_feed(&ctx, &cancel, feed_id, true).await.unwrap();
        let feed = ctx.store.get_feed(&cancel, feed_id).await.unwrap();
        assert_eq!(feed.tags, vec!["news".to_string()]);
        assert!(feed.is_starred);

        tag_feed(&ctx, &cancel, feed_id, vec![]).await.unwrap();
        assert!(ctx.store.list_tags(&cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_then_import_file() {
        let (ctx, _) = context().await;
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.opml");

        export_opml(&ctx, &cancel, Some(&path)).await.unwrap();

        let fresh = AppContext::in_memory(Config::default(), Arc::new(MockParser::new())).unwrap();
        import_opml(&fresh, &cancel, &path).await.unwrap();

        let urls: Vec<_> = fresh
            .store
            .list_feeds(&cancel)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.feed_url)
            .collect();
        assert_eq!(urls.len(), 2);
        assert!(urls.contains(&A.to_string()));
        assert!(urls.contains(&B.to_string()));
    }

    #[tokio::test]
    async fn test_reimport_keeps_starred_flag() {
        let (ctx, _) = context().await;
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.opml");

        let a_id = ctx.store.list_feeds(&cancel).await.unwrap()[0].id;
        star_feed(&ctx, &cancel, a_id, true).await.unwrap();

        export_opml(&ctx, &cancel, Some(&path)).await.unwrap();
        import_opml(&ctx, &cancel, &path).await.unwrap();

        let feeds = ctx.store.list_feeds(&cancel).await.unwrap();
        assert_eq!(feeds.len(), 2);
        let starred: Vec<_> = feeds.iter().filter(|f| f.is_starred).map(|f| f.id).collect();
        assert_eq!(starred, vec![a_id]);
    }

    #[tokio::test]
    async fn test_remove_unknown_feed_fails() {
        let (ctx, _) = context().await;
        let err = remove_feeds(&ctx, &CancellationToken::new(), vec![77])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
