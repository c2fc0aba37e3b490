use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use brook::app::AppContext;
use brook::cli::{commands, Cli, Commands};
use brook::config::Config;
use brook::domain::NewFeed;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("brook=info")))
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }
    if let Some(workers) = cli.workers {
        config.fetch.workers = workers;
    }

    let ctx = AppContext::new(config)?;

    // Ctrl-C cancels whatever is in flight; the store rolls back open work.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, canceling");
            on_interrupt.cancel();
        }
    });

    let result = match cli.command {
        Commands::Add {
            url,
            title,
            description,
            star,
            tags,
        } => {
            let feed = NewFeed {
                title,
                description,
                is_starred: star.then_some(true),
                tags,
                ..NewFeed::new(url)
            };
            commands::add_feed(&ctx, &cancel, feed).await
        }
        Commands::Remove { ids } => commands::remove_feeds(&ctx, &cancel, ids).await,
        Commands::Feeds => commands::list_feeds(&ctx, &cancel).await,
        Commands::Entries {
            feeds,
            read,
            unread,
        } => {
            let is_read = if read {
                Some(true)
            } else if unread {
                Some(false)
            } else {
                None
            };
            commands::list_entries(&ctx, &cancel, feeds, is_read).await
        }
        Commands::Show { id } => commands::show_entry(&ctx, &cancel, id).await,
        Commands::Mark {
            ids,
            read,
            unread,
            bookmark,
            unbookmark,
        } => {
            let is_bookmarked = if bookmark {
                Some(true)
            } else if unbookmark {
                Some(false)
            } else {
                None
            };
            let is_read = if unread {
                Some(false)
            } else if read || is_bookmarked.is_none() {
                Some(true)
            } else {
                None
            };
            commands::mark_entries(&ctx, &cancel, ids, is_read, is_bookmarked).await
        }
        Commands::Star { id, off } => commands::star_feed(&ctx, &cancel, id, !off).await,
        Commands::Tag { id, tags } => commands::tag_feed(&ctx, &cancel, id, tags).await,
        Commands::Pull { ids } => commands::pull_feeds(&ctx, &cancel, ids).await,
        Commands::Import { path } => commands::import_opml(&ctx, &cancel, &path).await,
        Commands::Export { path } => commands::export_opml(&ctx, &cancel, path.as_deref()).await,
        Commands::Stats => commands::show_stats(&ctx, &cancel).await,
        Commands::Daemon {
            interval,
            no_initial_pull,
        } => commands::run_daemon(&ctx, &cancel, interval.as_deref(), !no_initial_pull).await,
    };

    ctx.store.close().await?;
    result?;
    Ok(())
}
