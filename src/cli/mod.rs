pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{parse_id, EntryId, FeedId};

#[derive(Parser)]
#[command(name = "brook", version)]
#[command(about = "A feed aggregator backed by a single SQLite file", long_about = None)]
pub struct Cli {
    /// Database file (overrides the config file)
    #[arg(long, env = "BROOK_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Number of feeds parsed concurrently during a pull
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Config file (default: ~/.config/brook/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to a feed, or update an existing subscription
    Add {
        /// URL of the feed
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Star the feed
        #[arg(long)]
        star: bool,
        /// Tag to attach; repeat for several
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Unsubscribe from feeds
    Remove {
        #[arg(required = true, value_parser = id_arg)]
        ids: Vec<FeedId>,
    },
    /// List feeds with their unread counts
    Feeds,
    /// List entries, newest first
    Entries {
        /// Only entries of this feed; repeat for several
        #[arg(long = "feed", value_parser = id_arg)]
        feeds: Vec<FeedId>,
        #[arg(long, conflicts_with = "unread")]
        read: bool,
        #[arg(long)]
        unread: bool,
    },
    /// Print one entry
    Show {
        #[arg(value_parser = id_arg)]
        id: EntryId,
    },
    /// Change read or bookmark state of entries (marks read by default)
    Mark {
        #[arg(required = true, value_parser = id_arg)]
        ids: Vec<EntryId>,
        #[arg(long, conflicts_with = "unread")]
        read: bool,
        #[arg(long)]
        unread: bool,
        #[arg(long, conflicts_with = "unbookmark")]
        bookmark: bool,
        #[arg(long)]
        unbookmark: bool,
    },
    /// Star a feed
    Star {
        #[arg(value_parser = id_arg)]
        id: FeedId,
        /// Remove the star instead
        #[arg(long)]
        off: bool,
    },
    /// Replace a feed's tags (no tags clears them)
    Tag {
        #[arg(value_parser = id_arg)]
        id: FeedId,
        tags: Vec<String>,
    },
    /// Refresh feeds (all when no ids are given)
    Pull {
        #[arg(value_parser = id_arg)]
        ids: Vec<FeedId>,
    },
    /// Import subscriptions from an OPML file
    Import {
        /// Path to the OPML file
        path: PathBuf,
    },
    /// Export subscriptions as OPML
    Export {
        /// Output file (default: stdout)
        path: Option<PathBuf>,
    },
    /// Show feed and entry counts
    Stats,
    /// Pull all feeds periodically until interrupted
    Daemon {
        /// Pull interval (e.g., "30m", "1h", "1d"); defaults to the config file
        #[arg(short, long)]
        interval: Option<String>,

        /// Wait one interval before the first pull
        #[arg(long)]
        no_initial_pull: bool,
    },
}

fn id_arg(s: &str) -> Result<u32, String> {
    parse_id(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ids_are_validated() {
        let cli = Cli::try_parse_from(["brook", "remove", "3", "12"]).unwrap();
        assert!(matches!(cli.command, Commands::Remove { ref ids } if *ids == vec![3, 12]));

        assert!(Cli::try_parse_from(["brook", "remove", "0"]).is_err());
        assert!(Cli::try_parse_from(["brook", "show", "x1"]).is_err());
        assert!(Cli::try_parse_from(["brook", "show", "4294967296"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["brook", "pull", "--db", "/tmp/x.db", "-w", "4"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.workers, Some(4));
        assert!(matches!(cli.command, Commands::Pull { ref ids } if ids.is_empty()));
    }

    #[test]
    fn test_conflicting_read_flags() {
        assert!(Cli::try_parse_from(["brook", "mark", "1", "--read", "--unread"]).is_err());
        assert!(Cli::try_parse_from(["brook", "entries", "--read", "--unread"]).is_err());
    }
}
