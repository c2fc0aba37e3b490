//! # Brook
//!
//! A feed aggregator whose core is a single-file SQLite datastore.
//!
//! ## Architecture
//!
//! ```text
//! Parser (HTTP + Normalizer) → Store (SQLite) → CLI / Daemon
//! ```
//!
//! The [`store`] owns all persistent state. It subscribes to feeds, refreshes
//! them concurrently while streaming per-feed results, tracks read and
//! bookmark state, tags feeds, and imports or exports subscription lists.
//! Every operation runs under one writer lock and inside a transaction.
//!
//! ## Quick Start
//!
//! ```bash
//! # Subscribe to a feed
//! brook add https://blog.rust-lang.org/feed.xml --tag rust
//!
//! # Refresh every feed
//! brook pull
//!
//! # Unread entries, newest first
//! brook entries --unread
//!
//! # Refresh every hour until Ctrl-C
//! brook daemon --interval 1h
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires the configured store and
/// parser together.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/brook/config.toml`.
pub mod config;

/// Periodic pull loop.
pub mod daemon;

/// Core domain models.
///
/// - [`Feed`](domain::Feed) and [`Entry`](domain::Entry): stored rows
/// - [`FeedEdit`](domain::FeedEdit) and [`EntryEdit`](domain::EntryEdit): partial updates
/// - [`PullResult`](domain::PullResult): one streamed outcome of a pull
/// - [`Subscription`](domain::Subscription): the portable subscription list
pub mod domain;

/// Feed decoding into [`ParsedFeed`](parser::ParsedFeed).
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0.
pub mod normalizer;

/// OPML encoding of the subscription list.
pub mod opml;

/// The parser port and its HTTP implementation.
///
/// - [`FeedParser`](parser::FeedParser): async trait, cancellable
/// - [`HttpParser`](parser::HttpParser): reqwest-based implementation
pub mod parser;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining the datastore operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

pub mod util;
