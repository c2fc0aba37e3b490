pub mod edit;
pub mod entry;
pub mod feed;
pub mod id;
pub mod pull;
pub mod subscription;

pub use edit::{EntryEdit, FeedEdit};
pub use entry::Entry;
pub use feed::{Feed, NewFeed};
pub use id::{parse_id, EntryId, FeedId};
pub use pull::{PullResult, PullStatus};
pub use subscription::{Stats, Subscription, SubscriptionFeed};
