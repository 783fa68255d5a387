//! Stream feed synchronization.
//!
//! - `observable`: the subscribe/notify value holder the feed lives in.
//! - `merge`: ordering, deduplication and rolling-window rules.
//! - `synchronizer`: [`FeedSynchronizer`], bulk load and incremental polling.

pub mod merge;
pub mod observable;
pub mod synchronizer;

pub use merge::{MergeInconsistency, MergeReport};
pub use observable::Observable;
pub use synchronizer::{
    FeedOptions, FeedState, FeedSynchronizer, LoadOutcome, PollOutcome, SyncStatus,
};
