//! Ordering and deduplication rules for the stream feed.
//!
//! The feed is kept sorted by stream id, newest first, with unique ids. The
//! backend is expected to return batches that satisfy this already; anything
//! else is repaired here and reported as a [`MergeInconsistency`].

use std::collections::HashSet;

use log::warn;

use crate::api::types::StreamWithPackets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeInconsistency {
    /// The id is already in the feed or appeared twice in the batch.
    Duplicate(i64),
    /// A new id at or below the watermark (a stream that completed late).
    BelowWatermark(i64),
    /// The batch was not newest-first at this id.
    OutOfOrder(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub evicted: usize,
    pub inconsistencies: Vec<MergeInconsistency>,
}

impl MergeReport {
    /// Whether anything was added or evicted. An entry merged and evicted in
    /// the same pass counts as both, so compare ids to detect a changed feed.
    pub fn changed(&self) -> bool {
        self.added > 0 || self.evicted > 0
    }
}

/// Newest stream id held by `feed`, or 0 for an empty feed.
pub fn watermark(feed: &[StreamWithPackets]) -> i64 {
    feed.first().map(|entry| entry.id()).unwrap_or(0)
}

/// Builds a fresh feed out of a bulk load.
pub fn from_batch(batch: Vec<StreamWithPackets>) -> (Vec<StreamWithPackets>, MergeReport) {
    let mut feed = Vec::with_capacity(batch.len());
    let report = merge_increment(&mut feed, batch);
    (feed, report)
}

/// Prepends the unseen entries of `batch` to `feed`.
///
/// Entries whose id is already known are dropped. When the batch is strictly
/// newer than the watermark and newest-first, this is a plain prepend;
/// otherwise the feed is re-sorted.
pub fn merge_increment(
    feed: &mut Vec<StreamWithPackets>,
    batch: Vec<StreamWithPackets>,
) -> MergeReport {
    let mut report = MergeReport::default();
    if batch.is_empty() {
        return report;
    }

    let watermark = feed.first().map(|entry| entry.id());
    let mut known: HashSet<i64> = feed.iter().map(|entry| entry.id()).collect();
    let mut fresh = Vec::with_capacity(batch.len());
    let mut previous: Option<i64> = None;
    let mut needs_sort = false;

    for entry in batch {
        let id = entry.id();
        if !known.insert(id) {
            report.inconsistencies.push(MergeInconsistency::Duplicate(id));
            continue;
        }
        if matches!(watermark, Some(w) if id <= w) {
            report
                .inconsistencies
                .push(MergeInconsistency::BelowWatermark(id));
            needs_sort = true;
        }
        if matches!(previous, Some(p) if id > p) {
            report.inconsistencies.push(MergeInconsistency::OutOfOrder(id));
            needs_sort = true;
        }
        previous = Some(id);
        fresh.push(entry);
    }

    report.added = fresh.len();
    if !report.inconsistencies.is_empty() {
        warn!(
            "Tolerating inconsistent stream batch: {:?}",
            report.inconsistencies
        );
    }
    if fresh.is_empty() {
        return report;
    }

    fresh.append(feed);
    *feed = fresh;
    if needs_sort {
        feed.sort_by(|a, b| b.id().cmp(&a.id()));
    }
    report
}

/// Drops the oldest entries beyond `capacity`. Returns how many were dropped.
pub fn apply_window(feed: &mut Vec<StreamWithPackets>, capacity: usize) -> usize {
    if feed.len() <= capacity {
        return 0;
    }
    let evicted = feed.len() - capacity;
    feed.truncate(capacity);
    evicted
}
