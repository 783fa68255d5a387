use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::watch;

use super::merge::{self, MergeReport};
use super::observable::Observable;
use crate::api::types::{GetLastStreamsRequest, GetStreamsByServiceIdsRequest, StreamWithPackets};
use crate::api::Api;
use crate::error_handling::types::{FeedError, TransportError, ValidationError};
use crate::notification::{Notifier, Toast};

/// What the presentation layer renders: the feed plus the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    /// Newest first, unique ids.
    pub streams: Vec<StreamWithPackets>,
    /// Id of the selected entry; always present in `streams` when set.
    pub selected: Option<i64>,
}

impl FeedState {
    pub fn watermark(&self) -> i64 {
        merge::watermark(&self.streams)
    }

    pub fn get(&self, id: i64) -> Option<&StreamWithPackets> {
        self.streams.iter().find(|entry| entry.id() == id)
    }

    pub fn selected(&self) -> Option<&StreamWithPackets> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn ids(&self) -> Vec<i64> {
        self.streams.iter().map(|entry| entry.id()).collect()
    }

    fn drop_dangling_selection(&mut self) {
        if let Some(id) = self.selected {
            if self.get(id).is_none() {
                debug!("Selected stream {} left the feed, clearing selection", id);
                self.selected = None;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(MergeReport),
    /// The feed was reloaded or torn down while the request was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Merged(MergeReport),
    /// Nothing new past the watermark.
    Unchanged,
    /// Another poll was still in flight; no request was issued.
    Skipped,
    /// The response arrived after a reload or teardown and was dropped.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Rolling window: the feed never holds more entries than this.
    pub capacity: usize,
    /// Services to follow; empty means every service known to the backend.
    pub service_ids: Vec<i64>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            capacity: 500,
            service_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStatus {
    pub watermark: i64,
    pub streams: usize,
    pub selected: Option<i64>,
    pub service_ids: Vec<i64>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub polls: u64,
    pub failed_polls: u64,
    pub consecutive_failures: u32,
}

#[derive(Debug, Default)]
struct SyncCounters {
    last_synced_at: Option<DateTime<Utc>>,
    polls: u64,
    failed_polls: u64,
    consecutive_failures: u32,
}

/// Keeps a client-side, newest-first view of the captured streams in step with
/// a backend that keeps appending new ones.
///
/// The feed is loaded once in bulk ([`initial_load`](Self::initial_load)) and
/// then grown by watermark-based increments ([`poll_increment`](Self::poll_increment)).
/// Every load and the teardown bump an epoch; a response whose epoch is no
/// longer current is discarded instead of merged. Polls never overlap: a poll
/// requested while another one is in flight is skipped.
pub struct FeedSynchronizer {
    api: Arc<dyn Api>,
    notifier: Arc<dyn Notifier>,
    state: Observable<FeedState>,
    options: FeedOptions,
    service_ids: Mutex<Vec<i64>>,
    poll_guard: tokio::sync::Mutex<()>,
    epoch: AtomicU64,
    detached: AtomicBool,
    counters: Mutex<SyncCounters>,
}

impl FeedSynchronizer {
    pub fn new(api: Arc<dyn Api>, notifier: Arc<dyn Notifier>, options: FeedOptions) -> Self {
        let service_ids = options.service_ids.clone();
        Self {
            api,
            notifier,
            state: Observable::default(),
            options,
            service_ids: Mutex::new(service_ids),
            poll_guard: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
            detached: AtomicBool::new(false),
            counters: Mutex::new(SyncCounters::default()),
        }
    }

    /// Resolves the service filter, then loads the `limit` most recent streams.
    ///
    /// A failure to list services is reported but does not prevent the load;
    /// the previous filter stays in effect.
    pub async fn mount(&self, limit: u32) -> Result<LoadOutcome, FeedError> {
        info!("Mounting stream feed");
        if let Err(e) = self.refresh_service_filter().await {
            warn!("Keeping previous service filter: {}", e);
        }
        self.initial_load(limit).await
    }

    /// Replaces the feed with the `limit` most recent streams and selects the
    /// newest one.
    ///
    /// On failure the previous feed and selection are kept and a destructive
    /// toast is emitted.
    pub async fn initial_load(&self, limit: u32) -> Result<LoadOutcome, FeedError> {
        if limit == 0 {
            return Err(ValidationError::InvalidLimit.into());
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        debug!("Requesting the {} most recent streams", limit);
        let response = match self
            .api
            .get_last_streams(&GetLastStreamsRequest { limit })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                if !self.is_latest(epoch) {
                    debug!("Ignoring failure of a stale initial load: {}", e);
                    return Ok(LoadOutcome::Discarded);
                }
                error!("Initial stream load failed: {}", e);
                self.report_failure(&e, false);
                return Err(e.into());
            }
        };

        let (mut streams, mut report) = merge::from_batch(response.stream_with_packets);
        report.evicted = merge::apply_window(&mut streams, self.options.capacity);

        let mut applied = false;
        self.state.update(|state| {
            if !self.is_latest(epoch) {
                return false;
            }
            // Only an applied load re-attaches a torn down feed.
            self.detached.store(false, Ordering::SeqCst);
            applied = true;
            let selected = streams.first().map(|entry| entry.id());
            let changed = state.streams != streams || state.selected != selected;
            state.streams = streams;
            state.selected = selected;
            changed
        });

        if !applied {
            debug!("Discarding stale initial load (epoch {})", epoch);
            return Ok(LoadOutcome::Discarded);
        }

        self.record_success();
        info!(
            "Loaded {} streams, watermark {}",
            report.added - report.evicted,
            self.watermark()
        );
        Ok(LoadOutcome::Loaded(report))
    }

    /// Fetches the streams newer than the watermark and merges them in front
    /// of the feed.
    ///
    /// Failures leave the feed untouched, emit a destructive toast and are
    /// returned so the caller can log them; the next poll starts over from
    /// the same watermark.
    pub async fn poll_increment(&self) -> Result<PollOutcome, FeedError> {
        let _guard = match self.poll_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Poll already in flight, skipping");
                return Ok(PollOutcome::Skipped);
            }
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        if !self.is_current(epoch) {
            return Ok(PollOutcome::Discarded);
        }

        let request = GetStreamsByServiceIdsRequest {
            service_ids: self.service_ids(),
            last_stream_id: self.watermark(),
        };
        debug!(
            "Polling streams after {} for services {:?}",
            request.last_stream_id, request.service_ids
        );

        let response = match self.api.get_streams_by_service_ids(&request).await {
            Ok(response) => response,
            Err(e) => {
                if !self.is_current(epoch) {
                    debug!("Ignoring failure of a stale poll: {}", e);
                    return Ok(PollOutcome::Discarded);
                }
                warn!("Polling streams failed: {}", e);
                self.report_failure(&e, true);
                return Err(e.into());
            }
        };

        let batch = response.stream_with_packets;
        let capacity = self.options.capacity;
        let mut outcome = PollOutcome::Discarded;
        self.state.update(|state| {
            if !self.is_current(epoch) {
                return false;
            }
            let before = state.ids();
            let mut report = merge::merge_increment(&mut state.streams, batch);
            report.evicted = merge::apply_window(&mut state.streams, capacity);
            if report.evicted > 0 {
                state.drop_dangling_selection();
            }
            // A late stream can be evicted as soon as it is merged in.
            let changed = state.ids() != before;
            outcome = if changed {
                PollOutcome::Merged(report)
            } else {
                PollOutcome::Unchanged
            };
            changed
        });

        match &outcome {
            PollOutcome::Discarded => debug!("Discarding stale poll response (epoch {})", epoch),
            PollOutcome::Merged(report) => {
                self.record_poll_success();
                info!(
                    "Merged {} new streams, watermark {}",
                    report.added,
                    self.watermark()
                );
            }
            _ => self.record_poll_success(),
        }
        Ok(outcome)
    }

    /// Selects the feed entry with stream id `id`.
    pub fn select_stream(&self, id: i64) -> Result<(), FeedError> {
        let mut found = false;
        self.state.update(|state| {
            if state.get(id).is_none() {
                return false;
            }
            found = true;
            let changed = state.selected != Some(id);
            state.selected = Some(id);
            changed
        });
        if found {
            Ok(())
        } else {
            Err(FeedError::UnknownStream(id))
        }
    }

    /// Re-resolves which services the polls follow.
    ///
    /// Configured service ids are used as-is; otherwise every service known to
    /// the backend is followed.
    pub async fn refresh_service_filter(&self) -> Result<Vec<i64>, FeedError> {
        if !self.options.service_ids.is_empty() {
            return Ok(self.options.service_ids.clone());
        }
        let response = match self.api.get_services().await {
            Ok(response) => response,
            Err(e) => {
                self.notifier.notify(Toast::error(e.user_message()));
                return Err(e.into());
            }
        };
        let ids: Vec<i64> = response
            .services_with_rules
            .iter()
            .map(|entry| entry.service.id)
            .collect();
        debug!("Following services {:?}", ids);
        if let Ok(mut current) = self.service_ids.lock() {
            *current = ids.clone();
        }
        Ok(ids)
    }

    /// Clears the feed and the selection and drops every response still in
    /// flight. Safe to call repeatedly.
    pub fn teardown(&self) {
        let mut already_detached = false;
        self.state.update(|state| {
            already_detached = self.detached.swap(true, Ordering::SeqCst);
            self.epoch.fetch_add(1, Ordering::SeqCst);
            let changed = !state.streams.is_empty() || state.selected.is_some();
            state.streams.clear();
            state.selected = None;
            changed
        });
        if !already_detached {
            info!("Stream feed torn down");
        }
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    pub fn watermark(&self) -> i64 {
        self.state.read(|state| state.watermark())
    }

    pub fn snapshot(&self) -> FeedState {
        self.state.snapshot()
    }

    /// Runs `f` against the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&FeedState) -> R) -> R {
        self.state.read(f)
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn service_ids(&self) -> Vec<i64> {
        self.service_ids
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    pub fn status(&self) -> SyncStatus {
        let (watermark, streams, selected) = self
            .state
            .read(|state| (state.watermark(), state.streams.len(), state.selected));
        let mut status = SyncStatus {
            watermark,
            streams,
            selected,
            service_ids: self.service_ids(),
            ..Default::default()
        };
        if let Ok(counters) = self.counters.lock() {
            status.last_synced_at = counters.last_synced_at;
            status.polls = counters.polls;
            status.failed_polls = counters.failed_polls;
            status.consecutive_failures = counters.consecutive_failures;
        }
        status
    }

    /// No load or teardown started after `epoch`.
    fn is_latest(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.detached.load(Ordering::SeqCst) && self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn report_failure(&self, err: &TransportError, poll: bool) {
        if let Ok(mut counters) = self.counters.lock() {
            if poll {
                counters.polls += 1;
                counters.failed_polls += 1;
            }
            counters.consecutive_failures += 1;
        }
        self.notifier.notify(Toast::error(err.user_message()));
    }

    fn record_success(&self) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.last_synced_at = Some(Utc::now());
            counters.consecutive_failures = 0;
        }
    }

    fn record_poll_success(&self) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.polls += 1;
        }
        self.record_success();
    }
}
