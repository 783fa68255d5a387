use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::feed::{FeedSynchronizer, PollOutcome};

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub period: Duration,
    /// Re-resolve the followed services every this many ticks; 0 never does.
    pub service_refresh_ticks: u32,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            service_refresh_ticks: 0,
        }
    }
}

/// Drives [`FeedSynchronizer::poll_increment`] on a fixed period.
///
/// The loop awaits each poll before waiting for the next tick, so polls never
/// overlap; ticks that fire meanwhile are dropped rather than queued.
pub struct PollScheduler;

impl PollScheduler {
    /// Spawns the polling loop. The first poll happens one period from now.
    pub fn start(feed: Arc<FeedSynchronizer>, options: SchedulerOptions) -> SchedulerHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        info!(
            "Starting poll scheduler, period {:?}",
            options.period
        );
        let task = tokio::spawn(run(feed, options, cancel_rx));
        SchedulerHandle {
            cancel_tx,
            task: Some(task),
        }
    }
}

/// Owner side of a running [`PollScheduler`]. Dropping it cancels the loop.
pub struct SchedulerHandle {
    cancel_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops the loop and drops any poll still in flight, so its response is
    /// never merged. Returns `false` when the scheduler was already cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = self.cancel_tx.send_if_modified(|cancelled| {
            if *cancelled {
                return false;
            }
            *cancelled = true;
            true
        });
        if cancelled {
            debug!("Poll scheduler cancelled");
        }
        cancelled
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Cancels the loop and waits for it to finish.
    pub async fn join(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn run(
    feed: Arc<FeedSynchronizer>,
    options: SchedulerOptions,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let mut interval = time::interval_at(Instant::now() + options.period, options.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => break,
            _ = interval.tick() => {}
        }
        ticks += 1;

        let refresh_every = u64::from(options.service_refresh_ticks);
        if refresh_every > 0 && ticks % refresh_every == 0 {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => break,
                result = feed.refresh_service_filter() => {
                    if let Err(e) = result {
                        debug!("Service filter refresh failed: {}", e);
                    }
                }
            }
        }

        tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => {
                debug!("Dropping in-flight poll");
                break;
            }
            result = feed.poll_increment() => match result {
                Ok(PollOutcome::Merged(report)) => {
                    trace!("Tick {}: merged {:?}", ticks, report);
                }
                Ok(outcome) => trace!("Tick {}: {:?}", ticks, outcome),
                Err(e) => debug!("Tick {}: poll failed, retrying next tick: {}", ticks, e),
            }
        }
    }

    info!("Poll scheduler stopped after {} ticks", ticks);
}
