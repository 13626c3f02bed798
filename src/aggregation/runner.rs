//! The report loop.
//!
//! One task owns the [`ReportAggregator`] and multiplexes two inputs: the
//! submission channel fed by [`AggregatorHandle`]s and a fixed-interval
//! ticker. Delivery is awaited inside the loop, so report compilation never
//! overlaps with counter mutation.

use super::{ReportAggregator, TickOutcome};
use crate::models::SubmissionEvent;
use crate::notify::ReportTransport;
use chrono::{DateTime, FixedOffset, Local};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default scheduler polling interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Source of wall-clock time for schedule decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Producer side of the submission channel.
///
/// Cheap to clone; handed to every request handler.
#[derive(Debug, Clone)]
pub struct AggregatorHandle {
    tx: mpsc::UnboundedSender<SubmissionEvent>,
}

impl AggregatorHandle {
    /// Queue one accepted submission. Never blocks and never fails; if the
    /// loop has stopped the event is dropped with a warning.
    pub fn record_submission(&self, event: SubmissionEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!(
                "Report loop stopped, dropping submission from {}",
                e.0.source_id
            );
        }
    }
}

/// Create the unbounded submission channel.
pub fn submission_channel() -> (AggregatorHandle, mpsc::UnboundedReceiver<SubmissionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AggregatorHandle { tx }, rx)
}

/// Drives a [`ReportAggregator`] from the submission channel and a ticker.
pub struct ReportLoop<T, C = SystemClock> {
    aggregator: ReportAggregator<T>,
    clock: C,
    tick_interval: Duration,
}

impl<T: ReportTransport> ReportLoop<T, SystemClock> {
    pub fn new(aggregator: ReportAggregator<T>, tick_interval: Duration) -> Self {
        Self::with_clock(aggregator, SystemClock, tick_interval)
    }
}

impl<T: ReportTransport, C: Clock> ReportLoop<T, C> {
    pub fn with_clock(aggregator: ReportAggregator<T>, clock: C, tick_interval: Duration) -> Self {
        Self {
            aggregator,
            clock,
            tick_interval,
        }
    }

    /// Run until every handle is dropped or `shutdown` flips to `true`.
    ///
    /// Returns the aggregator so callers can inspect its final state.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<SubmissionEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> ReportAggregator<T> {
        let Self {
            mut aggregator,
            clock,
            tick_interval,
        } = self;

        // The first tick lands one interval after start so that events
        // already queued are counted before the schedule is first checked.
        let mut ticker = time::interval_at(Instant::now() + tick_interval, tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Report loop started (tick every {:?})", tick_interval);

        // Queued submissions win over a due tick so that every event accepted
        // before the tick lands in the report it compiles.
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(
                            "Report loop shutting down, {} source(s) unreported",
                            aggregator.counts().len()
                        );
                        break;
                    }
                }
                event = events.recv() => match event {
                    Some(event) => aggregator.record_submission(&event.source_id),
                    None => {
                        info!("Submission channel closed, report loop exiting");
                        break;
                    }
                },
                _ = ticker.tick() => match aggregator.on_tick(clock.now()).await {
                    TickOutcome::OutsideHours | TickOutcome::AlreadySent => {}
                    outcome => debug!(
                        "Tick outcome {:?}, next window opens at {}",
                        outcome,
                        aggregator.last_sent_at()
                    ),
                },
            }
        }

        aggregator
    }
}
