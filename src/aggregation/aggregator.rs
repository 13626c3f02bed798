//! Submission counting and scheduled report emission.
//!
//! [`ReportAggregator`] owns the counter table, the end of the last report
//! window and the last calendar hour a report was compiled for. It is driven
//! by two inputs: [`ReportAggregator::record_submission`] for every accepted
//! submission and [`ReportAggregator::on_tick`] for every clock tick.

use crate::models::{zero_time, DedupeKey, ReportWindow};
use crate::notify::ReportTransport;
use crate::report::{compile_report, render_html, report_subject};
use chrono::{DateTime, FixedOffset, Timelike};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, info};

/// What a call to [`ReportAggregator::on_tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The current hour is not a report hour.
    OutsideHours,
    /// A report was already compiled for this calendar hour.
    AlreadySent,
    /// A report was compiled and the transport accepted it.
    Delivered,
    /// A report was compiled but delivery failed; its counts are dropped.
    DeliveryFailed,
}

/// Accumulates per-source submission counts and emits hourly reports.
pub struct ReportAggregator<T> {
    report_hours: BTreeSet<u32>,
    transport: T,
    counters: HashMap<String, u64>,
    last_sent_at: DateTime<FixedOffset>,
    last_key: Option<DedupeKey>,
}

impl<T: ReportTransport> ReportAggregator<T> {
    /// Create an aggregator that reports during `report_hours` (0-23).
    pub fn new(report_hours: impl IntoIterator<Item = u32>, transport: T) -> Self {
        Self {
            report_hours: report_hours.into_iter().collect(),
            transport,
            counters: HashMap::new(),
            last_sent_at: zero_time(),
            last_key: None,
        }
    }

    /// Count one accepted submission from `source_id`.
    pub fn record_submission(&mut self, source_id: &str) {
        match self.counters.get_mut(source_id) {
            Some(count) => *count += 1,
            None => {
                self.counters.insert(source_id.to_string(), 1);
            }
        }
    }

    /// Evaluate the schedule at `now`, compiling and sending a report when due.
    ///
    /// Once a report is compiled the window advances and the counters are
    /// cleared whether or not delivery succeeded. Failed deliveries are
    /// logged and not retried.
    pub async fn on_tick(&mut self, now: DateTime<FixedOffset>) -> TickOutcome {
        if !self.report_hours.contains(&now.hour()) {
            return TickOutcome::OutsideHours;
        }

        let key = DedupeKey::from_time(&now);
        if self.last_key == Some(key) {
            return TickOutcome::AlreadySent;
        }

        let window = ReportWindow::new(self.last_sent_at, now);
        let report = compile_report(&self.counters, window);
        debug!(
            "Compiled report {} with {} source(s), {} submission(s)",
            key,
            report.rows.len(),
            report.total()
        );

        let outcome = match self
            .transport
            .send(&report_subject(&now), &render_html(&report))
            .await
        {
            Ok(()) => {
                info!(
                    "Report sent for {} to {}: {} submission(s) from {} source(s)",
                    window.start,
                    window.end,
                    report.total(),
                    report.rows.len()
                );
                TickOutcome::Delivered
            }
            Err(e) => {
                error!("Failed to send report for {}: {}", key, e);
                TickOutcome::DeliveryFailed
            }
        };

        self.last_sent_at = now;
        self.counters.clear();
        self.last_key = Some(key);

        outcome
    }

    /// Current count for `source_id` (0 if never seen in this window).
    #[cfg(test)]
    pub fn count(&self, source_id: &str) -> u64 {
        self.counters.get(source_id).copied().unwrap_or(0)
    }

    /// The counter table for the open window.
    pub fn counts(&self) -> &HashMap<String, u64> {
        &self.counters
    }

    /// End of the last compiled window (year one before the first report).
    pub fn last_sent_at(&self) -> DateTime<FixedOffset> {
        self.last_sent_at
    }

    #[cfg(test)]
    pub fn last_key(&self) -> Option<DedupeKey> {
        self.last_key
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
