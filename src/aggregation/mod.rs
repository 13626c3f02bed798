//! Submission aggregation.
//!
//! This module contains the report aggregator and the loop that drives it.

pub mod aggregator;
pub mod runner;

pub use aggregator::{ReportAggregator, TickOutcome};
pub use runner::{
    submission_channel, AggregatorHandle, Clock, ReportLoop, SystemClock, DEFAULT_TICK_INTERVAL,
};
