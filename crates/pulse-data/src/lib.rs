//! Data ingestion layer for devpulse.
//!
//! Discovers and decodes each provider's logs, folds sessions into the
//! 7-day and 30-day windows, reads commit history and merges everything into
//! the final report.

pub mod aggregator;
pub mod merge;
pub mod reader;
pub mod sources;

pub use pulse_core as core;
