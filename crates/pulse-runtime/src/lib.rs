//! Runtime layer for devpulse.
//!
//! Drives the sources in order, merges their summaries and writes the
//! resulting document.

pub mod collector;
pub mod output;

pub use pulse_core as core;
pub use pulse_data as data;
