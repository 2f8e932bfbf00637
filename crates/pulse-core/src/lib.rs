//! Core types and helpers for devpulse.
//!
//! Holds the report data model, the shared error type, timestamp and
//! group-key processors, time-window cutoffs, the repository denylist,
//! formatting helpers and the CLI settings.

pub mod data_processors;
pub mod error;
pub mod exclusions;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
