//! Per-provider normalizers.
//!
//! Each module turns one provider's on-disk (or remote) format into
//! [`Session`](pulse_core::models::Session)s and folds them through the shared
//! [`WindowAggregator`](crate::aggregator::WindowAggregator). A missing or
//! unreadable source always yields [`SourceSummary::empty`].

use std::path::PathBuf;

use pulse_core::data_processors::GroupKeyExtractor;
use pulse_core::exclusions::ExclusionList;
use pulse_core::time_utils::TimeWindows;

use crate::aggregator::WindowAggregator;

pub mod claude;
pub mod codex;
pub mod cursor;
pub mod gemini;
pub mod git;
pub mod github_api;
pub mod hub_api;

/// Everything a normalizer needs besides its own input location.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub windows: TimeWindows,
    pub extractor: GroupKeyExtractor,
    /// Groups whose sessions are dropped before aggregation.
    pub exclusions: ExclusionList,
    /// The user's home directory, for sources that name it `"Home"`.
    pub home: Option<PathBuf>,
}

impl ScanContext {
    pub fn new(windows: TimeWindows, extractor: GroupKeyExtractor) -> Self {
        Self {
            windows,
            extractor,
            exclusions: ExclusionList::default(),
            home: None,
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionList) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Extractor that also maps the home directory itself to `"Home"`.
    pub fn home_aware_extractor(&self) -> GroupKeyExtractor {
        self.extractor.clone().with_home(self.home.clone())
    }

    /// A fresh aggregator over these windows that honours the exclusions.
    pub fn aggregator(&self) -> WindowAggregator {
        WindowAggregator::new(self.windows).with_exclusions(self.exclusions.clone())
    }
}
