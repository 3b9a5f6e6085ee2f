//! Configuration for a collection pass
//!
//! Plain data passed into every `collect` call; nothing reads ambient
//! configuration.

use serde::{Deserialize, Serialize};

use super::resolver::RegexOverlap;

/// Matching configuration consumed read-only at collection time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingConfig {
    /// Global switch for the word-boundary filter. Default: true
    #[serde(default = "default_true")]
    pub word_boundary_filter: bool,
    /// Patterns of at most this many chars get the filter when the role
    /// does not override it. Default: 1
    #[serde(default = "default_short_pattern_threshold")]
    pub short_pattern_threshold: usize,
    /// Texts longer than this (bytes) are skipped. Default: unlimited
    #[serde(default)]
    pub max_text_len: Option<usize>,
    /// Whether regex roles may overlap each other. Default: shared
    #[serde(default)]
    pub regex_overlap: RegexOverlap,
}

fn default_true() -> bool {
    true
}

fn default_short_pattern_threshold() -> usize {
    1
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            word_boundary_filter: true,
            short_pattern_threshold: default_short_pattern_threshold(),
            max_text_len: None,
            regex_overlap: RegexOverlap::default(),
        }
    }
}

impl MatchingConfig {
    pub fn with_word_boundary_filter(mut self, enabled: bool) -> Self {
        self.word_boundary_filter = enabled;
        self
    }

    pub fn with_short_pattern_threshold(mut self, threshold: usize) -> Self {
        self.short_pattern_threshold = threshold;
        self
    }

    pub fn with_max_text_len(mut self, max: usize) -> Self {
        self.max_text_len = Some(max);
        self
    }

    pub fn with_regex_overlap(mut self, policy: RegexOverlap) -> Self {
        self.regex_overlap = policy;
        self
    }
}
