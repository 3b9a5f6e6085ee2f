//! Span types shared by the matching pipeline
//!
//! Offsets are half-open byte ranges into the scanned `&str` and always sit
//! on char boundaries.

use serde::{Deserialize, Serialize};

use super::role::RoleId;

/// Half-open byte range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Exact,
    Regex,
}

/// A tentative match before conflict resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'t> {
    pub role: RoleId,
    pub matched_text: &'t str,
    pub range: TextRange,
    /// Resolved priority (lower wins)
    pub priority: i64,
    pub source: CandidateSource,
}

impl<'t> Candidate<'t> {
    /// Exact-match candidate over `text[start..end]`
    pub fn exact(text: &'t str, role: RoleId, start: usize, end: usize, priority: i64) -> Option<Self> {
        Self::slice(text, role, start, end, priority, CandidateSource::Exact)
    }

    /// Regex candidate over `text[start..end]`
    pub fn regex(text: &'t str, role: RoleId, start: usize, end: usize, priority: i64) -> Option<Self> {
        Self::slice(text, role, start, end, priority, CandidateSource::Regex)
    }

    fn slice(
        text: &'t str,
        role: RoleId,
        start: usize,
        end: usize,
        priority: i64,
        source: CandidateSource,
    ) -> Option<Self> {
        let matched_text = text.get(start..end)?;
        Some(Self {
            role,
            matched_text,
            range: TextRange::new(start, end),
            priority,
            source,
        })
    }

    pub fn is_regex(&self) -> bool {
        matches!(self.source, CandidateSource::Regex)
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// A final, accepted, non-overlapping match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence<'t> {
    pub role: RoleId,
    pub range: TextRange,
    pub matched_text: &'t str,
    pub priority: i64,
    pub source: CandidateSource,
}
