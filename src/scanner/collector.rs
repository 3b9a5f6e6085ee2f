//! OccurrenceCollector: role annotation for one text snapshot
//!
//! Orchestrates the pipeline end to end:
//! 1. `PatternIndex` search (every pattern ending at every offset)
//! 2. `SegmentFilter` on short hits
//! 3. `RegexScanner` over every compiled regex role
//! 4. `ConflictResolver` scheduling
//!
//! `Annotator` is the stateful service: it owns the current registry
//! snapshot and rebuilds index and regex cache only when the registry
//! version changes. Cancellation is checked before each phase; a cancelled
//! pass returns an empty `Annotation` flagged `cancelled`, which callers must
//! read as "no information", never as "no matches".

use indexmap::IndexMap;
use instant::Instant;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::config::MatchingConfig;
use super::pattern_index::PatternIndex;
use super::regex_scan::RegexScanner;
use super::resolver::{ConflictResolver, IntervalSet};
use super::role::{RoleId, RoleKind, RoleRegistry};
use super::segment::{IcuWordSegmenter, SegmentFilter, WordSegmenter};
use super::types::{Candidate, CandidateSource, Occurrence, TextRange};
use crate::error::Result;

// =============================================================================
// Types
// =============================================================================

/// Timing per phase in microseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectTimings {
    pub total_us: u64,
    pub search_us: u64,
    pub filter_us: u64,
    pub regex_us: u64,
    pub resolve_us: u64,
}

/// Counters for one collection pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectStats {
    pub timings: CollectTimings,
    pub text_length: usize,
    pub registry_version: u64,
    pub raw_hits: usize,
    pub boundary_rejected: usize,
    pub exact_candidates: usize,
    pub regex_candidates: usize,
    pub occurrences: usize,
    pub skipped_regex_roles: usize,
    pub skipped_oversize: bool,
}

/// One accepted span with its owning role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatEntry {
    pub range: TextRange,
    pub role_id: RoleId,
    pub role: String,
    pub kind: RoleKind,
    pub source: CandidateSource,
    pub priority: i64,
}

/// Result of a collection pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Role name -> ranges. Roles appear in order of first acceptance, each
    /// role's ranges in text order.
    pub occurrences_by_role: IndexMap<String, Vec<TextRange>>,
    /// Every accepted span, sorted by position
    pub flat_list: Vec<FlatEntry>,
    /// True when the pass was cancelled; the result carries no information
    pub cancelled: bool,
    pub stats: CollectStats,
}

impl Annotation {
    fn cancelled(stats: CollectStats) -> Self {
        Self {
            cancelled: true,
            stats,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flat_list.is_empty()
    }

    /// Highest-precedence entry containing `offset`
    pub fn role_at(&self, offset: usize) -> Option<&FlatEntry> {
        let upto = self.flat_list.partition_point(|e| e.range.start <= offset);
        self.flat_list[..upto]
            .iter()
            .filter(|e| e.range.contains(offset))
            .min_by_key(|e| e.priority)
    }

    /// Ranges of `[0, text_len)` not covered by any occurrence
    pub fn plain_segments(&self, text_len: usize) -> Vec<TextRange> {
        let mut covered = IntervalSet::new();
        for entry in &self.flat_list {
            covered.insert(entry.range);
        }
        covered.gaps(&TextRange::new(0, text_len))
    }
}

// =============================================================================
// Annotator
// =============================================================================

/// Stateful annotation service over a versioned role registry
pub struct Annotator<S: WordSegmenter = IcuWordSegmenter> {
    registry: RoleRegistry,
    index: PatternIndex,
    regex: RegexScanner,
    filter: SegmentFilter<S>,
}

impl Default for Annotator<IcuWordSegmenter> {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator<IcuWordSegmenter> {
    pub fn new() -> Self {
        Self::with_segmenter(IcuWordSegmenter::new())
    }
}

impl<S: WordSegmenter> Annotator<S> {
    pub fn with_segmenter(segmenter: S) -> Self {
        Self {
            registry: RoleRegistry::empty(),
            index: PatternIndex::new(),
            regex: RegexScanner::new(),
            filter: SegmentFilter::with_segmenter(segmenter),
        }
    }

    /// Rebuild for `registry` unless it carries the version already built.
    /// Returns whether a rebuild happened.
    pub fn rebuild(&mut self, registry: &RoleRegistry) -> Result<bool> {
        if self.index.version() == Some(registry.version()) {
            trace!(version = registry.version(), "registry unchanged, skipping rebuild");
            return Ok(false);
        }
        self.force_rebuild(registry)?;
        Ok(true)
    }

    /// Unconditional full rebuild
    pub fn force_rebuild(&mut self, registry: &RoleRegistry) -> Result<()> {
        self.registry = registry.clone();
        self.regex.rebuild(registry);
        self.index.build(registry)
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn index(&self) -> &PatternIndex {
        &self.index
    }

    /// Registry version the current index was built from
    pub fn version(&self) -> Option<u64> {
        self.index.version()
    }

    /// Make sure the index matches `registry`, then collect.
    pub fn collect_for(
        &mut self,
        registry: &RoleRegistry,
        text: &str,
        config: &MatchingConfig,
        cancel: &CancellationToken,
    ) -> Result<Annotation> {
        self.rebuild(registry)?;
        Ok(self.collect(text, config, cancel))
    }

    /// Run the full pipeline over `text` with the current index
    pub fn collect(&self, text: &str, config: &MatchingConfig, cancel: &CancellationToken) -> Annotation {
        let started = Instant::now();
        let mut stats = CollectStats {
            text_length: text.len(),
            registry_version: self.registry.version(),
            skipped_regex_roles: self.regex.skipped().len(),
            ..Default::default()
        };

        if let Some(max) = config.max_text_len {
            if text.len() > max {
                warn!(len = text.len(), max, "text exceeds max_text_len, skipping annotation");
                stats.skipped_oversize = true;
                return Annotation {
                    stats,
                    ..Default::default()
                };
            }
        }

        // 1. Exact pattern search
        if cancel.is_cancelled() {
            return Annotation::cancelled(stats);
        }
        let t0 = Instant::now();
        let hits = self.index.search(text);
        stats.timings.search_us = elapsed_us(t0);

        // 2. Boundary filter + exact candidates
        let t0 = Instant::now();
        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        for group in &hits {
            for &pattern_id in &group.patterns {
                stats.raw_hits += 1;
                let (Some(role_id), Some(pattern), Some(len)) = (
                    self.index.role_of(pattern_id),
                    self.index.pattern(pattern_id),
                    self.index.pattern_len(pattern_id),
                ) else {
                    continue;
                };
                // Stale hit from a racing rebuild: drop it
                let Some(role) = self.registry.get(role_id) else {
                    continue;
                };
                let start = group.end - len;

                if self.filter.should_apply_filter(pattern, role.word_boundary_filter, config)
                    && !self.filter.is_complete_word_match(text, pattern, start, group.end)
                {
                    stats.boundary_rejected += 1;
                    continue;
                }

                if let Some(candidate) =
                    Candidate::exact(text, role_id, start, group.end, role.effective_priority())
                {
                    candidates.push(candidate);
                }
            }
        }
        stats.exact_candidates = candidates.len();
        stats.timings.filter_us = elapsed_us(t0);

        // 3. Regex roles
        let t0 = Instant::now();
        for compiled in self.regex.compiled() {
            if cancel.is_cancelled() {
                return Annotation::cancelled(stats);
            }
            let found = compiled.scan(text);
            stats.regex_candidates += found.len();
            candidates.extend(found);
        }
        stats.timings.regex_us = elapsed_us(t0);

        // 4. Resolve
        if cancel.is_cancelled() {
            return Annotation::cancelled(stats);
        }
        let t0 = Instant::now();
        let resolver = ConflictResolver::new(config.regex_overlap);
        let Some(occurrences) = resolver.resolve(text, candidates, cancel) else {
            return Annotation::cancelled(stats);
        };
        stats.timings.resolve_us = elapsed_us(t0);

        let mut annotation = self.group(occurrences);
        stats.occurrences = annotation.flat_list.len();
        stats.timings.total_us = elapsed_us(started);
        debug!(
            text_len = stats.text_length,
            raw_hits = stats.raw_hits,
            occurrences = stats.occurrences,
            total_us = stats.timings.total_us,
            "collection pass complete"
        );
        annotation.stats = stats;
        annotation
    }

    /// Group occurrences by role and flatten in text order
    fn group(&self, occurrences: Vec<Occurrence<'_>>) -> Annotation {
        let mut by_role: IndexMap<String, Vec<TextRange>> = IndexMap::new();
        let mut flat_list: Vec<FlatEntry> = Vec::with_capacity(occurrences.len());

        for occ in occurrences {
            let Some(role) = self.registry.get(occ.role) else {
                continue;
            };
            by_role.entry(role.name.clone()).or_default().push(occ.range);
            flat_list.push(FlatEntry {
                range: occ.range,
                role_id: occ.role,
                role: role.name.clone(),
                kind: role.kind,
                source: occ.source,
                priority: occ.priority,
            });
        }

        for ranges in by_role.values_mut() {
            ranges.sort();
        }
        flat_list.sort_by(|a, b| {
            a.range
                .cmp(&b.range)
                .then_with(|| a.priority.cmp(&b.priority))
                .then_with(|| a.role_id.cmp(&b.role_id))
        });

        Annotation {
            occurrences_by_role: by_role,
            flat_list,
            cancelled: false,
            stats: CollectStats::default(),
        }
    }
}

fn elapsed_us(since: Instant) -> u64 {
    since.elapsed().as_micros() as u64
}

/// One-shot collection without keeping an `Annotator` around
pub fn collect(
    registry: &RoleRegistry,
    text: &str,
    config: &MatchingConfig,
    cancel: &CancellationToken,
) -> Result<Annotation> {
    let mut annotator = Annotator::new();
    annotator.collect_for(registry, text, config, cancel)
}

// =============================================================================
// Tests
// =============================================================================
