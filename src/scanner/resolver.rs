//! ConflictResolver - Priority-ordered, overlap-free span scheduling
//!
//! Candidates from the exact-match index and the regex scanner are merged
//! into one stream sorted by priority (ascending), then by matched length in
//! chars (descending), and scheduled greedily:
//!
//! - exact candidates are all-or-nothing: accepted only when their span is
//!   still free, after which the span is occupied;
//! - regex candidates are fragmented: the parts of their span not covered by
//!   occupied spans are emitted as separate occurrences, so a broad regex
//!   overlay yields to an exact name without losing the surrounding text.
//!
//! How regex fragments interact with each other is controlled by
//! `RegexOverlap`.
//!
//! # Complexity
//! Sorting is O(n log n); each occupancy query is O(log m) over the
//! `IntervalSet` of accepted spans, plus the fragments it produces.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use super::types::{Candidate, Occurrence, TextRange};

/// Candidates processed between cancellation checks
const CANCEL_CHECK_INTERVAL: usize = 256;

// =============================================================================
// Policy
// =============================================================================

/// How accepted regex fragments constrain later candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegexOverlap {
    /// Regex fragments block later exact candidates but not other regex
    /// roles, which may claim the same residual space.
    Shared,
    /// Regex fragments occupy their span like exact matches; the output is a
    /// strict partition.
    Exclusive,
}

impl Default for RegexOverlap {
    fn default() -> Self {
        RegexOverlap::Shared
    }
}

// =============================================================================
// IntervalSet
// =============================================================================

/// Disjoint half-open intervals keyed by start. Inserting merges overlaps.
#[derive(Debug, Clone, Default)]
pub struct IntervalSet {
    spans: BTreeMap<usize, usize>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn insert(&mut self, range: TextRange) {
        if range.is_empty() {
            return;
        }
        let mut start = range.start;
        let mut end = range.end;

        let touching: Vec<usize> = self
            .spans
            .range(..=end)
            .rev()
            .take_while(|(_, &e)| e >= start)
            .map(|(&s, _)| s)
            .collect();

        for s in touching {
            if let Some(e) = self.spans.remove(&s) {
                start = start.min(s);
                end = end.max(e);
            }
        }
        self.spans.insert(start, end);
    }

    pub fn overlaps(&self, range: &TextRange) -> bool {
        if range.is_empty() {
            return false;
        }
        self.spans
            .range(..range.end)
            .next_back()
            .map_or(false, |(_, &e)| e > range.start)
    }

    /// Sub-ranges of `range` not covered by the set, in order
    pub fn gaps(&self, range: &TextRange) -> Vec<TextRange> {
        if range.is_empty() {
            return vec![];
        }

        let mut covering: Vec<(usize, usize)> = self
            .spans
            .range(..range.end)
            .rev()
            .take_while(|(_, &e)| e > range.start)
            .map(|(&s, &e)| (s, e))
            .collect();
        covering.reverse();

        let mut out = Vec::with_capacity(covering.len() + 1);
        let mut cursor = range.start;
        for (s, e) in covering {
            if s > cursor {
                out.push(TextRange::new(cursor, s));
            }
            cursor = cursor.max(e);
        }
        if cursor < range.end {
            out.push(TextRange::new(cursor, range.end));
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = TextRange> + '_ {
        self.spans.iter().map(|(&s, &e)| TextRange::new(s, e))
    }
}

// =============================================================================
// ConflictResolver
// =============================================================================

/// Greedy priority scheduler over candidates
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver {
    regex_overlap: RegexOverlap,
}

impl ConflictResolver {
    pub fn new(regex_overlap: RegexOverlap) -> Self {
        Self { regex_overlap }
    }

    pub fn regex_overlap(&self) -> RegexOverlap {
        self.regex_overlap
    }

    /// Resolve candidates into occurrences, or `None` if cancelled.
    ///
    /// Output order follows acceptance order, not text position.
    pub fn resolve<'t>(
        &self,
        text: &'t str,
        mut candidates: Vec<Candidate<'t>>,
        cancel: &CancellationToken,
    ) -> Option<Vec<Occurrence<'t>>> {
        candidates.retain(|c| !c.is_empty());
        // Stable: identical keys keep discovery order
        candidates.sort_by_cached_key(|c| (c.priority, Reverse(c.matched_text.chars().count())));

        let mut occupied = IntervalSet::new();
        let mut regex_claimed = IntervalSet::new();
        let mut out: Vec<Occurrence<'t>> = Vec::new();

        for (i, candidate) in candidates.into_iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return None;
            }

            if !candidate.is_regex() {
                if occupied.overlaps(&candidate.range) || regex_claimed.overlaps(&candidate.range) {
                    continue;
                }
                occupied.insert(candidate.range);
                out.push(Occurrence {
                    role: candidate.role,
                    range: candidate.range,
                    matched_text: candidate.matched_text,
                    priority: candidate.priority,
                    source: candidate.source,
                });
                continue;
            }

            for fragment in occupied.gaps(&candidate.range) {
                let Some(matched_text) = text.get(fragment.start..fragment.end) else {
                    continue;
                };
                match self.regex_overlap {
                    RegexOverlap::Shared => regex_claimed.insert(fragment),
                    RegexOverlap::Exclusive => occupied.insert(fragment),
                }
                out.push(Occurrence {
                    role: candidate.role,
                    range: fragment,
                    matched_text,
                    priority: candidate.priority,
                    source: candidate.source,
                });
            }
        }

        Some(out)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::role::RoleId;

    fn exact<'t>(text: &'t str, role: u32, start: usize, end: usize, priority: i64) -> Candidate<'t> {
        Candidate::exact(text, RoleId(role), start, end, priority).unwrap()
    }

    fn regex<'t>(text: &'t str, role: u32, start: usize, end: usize, priority: i64) -> Candidate<'t> {
        Candidate::regex(text, RoleId(role), start, end, priority).unwrap()
    }

    fn resolve<'t>(text: &'t str, candidates: Vec<Candidate<'t>>) -> Vec<Occurrence<'t>> {
        ConflictResolver::default()
            .resolve(text, candidates, &CancellationToken::new())
            .unwrap()
    }

    fn sorted(mut occ: Vec<Occurrence<'_>>) -> Vec<(u32, usize, usize, String)> {
        occ.sort_by_key(|o| o.range);
        occ.into_iter()
            .map(|o| (o.role.0, o.range.start, o.range.end, o.matched_text.to_string()))
            .collect()
    }

    // -------------------------------------------------------------------------
    // IntervalSet
    // -------------------------------------------------------------------------

    #[test]
    fn test_interval_set_merges_on_insert() {
        let mut set = IntervalSet::new();
        set.insert(TextRange::new(0, 3));
        set.insert(TextRange::new(5, 8));
        set.insert(TextRange::new(2, 6));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![TextRange::new(0, 8)]);
    }

    #[test]
    fn test_interval_set_overlap_queries() {
        let mut set = IntervalSet::new();
        set.insert(TextRange::new(3, 6));
        set.insert(TextRange::new(10, 12));

        assert!(!set.overlaps(&TextRange::new(0, 3)));
        assert!(set.overlaps(&TextRange::new(0, 4)));
        assert!(!set.overlaps(&TextRange::new(6, 10)));
        assert!(set.overlaps(&TextRange::new(7, 11)));
        assert!(set.overlaps(&TextRange::new(0, 20)));
    }

    #[test]
    fn test_interval_set_gaps() {
        let mut set = IntervalSet::new();
        set.insert(TextRange::new(3, 6));
        set.insert(TextRange::new(10, 12));

        assert_eq!(
            set.gaps(&TextRange::new(0, 15)),
            vec![TextRange::new(0, 3), TextRange::new(6, 10), TextRange::new(12, 15)]
        );
        assert_eq!(set.gaps(&TextRange::new(4, 5)), vec![]);
        assert_eq!(set.gaps(&TextRange::new(4, 8)), vec![TextRange::new(6, 8)]);
    }

    // -------------------------------------------------------------------------
    // Exact scheduling
    // -------------------------------------------------------------------------

    #[test]
    fn test_longer_match_wins_at_equal_priority() {
        let text = "李明走了";
        let result = resolve(text, vec![exact(text, 1, 3, 6, 100), exact(text, 0, 0, 6, 100)]);
        assert_eq!(sorted(result), vec![(0, 0, 6, "李明".to_string())]);
    }

    #[test]
    fn test_lower_priority_value_wins_over_length() {
        let text = "李明远";
        let result = resolve(text, vec![exact(text, 0, 0, 9, 100), exact(text, 1, 0, 6, 50)]);
        assert_eq!(sorted(result), vec![(1, 0, 6, "李明".to_string())]);
    }

    #[test]
    fn test_identical_span_keeps_first_seen() {
        let text = "Strider";
        let result = resolve(text, vec![exact(text, 4, 0, 7, 100), exact(text, 2, 0, 7, 100)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].role, RoleId(4));
    }

    #[test]
    fn test_empty_candidates_discarded() {
        let text = "abc";
        let result = resolve(text, vec![exact(text, 0, 1, 1, 1), regex(text, 1, 2, 2, 500)]);
        assert!(result.is_empty());
    }

    // -------------------------------------------------------------------------
    // Regex fragmentation
    // -------------------------------------------------------------------------

    #[test]
    fn test_regex_fragments_around_exact_match() {
        let text = "aa张三bb";
        // exact 张三 at [2,8), regex over everything
        let result = resolve(text, vec![regex(text, 1, 0, 10, 500), exact(text, 0, 2, 8, 100)]);
        assert_eq!(
            sorted(result),
            vec![
                (1, 0, 2, "aa".to_string()),
                (0, 2, 8, "张三".to_string()),
                (1, 8, 10, "bb".to_string()),
            ]
        );
    }

    #[test]
    fn test_regex_fully_covered_is_dropped() {
        let text = "张三";
        let result = resolve(text, vec![exact(text, 0, 0, 6, 100), regex(text, 1, 0, 6, 500)]);
        assert_eq!(sorted(result), vec![(0, 0, 6, "张三".to_string())]);
    }

    #[test]
    fn test_shared_regex_roles_claim_same_residue() {
        let text = "abcdef";
        let result = resolve(text, vec![regex(text, 1, 0, 6, 500), regex(text, 2, 2, 4, 500)]);
        let spans = sorted(result);
        assert!(spans.contains(&(1, 0, 6, "abcdef".to_string())));
        assert!(spans.contains(&(2, 2, 4, "cd".to_string())));
    }

    #[test]
    fn test_regex_span_blocks_lower_precedence_exact() {
        let text = "abcdef";
        let result = resolve(text, vec![exact(text, 0, 1, 3, 900), regex(text, 1, 0, 6, 500)]);
        assert_eq!(sorted(result), vec![(1, 0, 6, "abcdef".to_string())]);
    }

    #[test]
    fn test_exclusive_mode_partitions() {
        let text = "abcdef";
        let resolver = ConflictResolver::new(RegexOverlap::Exclusive);
        let result = resolver
            .resolve(
                text,
                vec![regex(text, 1, 0, 4, 500), regex(text, 2, 2, 6, 500)],
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(
            sorted(result),
            vec![(1, 0, 4, "abcd".to_string()), (2, 4, 6, "ef".to_string())]
        );
    }

    #[test]
    fn test_cancelled_resolution_returns_none() {
        let text = "abc";
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = ConflictResolver::default().resolve(text, vec![exact(text, 0, 0, 3, 1)], &cancel);
        assert!(result.is_none());
    }
}
