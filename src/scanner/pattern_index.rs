//! PatternIndex - Multi-pattern exact matching over role names
//!
//! Registers every role name, alias and fix candidate as a pattern and builds
//! a charwise double-array Aho-Corasick automaton (daachorse) over them.
//! The automaton runs in standard (overlapping) mode so every pattern that
//! ends at a given offset is reported: "李" and "李明" both surface at the end
//! of "李明". Choosing between them is the resolver's job, not the index's.

use daachorse::{CharwiseDoubleArrayAhoCorasick, CharwiseDoubleArrayAhoCorasickBuilder, MatchKind};
use std::collections::HashMap;
use tracing::debug;

use super::role::{normalize_pattern, RoleId, RoleRegistry};
use crate::error::{AnnotateError, Result};

// =============================================================================
// Types
// =============================================================================

/// Index of a pattern inside a built `PatternIndex`
pub type PatternId = usize;

/// All patterns terminating at one byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndHits {
    pub end: usize,
    pub patterns: Vec<PatternId>,
}

// =============================================================================
// PatternIndex
// =============================================================================

/// Exact-match automaton plus the pattern -> role table
pub struct PatternIndex {
    automaton: Option<CharwiseDoubleArrayAhoCorasick<usize>>,
    /// Normalized pattern text, indexed by `PatternId`
    patterns: Vec<String>,
    /// Owning role, indexed by `PatternId`
    pattern_roles: Vec<RoleId>,
    /// Byte length of each pattern, indexed by `PatternId`
    pattern_lens: Vec<usize>,
    lookup: HashMap<String, PatternId>,
    version: Option<u64>,
}

impl Default for PatternIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternIndex {
    pub fn new() -> Self {
        Self {
            automaton: None,
            patterns: Vec::new(),
            pattern_roles: Vec::new(),
            pattern_lens: Vec::new(),
            lookup: HashMap::new(),
            version: None,
        }
    }

    /// Rebuild from scratch for a registry snapshot.
    ///
    /// Duplicate pattern strings keep their first slot but are re-bound to the
    /// role registered last. An empty pattern set leaves no automaton, so
    /// every search comes back empty.
    pub fn build(&mut self, registry: &RoleRegistry) -> Result<()> {
        self.clear();

        for (role_id, role) in registry.iter() {
            for raw in role.exact_patterns() {
                let Some(pattern) = normalize_pattern(raw) else {
                    continue;
                };
                match self.lookup.get(&pattern) {
                    Some(&existing) => {
                        self.pattern_roles[existing] = role_id;
                    }
                    None => {
                        let id = self.patterns.len();
                        self.lookup.insert(pattern.clone(), id);
                        self.pattern_lens.push(pattern.len());
                        self.patterns.push(pattern);
                        self.pattern_roles.push(role_id);
                    }
                }
            }
        }

        if !self.patterns.is_empty() {
            let pma = CharwiseDoubleArrayAhoCorasickBuilder::new()
                .match_kind(MatchKind::Standard)
                .build(&self.patterns)
                .map_err(|e| AnnotateError::Automaton(e.to_string()))?;
            self.automaton = Some(pma);
        }

        self.version = Some(registry.version());
        debug!(
            version = registry.version(),
            roles = registry.len(),
            patterns = self.patterns.len(),
            "pattern index rebuilt"
        );
        Ok(())
    }

    /// Every end offset where at least one pattern terminates, in text order.
    ///
    /// Patterns ending at the same offset are grouped together, longest
    /// first.
    pub fn search(&self, text: &str) -> Vec<EndHits> {
        let pma = match &self.automaton {
            Some(a) => a,
            None => return vec![],
        };

        let mut hits: Vec<EndHits> = Vec::new();
        for m in pma.find_overlapping_iter(text) {
            let id = m.value();
            match hits.last_mut() {
                Some(last) if last.end == m.end() => last.patterns.push(id),
                _ => hits.push(EndHits {
                    end: m.end(),
                    patterns: vec![id],
                }),
            }
        }

        for group in &mut hits {
            group
                .patterns
                .sort_by(|a, b| self.pattern_lens[*b].cmp(&self.pattern_lens[*a]));
        }
        hits
    }

    /// Quick check if text contains any registered pattern
    pub fn contains_any(&self, text: &str) -> bool {
        match &self.automaton {
            Some(pma) => pma.find_overlapping_iter(text).next().is_some(),
            None => false,
        }
    }

    /// Role owning a pattern string (normalized before lookup)
    pub fn resolve_role(&self, pattern: &str) -> Option<RoleId> {
        let normalized = normalize_pattern(pattern)?;
        self.lookup
            .get(&normalized)
            .and_then(|&id| self.pattern_roles.get(id).copied())
    }

    /// Role owning a pattern id
    pub fn role_of(&self, id: PatternId) -> Option<RoleId> {
        self.pattern_roles.get(id).copied()
    }

    pub fn pattern(&self, id: PatternId) -> Option<&str> {
        self.patterns.get(id).map(String::as_str)
    }

    /// Byte length of a pattern
    pub fn pattern_len(&self, id: PatternId) -> Option<usize> {
        self.pattern_lens.get(id).copied()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// True once `build` has completed at least once
    pub fn is_built(&self) -> bool {
        self.version.is_some()
    }

    /// Registry version the index was built from
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn clear(&mut self) {
        self.automaton = None;
        self.patterns.clear();
        self.pattern_roles.clear();
        self.pattern_lens.clear();
        self.lookup.clear();
        self.version = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
