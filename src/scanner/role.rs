//! Role data model: the named entities the annotator looks for.
//!
//! A `Role` is one entry of the externally-owned registry (character,
//! vocabulary term, sensitive word, or regex detector). The registry is
//! handed to the engine as an immutable, versioned `RoleRegistry` snapshot;
//! every intermediate structure refers to roles by `RoleId` (index into the
//! snapshot) so nothing clones role records on the hot path.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

use crate::error::{AnnotateError, Result};

// =============================================================================
// Priorities
// =============================================================================

/// Default priority of exact-match roles (lower wins).
pub const DEFAULT_EXACT_PRIORITY: i64 = 100;

/// Offset added to every regex role's priority. With no explicit priority a
/// regex role resolves to exactly this value, 400 points behind the default
/// exact-match priority.
pub const REGEX_PRIORITY_OFFSET: i64 = 500;

// =============================================================================
// Types
// =============================================================================

/// Kind of role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleKind {
    Character,
    Vocabulary,
    SensitiveWord,
    Regex,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Character => "character",
            RoleKind::Vocabulary => "vocabulary",
            RoleKind::SensitiveWord => "sensitive-word",
            RoleKind::Regex => "regex",
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, RoleKind::Regex)
    }
}

impl Default for RoleKind {
    fn default() -> Self {
        RoleKind::Character
    }
}

/// A single registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Replacement candidates; matched exactly like aliases.
    #[serde(default, alias = "fixes", alias = "fixs")]
    pub fix_candidates: Vec<String>,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: RoleKind,
    /// Regex source (regex roles only)
    #[serde(default, alias = "regex")]
    pub pattern: Option<String>,
    /// JS-style regex flags (regex roles only)
    #[serde(default, alias = "regexFlags")]
    pub flags: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    /// Explicit word-boundary filter override; `None` defers to the length rule.
    #[serde(default)]
    pub word_boundary_filter: Option<bool>,
}

impl Role {
    /// Exact-match role with defaults
    pub fn new(name: impl Into<String>, kind: RoleKind) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            fix_candidates: Vec::new(),
            kind,
            pattern: None,
            flags: None,
            priority: None,
            word_boundary_filter: None,
        }
    }

    /// Regex role with defaults
    pub fn regex(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::new(name, RoleKind::Regex)
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fix_candidates<I, S>(mut self, fixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fix_candidates = fixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = Some(flags.into());
        self
    }

    pub fn with_word_boundary_filter(mut self, enabled: bool) -> Self {
        self.word_boundary_filter = Some(enabled);
        self
    }

    pub fn is_regex(&self) -> bool {
        self.kind.is_regex()
    }

    /// Resolved scheduling priority (lower wins).
    pub fn effective_priority(&self) -> i64 {
        if self.is_regex() {
            self.priority.unwrap_or(0).saturating_add(REGEX_PRIORITY_OFFSET)
        } else {
            self.priority.unwrap_or(DEFAULT_EXACT_PRIORITY)
        }
    }

    /// Name, aliases and fix candidates in registration order.
    ///
    /// Regex roles contribute no exact patterns.
    pub fn exact_patterns(&self) -> impl Iterator<Item = &str> {
        let take = !self.is_regex();
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .chain(self.fix_candidates.iter().map(String::as_str))
            .filter(move |_| take)
    }
}

/// NFC-normalize and trim a pattern. Returns `None` for blank input.
pub fn normalize_pattern(raw: &str) -> Option<String> {
    let normalized: String = raw.trim().nfc().collect();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

// =============================================================================
// RoleRegistry
// =============================================================================

/// Index of a role inside a `RoleRegistry` snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(pub u32);

impl RoleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Immutable, versioned snapshot of the role registry.
///
/// Cloning is cheap (shared slice). A change in `version` tells the
/// annotator to rebuild its index.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    version: u64,
    roles: Arc<[Role]>,
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl RoleRegistry {
    pub fn new(version: u64, roles: Vec<Role>) -> Self {
        Self {
            version,
            roles: roles.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    /// Parse a JSON array of roles into a snapshot
    pub fn from_json(version: u64, json: &str) -> Result<Self> {
        let roles: Vec<Role> =
            serde_json::from_str(json).map_err(|e| AnnotateError::Serialization(e.to_string()))?;
        Ok(Self::new(version, roles))
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn get(&self, id: RoleId) -> Option<&Role> {
        self.roles.get(id.index())
    }

    /// Iterate `(RoleId, &Role)` pairs in registry order
    pub fn iter(&self) -> impl Iterator<Item = (RoleId, &Role)> {
        self.roles
            .iter()
            .enumerate()
            .map(|(idx, role)| (RoleId(idx as u32), role))
    }

    /// Regex-kind roles only
    pub fn regex_roles(&self) -> impl Iterator<Item = (RoleId, &Role)> {
        self.iter().filter(|(_, role)| role.is_regex())
    }
}

// =============================================================================
// Tests
// =============================================================================
