//! RegexScanner - Per-role regex detection
//!
//! Every regex-kind role is compiled once per registry version and run over
//! the full text with find-all semantics. A role whose pattern fails to
//! compile is skipped with a warning; the rest of the pass continues.

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::role::{Role, RoleId, RoleRegistry};
use super::types::Candidate;
use crate::error::{AnnotateError, Result};

// =============================================================================
// Compilation
// =============================================================================

/// Compile a regex role, mapping JS-style flags onto the regex builder.
///
/// `g`, `y` and `u` are accepted and ignored: scans are always global and
/// Unicode-aware.
pub fn compile_role_regex(role: &Role) -> Result<Regex> {
    let source = role
        .pattern
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AnnotateError::MissingRegexPattern {
            role: role.name.clone(),
        })?;

    let mut builder = RegexBuilder::new(source);
    for flag in role.flags.as_deref().unwrap_or("").chars() {
        match flag {
            'g' | 'y' | 'u' => {}
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            other => {
                return Err(AnnotateError::InvalidRegex {
                    role: role.name.clone(),
                    message: format!("unsupported flag `{}`", other),
                })
            }
        }
    }

    builder.build().map_err(|e| AnnotateError::InvalidRegex {
        role: role.name.clone(),
        message: e.to_string(),
    })
}

/// Every non-empty match of `regex` in `text`, left to right.
///
/// Zero-width matches are dropped and force the scan forward by one char so
/// patterns like `a*` terminate.
pub fn find_all<'t>(text: &'t str, regex: &Regex, role: RoleId, priority: i64) -> Vec<Candidate<'t>> {
    let mut out = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(m) = regex.find_at(text, pos) else {
            break;
        };

        if m.start() == m.end() {
            match text[m.end()..].chars().next() {
                Some(c) => pos = m.end() + c.len_utf8(),
                None => break,
            }
            continue;
        }

        if let Some(candidate) = Candidate::regex(text, role, m.start(), m.end(), priority) {
            out.push(candidate);
        }
        pos = m.end();
    }

    out
}

/// Compile and scan one role. Uncached; see `RegexScanner` for the cached form.
pub fn scan<'t>(text: &'t str, role_id: RoleId, role: &Role) -> Result<Vec<Candidate<'t>>> {
    let regex = compile_role_regex(role)?;
    Ok(find_all(text, &regex, role_id, role.effective_priority()))
}

// =============================================================================
// RegexScanner
// =============================================================================

/// A compiled regex role
#[derive(Debug, Clone)]
pub struct CompiledRegexRole {
    pub role: RoleId,
    pub priority: i64,
    pub regex: Regex,
}

impl CompiledRegexRole {
    pub fn scan<'t>(&self, text: &'t str) -> Vec<Candidate<'t>> {
        find_all(text, &self.regex, self.role, self.priority)
    }
}

/// Compiled regex roles for one registry version
#[derive(Debug, Default)]
pub struct RegexScanner {
    compiled: Vec<CompiledRegexRole>,
    skipped: Vec<(RoleId, AnnotateError)>,
    version: Option<u64>,
}

impl RegexScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompile every regex role. Invalid roles are warned about once here
    /// and skipped by every scan until the next rebuild.
    pub fn rebuild(&mut self, registry: &RoleRegistry) {
        self.compiled.clear();
        self.skipped.clear();

        for (role_id, role) in registry.regex_roles() {
            match compile_role_regex(role) {
                Ok(regex) => self.compiled.push(CompiledRegexRole {
                    role: role_id,
                    priority: role.effective_priority(),
                    regex,
                }),
                Err(err) => {
                    warn!(role = %role.name, error = %err, "skipping regex role");
                    self.skipped.push((role_id, err));
                }
            }
        }

        self.version = Some(registry.version());
        debug!(
            version = registry.version(),
            compiled = self.compiled.len(),
            skipped = self.skipped.len(),
            "regex roles compiled"
        );
    }

    pub fn compiled(&self) -> &[CompiledRegexRole] {
        &self.compiled
    }

    /// Roles left out of scanning and why
    pub fn skipped(&self) -> &[(RoleId, AnnotateError)] {
        &self.skipped
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }
}

// =============================================================================
// Tests
// =============================================================================
