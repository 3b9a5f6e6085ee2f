//! RoleScan: Role Occurrence Matching & Annotation Engine
//!
//! Finds every occurrence of a dynamic set of named roles (characters,
//! vocabulary terms, sensitive words, regex detectors) in prose and returns a
//! clean, priority-resolved partition of the text into role spans.
//!
//! # Architecture
//!
//! ## Scanner Components
//! - `pattern_index.rs` - PatternIndex: names/aliases/fixes via double-array Aho-Corasick
//! - `segment.rs` - SegmentFilter: word-boundary check for short patterns
//! - `regex_scan.rs` - RegexScanner: per-role regex find-all
//! - `resolver.rs` - ConflictResolver: greedy priority scheduling with regex fragmentation
//! - `collector.rs` - Annotator: the pipeline facade
//! - `worker.rs` - WorkerHandle: off-thread build/search with timeouts (native only)
//! - `wasm.rs` - RoleAnnotator: JS bindings
//!
//! # Usage
//! ```rust
//! use rolescan::{collect, MatchingConfig, Role, RoleKind, RoleRegistry};
//! use tokio_util::sync::CancellationToken;
//!
//! let registry = RoleRegistry::new(1, vec![
//!     Role::new("张三", RoleKind::Character),
//!     Role::regex("zhang", "张.{1,3}"),
//! ]);
//! let result = collect(&registry, "张三和张伟都来了", &MatchingConfig::default(), &CancellationToken::new())?;
//! assert!(result.occurrences_by_role.contains_key("张三"));
//! # Ok::<(), rolescan::AnnotateError>(())
//! ```

pub mod error;
pub mod scanner;

pub use error::{AnnotateError, Result};
pub use scanner::*;

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("rolescan v{}", env!("CARGO_PKG_VERSION"))
}
