pub mod role;
pub mod config;
pub mod types;
pub mod pattern_index;
pub mod segment;
pub mod regex_scan;
pub mod resolver;
pub mod collector;
#[cfg(not(target_arch = "wasm32"))]
pub mod worker;
pub mod wasm;

pub use role::*;
pub use config::*;
pub use types::*;
pub use pattern_index::*;
pub use segment::*;
pub use regex_scan::{compile_role_regex, CompiledRegexRole, RegexScanner};
pub use resolver::*;
pub use collector::*;
#[cfg(not(target_arch = "wasm32"))]
pub use worker::*;
pub use wasm::*;

#[cfg(test)]
mod tests;
