//! Options controlling the entry pipeline and recursion guards.

use serde::{Deserialize, Serialize};

/// Options for [`crate::parse`].
///
/// ## Serialization format
///
/// Fields are serialized in `kebab-case` (e.g., `depth-limit`, `is-done`).
/// This naming convention is part of the public API contract for FFI and config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ParseOptions {
    /// Enables strategy 3 — balanced-bracket multi-object scan.
    pub find_all_json_objects: bool,
    /// Enables strategy 2 — fenced code-block extraction.
    pub allow_markdown_json: bool,
    /// Enables strategy 4 — the fixing state machine.
    pub allow_fixes: bool,
    /// Enables strategy 5 — raw string fallback.
    pub allow_as_string: bool,
    /// When `false`, the outermost `Value` is left `Incomplete` regardless of
    /// whether its closing delimiter was observed. Use for text that may be a
    /// truncated mid-stream snapshot rather than a final answer.
    pub is_done: bool,
    /// Maximum recursion depth for the entry pipeline, the coercer, and union
    /// resolution. Shared across all three so a pathological schema/input pair
    /// cannot blow the stack via any one of them.
    pub depth_limit: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            find_all_json_objects: true,
            allow_markdown_json: true,
            allow_fixes: true,
            allow_as_string: true,
            is_done: true,
            depth_limit: 100,
        }
    }
}
