//! Scope tracking, recursion guards, and per-parse caches.
//!
//! One [`ParsingContext`] is created per top-level [`crate::parse`] call and
//! threaded through every coercer. It is mutated (via interior mutability)
//! as coercion descends, but never escapes the call — all caches are
//! discarded when `parse` returns.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::coerce::CoercedValue;

/// `(schema-identity, value-digest)` — the key the recursion guard and the
/// union-result cache both use to recognize "we've been here before".
pub type VisitKey = (usize, u64);

pub struct ParsingContext {
    scope: Vec<String>,
    depth_limit: usize,
    depth: usize,
    visited: RefCell<HashSet<VisitKey>>,
    union_cache: RefCell<HashMap<VisitKey, CoercedValue>>,
}

impl ParsingContext {
    pub fn new(depth_limit: usize) -> Self {
        Self {
            scope: Vec::new(),
            depth_limit,
            depth: 0,
            visited: RefCell::new(HashSet::new()),
            union_cache: RefCell::new(HashMap::new()),
        }
    }

    /// A dotted path for error messages, e.g. `"user.addresses[0].zip"`.
    pub fn scope_path(&self) -> String {
        self.scope.join(".")
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    pub fn depth_exceeded(&self) -> bool {
        self.depth > self.depth_limit
    }

    /// Runs `f` with `field` pushed onto the scope path and the depth
    /// counter incremented, restoring both on return (even on early return
    /// via `?`, since this uses a guard value rather than manual push/pop).
    pub fn enter_field<T>(&mut self, field: impl Into<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scope.push(field.into());
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        self.scope.pop();
        result
    }

    pub fn enter_index<T>(&mut self, index: usize, f: impl FnOnce(&mut Self) -> T) -> T {
        self.enter_field(format!("[{index}]"), f)
    }

    /// Marks `key` visited for the remainder of this scope's recursion guard
    /// window. Returns `true` if it was already visited (caller should fail
    /// with `CircularReference` instead of descending).
    pub fn mark_visited(&self, key: VisitKey) -> bool {
        !self.visited.borrow_mut().insert(key)
    }

    pub fn unmark_visited(&self, key: &VisitKey) {
        self.visited.borrow_mut().remove(key);
    }

    pub fn cached_union_result(&self, key: VisitKey) -> Option<CoercedValue> {
        self.union_cache.borrow().get(&key).cloned()
    }

    pub fn cache_union_result(&self, key: VisitKey, value: CoercedValue) {
        self.union_cache.borrow_mut().insert(key, value);
    }
}
