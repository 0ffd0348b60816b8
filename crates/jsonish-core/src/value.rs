//! The intermediate, weakly-typed tree produced by the entry pipeline.
//!
//! `Value` is never mutated after construction — every transformation
//! (dedent, fix, simplify) produces a new tree. This keeps the scoring in
//! [`crate::coerce::union`] reproducible: the same `Value` always coerces
//! to the same result.

use std::fmt;

/// Whether a structure's closing delimiter was observed in the input.
///
/// `Array`/`Object` completion aggregates over children; see
/// [`Value::completion_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionState {
    Complete,
    Incomplete,
}

impl CompletionState {
    pub fn is_complete(self) -> bool {
        matches!(self, CompletionState::Complete)
    }

    /// `Complete` only if both inputs are `Complete`.
    pub fn and(self, other: CompletionState) -> CompletionState {
        if self.is_complete() && other.is_complete() {
            CompletionState::Complete
        } else {
            CompletionState::Incomplete
        }
    }
}

/// A provenance tag recording a single recovery transformation applied by
/// the fixing state machine. See [`crate::fixer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fix {
    GreppedForJSON,
    InferredArray,
    UnquotedKey,
    AddedClosingBracket,
    AddedClosingBrace,
    AddedClosingQuote,
    RemovedTrailingComma,
    ConvertedSingleQuote,
    ConvertedTripleQuote,
    DedentedTripleQuote,
    StrippedComment,
    MergedMultilineUnquoted,
    EmbeddedJsonAsString,
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A decimal number that preserves integer-vs-fractional distinction as
/// written in the source, independent of the target schema's numeric type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_fractional(self) -> bool {
        matches!(self, Number::Float(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// The intermediate value tree. See module docs and spec §3.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String, CompletionState),
    Number(Number, CompletionState),
    Boolean(bool),
    Null,
    Array(Vec<Value>, CompletionState),
    /// Ordered `(key, value)` pairs. Keys are **not** deduplicated here —
    /// duplicates are resolved downstream by the object/map coercers.
    Object(Vec<(String, Value)>, CompletionState),
    /// The body of a fenced code block, e.g. ` ```json\n...\n``` `.
    Markdown(String, Box<Value>),
    /// Wraps a `Value` whose production required recovery. `fixes` is
    /// append-only and, by construction, never empty.
    FixedJson(Box<Value>, Vec<Fix>),
    /// A set of candidate interpretations produced when more than one entry
    /// strategy yielded a result, plus the original input text. Exists only
    /// at the pipeline boundary — coercers must [`Value::simplify`] it away.
    AnyOf(Vec<Value>, String),
}

impl Value {
    pub fn string(text: impl Into<String>, state: CompletionState) -> Value {
        Value::String(text.into(), state)
    }

    pub fn with_fix(self, fix: Fix) -> Value {
        match self {
            Value::FixedJson(inner, mut fixes) => {
                fixes.push(fix);
                Value::FixedJson(inner, fixes)
            }
            other => Value::FixedJson(Box::new(other), vec![fix]),
        }
    }

    pub fn with_fixes(self, new_fixes: Vec<Fix>) -> Value {
        if new_fixes.is_empty() {
            return self;
        }
        match self {
            Value::FixedJson(inner, mut fixes) => {
                fixes.extend(new_fixes);
                Value::FixedJson(inner, fixes)
            }
            other => Value::FixedJson(Box::new(other), new_fixes),
        }
    }

    /// The completion state of this node, aggregating over children for
    /// `Array`/`Object`: `Incomplete` if the node itself is `Incomplete` OR
    /// any child is `Incomplete`.
    pub fn completion_state(&self) -> CompletionState {
        match self {
            Value::String(_, s) | Value::Number(_, s) => *s,
            Value::Boolean(_) | Value::Null => CompletionState::Complete,
            Value::Array(items, s) => items
                .iter()
                .fold(*s, |acc, v| acc.and(v.completion_state())),
            Value::Object(fields, s) => fields
                .iter()
                .fold(*s, |acc, (_, v)| acc.and(v.completion_state())),
            Value::Markdown(_, inner) => inner.completion_state(),
            Value::FixedJson(inner, _) => inner.completion_state(),
            Value::AnyOf(candidates, _) => candidates
                .iter()
                .map(Value::completion_state)
                .fold(CompletionState::Complete, CompletionState::and),
        }
    }

    /// Recursively marks every node `Complete`, used when `is_done` forces
    /// the outermost result to be treated as final.
    pub fn complete_deeply(self) -> Value {
        match self {
            Value::String(s, _) => Value::String(s, CompletionState::Complete),
            Value::Number(n, _) => Value::Number(n, CompletionState::Complete),
            Value::Boolean(b) => Value::Boolean(b),
            Value::Null => Value::Null,
            Value::Array(items, _) => Value::Array(
                items.into_iter().map(Value::complete_deeply).collect(),
                CompletionState::Complete,
            ),
            Value::Object(fields, _) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.complete_deeply()))
                    .collect(),
                CompletionState::Complete,
            ),
            Value::Markdown(tag, inner) => Value::Markdown(tag, Box::new(inner.complete_deeply())),
            Value::FixedJson(inner, fixes) => {
                Value::FixedJson(Box::new(inner.complete_deeply()), fixes)
            }
            Value::AnyOf(candidates, text) => Value::AnyOf(
                candidates.into_iter().map(Value::complete_deeply).collect(),
                text,
            ),
        }
    }

    /// Collapses a single-element `AnyOf` to that element (recursively, in
    /// case the sole candidate is itself a singleton `AnyOf`). Leaves
    /// multi-candidate `AnyOf` untouched — callers that must not see `AnyOf`
    /// (coercers) handle the multi-candidate case themselves.
    pub fn simplify(self) -> Value {
        match self {
            Value::AnyOf(mut candidates, _) if candidates.len() == 1 => {
                candidates.pop().unwrap().simplify()
            }
            other => other,
        }
    }

    /// Strips `Markdown`/`FixedJson` wrappers to reach the innermost value,
    /// without touching `AnyOf`. Used by coercers that need the underlying
    /// shape but want to track how many wrapper layers were peeled (for
    /// `ObjectFromMarkdown(depth)`).
    pub fn unwrap_layers(&self) -> (&Value, usize) {
        let mut depth = 0;
        let mut current = self;
        loop {
            match current {
                Value::Markdown(_, inner) => {
                    depth += 1;
                    current = inner;
                }
                Value::FixedJson(inner, _) => {
                    current = inner;
                }
                _ => return (current, depth),
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether *this* node (not its children — those are handled by their
    /// own recursive coercion) carries its own `Incomplete` marker, piercing
    /// `Markdown`/`FixedJson`/`AnyOf` wrappers. Used by the coercer to attach
    /// `CoercionFlag::Incomplete` for confidence scoring (spec §3/§7); the
    /// flag itself carries zero scoring penalty.
    pub fn is_self_incomplete(&self) -> bool {
        match self {
            Value::String(_, s) | Value::Number(_, s) => *s == CompletionState::Incomplete,
            Value::Array(_, s) | Value::Object(_, s) => *s == CompletionState::Incomplete,
            Value::Boolean(_) | Value::Null => false,
            Value::Markdown(_, inner) => inner.is_self_incomplete(),
            Value::FixedJson(inner, _) => inner.is_self_incomplete(),
            Value::AnyOf(candidates, _) => candidates.iter().any(Value::is_self_incomplete),
        }
    }

    /// A structural digest used by [`crate::context::ParsingContext`] to key
    /// the recursion-guard visited-set. Two values with the same shape and
    /// content hash equal; this is not cryptographic, only collision-resistant
    /// enough for breaking cycles within a single parse.
    pub fn digest(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash_into(&mut hasher);
        hasher.finish()
    }

    fn hash_into<H: std::hash::Hasher>(&self, hasher: &mut H) {
        use std::hash::Hash;
        self.shape_tag().hash(hasher);
        match self {
            Value::String(s, _) => s.hash(hasher),
            Value::Number(n, _) => n.to_string().hash(hasher),
            Value::Boolean(b) => b.hash(hasher),
            Value::Null => {}
            Value::Array(items, _) => {
                for item in items {
                    item.hash_into(hasher);
                }
            }
            Value::Object(fields, _) => {
                for (k, v) in fields {
                    k.hash(hasher);
                    v.hash_into(hasher);
                }
            }
            Value::Markdown(tag, inner) => {
                tag.hash(hasher);
                inner.hash_into(hasher);
            }
            Value::FixedJson(inner, _) => inner.hash_into(hasher),
            Value::AnyOf(candidates, text) => {
                text.hash(hasher);
                for c in candidates {
                    c.hash_into(hasher);
                }
            }
        }
    }

    /// A short, stable tag used for structural-digest recursion guards; not
    /// a full content hash (two different strings both report `"string"`).
    pub fn shape_tag(&self) -> &'static str {
        match self {
            Value::String(..) => "string",
            Value::Number(..) => "number",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Array(..) => "array",
            Value::Object(..) => "object",
            Value::Markdown(..) => "markdown",
            Value::FixedJson(..) => "fixed_json",
            Value::AnyOf(..) => "any_of",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_state_aggregates_over_children() {
        let complete_child = Value::String("a".into(), CompletionState::Complete);
        let incomplete_child = Value::String("b".into(), CompletionState::Incomplete);

        let arr = Value::Array(
            vec![complete_child.clone(), incomplete_child.clone()],
            CompletionState::Complete,
        );
        assert_eq!(arr.completion_state(), CompletionState::Incomplete);

        let arr_all_complete = Value::Array(vec![complete_child], CompletionState::Complete);
        assert_eq!(arr_all_complete.completion_state(), CompletionState::Complete);
    }

    #[test]
    fn self_incomplete_propagates_even_with_complete_children() {
        let child = Value::String("a".into(), CompletionState::Complete);
        let arr = Value::Array(vec![child], CompletionState::Incomplete);
        assert_eq!(arr.completion_state(), CompletionState::Incomplete);
    }

    #[test]
    fn with_fix_flattens_existing_fixed_json() {
        let v = Value::Null.with_fix(Fix::RemovedTrailingComma);
        let v = v.with_fix(Fix::AddedClosingBrace);
        match v {
            Value::FixedJson(inner, fixes) => {
                assert_eq!(*inner, Value::Null);
                assert_eq!(fixes, vec![Fix::RemovedTrailingComma, Fix::AddedClosingBrace]);
            }
            _ => panic!("expected FixedJson"),
        }
    }

    #[test]
    fn simplify_collapses_singleton_any_of() {
        let v = Value::AnyOf(vec![Value::Boolean(true)], "true".into());
        assert_eq!(v.simplify(), Value::Boolean(true));
    }

    #[test]
    fn simplify_leaves_multi_candidate_any_of() {
        let v = Value::AnyOf(
            vec![Value::Boolean(true), Value::Null],
            "true or null".into(),
        );
        assert!(matches!(v.simplify(), Value::AnyOf(candidates, _) if candidates.len() == 2));
    }

    #[test]
    fn digest_is_stable_and_distinguishes_content() {
        let a = Value::String("x".into(), CompletionState::Complete);
        let b = Value::String("x".into(), CompletionState::Complete);
        let c = Value::String("y".into(), CompletionState::Complete);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn unwrap_layers_counts_markdown_depth() {
        let inner = Value::String("x".into(), CompletionState::Complete);
        let wrapped = Value::Markdown(
            "json".into(),
            Box::new(Value::Markdown("json".into(), Box::new(inner.clone()))),
        );
        let (unwrapped, depth) = wrapped.unwrap_layers();
        assert_eq!(*unwrapped, inner);
        assert_eq!(depth, 2);
    }
}
