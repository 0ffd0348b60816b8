//! The multi-strategy entry pipeline (spec §4.3).
//!
//! Tries progressively more permissive interpretations of the input and
//! combines whatever succeeds into an `AnyOf`, left for the coercer (via
//! [`crate::coerce::union`]-style scoring at the primitive level, or
//! explicit `AnyOf` handling) to resolve.

mod markdown;
mod multi_object;

use crate::config::ParseOptions;
use crate::fixer;
use crate::value::{CompletionState, Number, Value};

/// Runs the full entry pipeline. `depth` is the current recursion depth —
/// markdown and multi-object extraction recurse into their inner blocks.
pub(crate) fn run(input: &str, opts: &ParseOptions, depth: usize) -> Value {
    if depth > opts.depth_limit {
        tracing::warn!(depth, limit = opts.depth_limit, "pipeline depth guard tripped, falling back to raw string");
        return Value::string(input, CompletionState::Incomplete);
    }

    let mut candidates: Vec<Value> = Vec::new();

    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(input) {
        candidates.push(strict_result(parsed));
    }

    if opts.allow_markdown_json {
        candidates.extend(markdown::extract(input, opts, depth));
    }

    if opts.find_all_json_objects {
        candidates.extend(multi_object::extract(input, opts, depth));
    }

    if opts.allow_fixes {
        let (value, fixes) = fixer::fix(input, opts.find_all_json_objects);
        candidates.push(value.with_fixes(fixes));
    }

    if opts.allow_as_string {
        candidates.push(Value::string(input, CompletionState::Complete));
    }

    combine(candidates, input)
}

fn combine(candidates: Vec<Value>, input: &str) -> Value {
    match candidates.len() {
        0 => Value::string(input, CompletionState::Incomplete),
        1 => candidates.into_iter().next().unwrap(),
        _ => Value::AnyOf(candidates, input.to_string()).simplify(),
    }
}

/// Converts a successfully-strict-parsed `serde_json::Value` into our
/// `Value`, marking the outermost scalar per spec: a top-level string
/// required its closing quote (`Complete`); a top-level bare number might
/// be truncated mid-digit in streamed input, so it's marked `Incomplete`.
fn strict_result(parsed: serde_json::Value) -> Value {
    let v = json_to_value(&parsed);
    match v {
        Value::Number(n, _) => Value::Number(n, CompletionState::Incomplete),
        other => other,
    }
}

fn json_to_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            let num = if let Some(i) = n.as_i64() {
                Number::Integer(i)
            } else {
                Number::Float(n.as_f64().unwrap_or(0.0))
            };
            Value::Number(num, CompletionState::Complete)
        }
        serde_json::Value::String(s) => Value::String(s.clone(), CompletionState::Complete),
        serde_json::Value::Array(items) => Value::Array(
            items.iter().map(json_to_value).collect(),
            CompletionState::Complete,
        ),
        serde_json::Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
            CompletionState::Complete,
        ),
    }
}

/// Applied once at the top of [`crate::parse`] when `is_done` is `false`:
/// forces the outermost completion-bearing node to `Incomplete`, piercing
/// through `Markdown`/`FixedJson`/`AnyOf` wrappers (which carry no
/// completion state of their own) without touching nested children.
pub(crate) fn force_outer_incomplete(v: Value) -> Value {
    match v {
        Value::String(s, _) => Value::String(s, CompletionState::Incomplete),
        Value::Number(n, _) => Value::Number(n, CompletionState::Incomplete),
        Value::Array(items, _) => Value::Array(items, CompletionState::Incomplete),
        Value::Object(fields, _) => Value::Object(fields, CompletionState::Incomplete),
        Value::Markdown(tag, inner) => Value::Markdown(tag, Box::new(force_outer_incomplete(*inner))),
        Value::FixedJson(inner, fixes) => {
            Value::FixedJson(Box::new(force_outer_incomplete(*inner)), fixes)
        }
        Value::AnyOf(candidates, text) => Value::AnyOf(
            candidates.into_iter().map(force_outer_incomplete).collect(),
            text,
        ),
        other => other,
    }
}
