//! Strategy 3 — balanced-bracket multi-object scan.

use crate::config::ParseOptions;
use crate::value::{CompletionState, Fix, Value};

/// Scans for top-level balanced `{...}`/`[...]` regions (bracket counting,
/// respecting quoted-string boundaries), recursively parses each with
/// multi-object scanning and string-fallback disabled, and returns the
/// resulting candidate(s). A single region is returned unwrapped unless it
/// doesn't span the whole (trimmed) input, in which case it is flagged
/// `GreppedForJSON`; two or more regions are each flagged `GreppedForJSON`
/// plus an aggregate `Array`.
pub(crate) fn extract(input: &str, opts: &ParseOptions, depth: usize) -> Vec<Value> {
    let chars: Vec<char> = input.chars().collect();
    let regions = find_regions(&chars);
    if regions.is_empty() {
        return Vec::new();
    }

    let inner_opts = ParseOptions {
        find_all_json_objects: false,
        allow_as_string: false,
        ..*opts
    };

    let parsed: Vec<(Value, String)> = regions
        .iter()
        .map(|&(start, end)| {
            let text: String = chars[start..end].iter().collect();
            let value = super::run(&text, &inner_opts, depth + 1);
            (value, text)
        })
        .collect();

    if parsed.len() == 1 {
        let (value, text) = parsed.into_iter().next().unwrap();
        return if text.trim() == input.trim() {
            vec![value]
        } else {
            vec![value.with_fix(Fix::GreppedForJSON)]
        };
    }

    let wrapped: Vec<Value> = parsed
        .into_iter()
        .map(|(v, _)| v.with_fix(Fix::GreppedForJSON))
        .collect();
    let aggregate = Value::Array(wrapped.clone(), CompletionState::Complete);
    let mut result = wrapped;
    result.push(aggregate);
    result
}

/// Finds maximal, non-overlapping, top-level balanced bracket regions.
fn find_regions(chars: &[char]) -> Vec<(usize, usize)> {
    let mut regions = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' || chars[i] == '[' {
            if let Some(end) = scan_balanced(chars, i) {
                regions.push((i, end + 1));
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    regions
}

fn scan_balanced(chars: &[char], start: usize) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut i = start;
    let mut in_string: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        if let Some(quote) = in_string {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
