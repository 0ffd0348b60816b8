//! Strategy 2 — fenced code-block extraction.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::ParseOptions;
use crate::value::{CompletionState, Value};

fn closed_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```([A-Za-z0-9 ]*)\n([\s\S]*?)```").unwrap())
}

fn open_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```([A-Za-z0-9 ]*)\n([\s\S]*)$").unwrap())
}

/// A fence tag may carry a path after the language (` ```json path=foo `);
/// split on the first whitespace and keep only the language half (spec §9).
fn language_tag(raw: &str) -> String {
    raw.trim().split_whitespace().next().unwrap_or("").to_string()
}

/// Extracts every fenced code block, recursively parsing each body with
/// markdown-extraction and string-fallback disabled (so a block that is
/// itself plain prose doesn't just echo back as a `String`). Returns one
/// `Markdown`-wrapped candidate per block, plus an aggregate `Array` when
/// more than one block produced a value.
pub(crate) fn extract(input: &str, opts: &ParseOptions, depth: usize) -> Vec<Value> {
    let inner_opts = ParseOptions {
        allow_markdown_json: false,
        allow_as_string: false,
        ..*opts
    };

    let mut blocks = Vec::new();
    for cap in closed_fence().captures_iter(input) {
        let tag = language_tag(&cap[1]);
        let body = &cap[2];
        let inner = super::run(body, &inner_opts, depth + 1);
        blocks.push(Value::Markdown(tag, Box::new(inner)));
    }

    if blocks.is_empty() {
        if let Some(cap) = open_fence().captures(input) {
            let tag = language_tag(&cap[1]);
            let body = &cap[2];
            let inner = super::force_outer_incomplete(super::run(body, &inner_opts, depth + 1));
            blocks.push(Value::Markdown(tag, Box::new(inner)));
        }
    }

    if blocks.len() > 1 {
        let aggregate = Value::Array(blocks.clone(), CompletionState::Complete);
        blocks.push(aggregate);
    }
    blocks
}
