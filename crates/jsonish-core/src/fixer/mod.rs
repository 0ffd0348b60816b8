//! The fixing tokenizer/state machine (spec §4.2) — the hardest subsystem.
//!
//! Implemented as a recursive-descent scanner over a `Vec<char>` rather than
//! a literal push-down automaton: each `parse_*` method corresponds to one
//! collection on the conceptual "collection stack" (the call stack plays
//! that role), which keeps the heuristics readable without losing any of
//! the described behavior. See `DESIGN.md` for the rationale.

mod classify;
mod heuristics;

use crate::value::{CompletionState, Fix, Value};

/// Runs the fixer over the full input.
///
/// When `multi_emit` is true, top-level values found back to back (no
/// wrapping array, e.g. `{"a":1} {"b":2}`) are collected into a single
/// `Array`, flagged `InferredArray`, instead of discarding everything past
/// the first one.
pub fn fix(input: &str, multi_emit: bool) -> (Value, Vec<Fix>) {
    let mut scanner = Scanner::new(input);
    scanner.skip_trivia();

    if scanner.at_end() {
        return (Value::string("", CompletionState::Incomplete), Vec::new());
    }

    let first = scanner.parse_value();
    if !multi_emit {
        return (first, scanner.fixes);
    }

    let mut values = vec![first];
    loop {
        scanner.skip_trivia();
        if scanner.at_end() {
            break;
        }
        values.push(scanner.parse_value());
    }

    if values.len() == 1 {
        (values.pop().unwrap(), scanner.fixes)
    } else {
        scanner.fixes.push(Fix::InferredArray);
        (Value::Array(values, CompletionState::Complete), scanner.fixes)
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    fixes: Vec<Fix>,
}

impl Scanner {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            fixes: Vec::new(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    /// Skips whitespace and `//`/`/* */` comments, in any order, emitting
    /// `StrippedComment` for each comment consumed.
    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(|c| c.is_whitespace()) {
                self.pos += 1;
            }
            if self.starts_with("//") {
                while self.peek().is_some() && self.peek() != Some('\n') {
                    self.pos += 1;
                }
                self.fixes.push(Fix::StrippedComment);
                continue;
            }
            if self.starts_with("/*") {
                self.pos += 2;
                while !self.at_end() && !self.starts_with("*/") {
                    self.pos += 1;
                }
                if self.starts_with("*/") {
                    self.pos += 2;
                }
                self.fixes.push(Fix::StrippedComment);
                continue;
            }
            break;
        }
    }

    /// Dispatches on the current character, mirroring "no collection open /
    /// inside object awaiting value / inside array" in spec §4.2.
    fn parse_value(&mut self) -> Value {
        self.skip_trivia();
        match self.peek() {
            None => Value::string("", CompletionState::Incomplete),
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') => self.parse_quoted_string('"'),
            Some('\'') => self.parse_quoted_string('\''),
            Some('`') if self.starts_with("```") => self.parse_backtick_fence(),
            Some('`') => self.parse_quoted_string('`'),
            _ if self.starts_with("\"\"\"") => self.parse_triple_quoted('"'),
            _ if self.starts_with("'''") => self.parse_triple_quoted('\''),
            _ => self.parse_unquoted_value(),
        }
    }

    fn parse_object(&mut self) -> Value {
        self.pos += 1; // consume '{'
        let mut fields: Vec<(String, Value)> = Vec::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                None => {
                    tracing::trace!("object truncated at EOF, auto-closing");
                    self.fixes.push(Fix::AddedClosingBrace);
                    return Value::Object(fields, CompletionState::Incomplete);
                }
                Some('}') => {
                    self.pos += 1;
                    return Value::Object(fields, CompletionState::Complete);
                }
                Some(',') => {
                    self.pos += 1;
                    self.fixes.push(Fix::RemovedTrailingComma);
                    continue;
                }
                _ => {}
            }

            let key = self.parse_key();
            self.skip_trivia();
            if self.peek() == Some(':') {
                self.pos += 1;
            }
            self.skip_trivia();

            let value = match self.peek() {
                None | Some('}') | Some(',') => Value::Null,
                _ => self.parse_value(),
            };
            fields.push((key, value));

            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    self.skip_trivia();
                    if self.peek() == Some('}') {
                        self.pos += 1;
                        self.fixes.push(Fix::RemovedTrailingComma);
                        return Value::Object(fields, CompletionState::Complete);
                    }
                }
                Some('}') => {
                    self.pos += 1;
                    return Value::Object(fields, CompletionState::Complete);
                }
                None => {
                    self.fixes.push(Fix::AddedClosingBrace);
                    return Value::Object(fields, CompletionState::Incomplete);
                }
                _ => {
                    // Missing comma before the next key — tolerate it.
                }
            }
        }
    }

    /// Parses an object key: quoted as normal, or an unquoted identifier run
    /// (flagged `UnquotedKey`).
    fn parse_key(&mut self) -> String {
        match self.peek() {
            Some(q @ ('"' | '\'' | '`')) => match self.parse_quoted_string(q) {
                Value::String(s, _) => s,
                Value::FixedJson(inner, _) => match *inner {
                    Value::String(s, _) => s,
                    other => format!("{other:?}"),
                },
                other => format!("{other:?}"),
            },
            _ => {
                let (text, _multiline) = self.consume_unquoted_token();
                self.fixes.push(Fix::UnquotedKey);
                text
            }
        }
    }

    fn parse_array(&mut self) -> Value {
        self.pos += 1; // consume '['
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                None => {
                    tracing::trace!("array truncated at EOF, auto-closing");
                    self.fixes.push(Fix::AddedClosingBracket);
                    return Value::Array(items, CompletionState::Incomplete);
                }
                Some(']') => {
                    self.pos += 1;
                    return Value::Array(items, CompletionState::Complete);
                }
                Some(',') => {
                    self.pos += 1;
                    self.fixes.push(Fix::RemovedTrailingComma);
                    continue;
                }
                _ => {}
            }

            items.push(self.parse_value());
            self.skip_trivia();

            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    self.skip_trivia();
                    if self.peek() == Some(']') {
                        self.pos += 1;
                        self.fixes.push(Fix::RemovedTrailingComma);
                        return Value::Array(items, CompletionState::Complete);
                    }
                }
                Some(']') => {
                    self.pos += 1;
                    return Value::Array(items, CompletionState::Complete);
                }
                None => {
                    self.fixes.push(Fix::AddedClosingBracket);
                    return Value::Array(items, CompletionState::Incomplete);
                }
                _ => {}
            }
        }
    }

    fn parse_quoted_string(&mut self, quote: char) -> Value {
        self.pos += 1; // consume opening quote
        let mut buffer = String::new();
        if quote == '\'' {
            self.fixes.push(Fix::ConvertedSingleQuote);
        }

        loop {
            match self.peek() {
                None => {
                    self.fixes.push(Fix::AddedClosingQuote);
                    return finish_quoted(buffer, quote, CompletionState::Incomplete);
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.advance() {
                        Some('n') => buffer.push('\n'),
                        Some('t') => buffer.push('\t'),
                        Some('r') => buffer.push('\r'),
                        Some('b') => buffer.push('\u{8}'),
                        Some('f') => buffer.push('\u{c}'),
                        Some('\\') => buffer.push('\\'),
                        Some('/') => buffer.push('/'),
                        Some('"') => buffer.push('"'),
                        Some('\'') => buffer.push('\''),
                        Some('u') => {
                            let hex: String = (0..4).filter_map(|i| self.peek_at(i)).collect();
                            if hex.len() == 4 {
                                if let Ok(code) = u32::from_str_radix(&hex, 16) {
                                    if let Some(ch) = char::from_u32(code) {
                                        buffer.push(ch);
                                    }
                                }
                                self.pos += 4;
                            }
                        }
                        Some(other) => buffer.push(other),
                        None => {}
                    }
                }
                Some(c) if c == quote => {
                    let after = self.pos + 1;
                    if heuristics::looks_like_string_close(&self.chars, after) {
                        self.pos += 1;
                        return finish_quoted(buffer, quote, CompletionState::Complete);
                    }
                    buffer.push(c);
                    self.pos += 1;
                }
                Some(c) => {
                    buffer.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_triple_quoted(&mut self, kind: char) -> Value {
        self.pos += 3; // consume opening delimiter
        let delim: String = std::iter::repeat(kind).take(3).collect();
        let start = self.pos;

        while !self.at_end() && !self.starts_with(&delim) {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        let state = if self.starts_with(&delim) {
            self.pos += 3;
            CompletionState::Complete
        } else {
            CompletionState::Incomplete
        };

        self.fixes.push(Fix::ConvertedTripleQuote);
        let dedented = dedent(&raw);
        if dedented != raw {
            self.fixes.push(Fix::DedentedTripleQuote);
        }
        Value::string(dedented, state)
    }

    /// Backtick code-fence: ` ```tag\n...\n``` `. The first line after the
    /// opening delimiter is the tag; per spec, a tag containing internal
    /// whitespace (`"json path=foo"`) is kept whole rather than split.
    fn parse_backtick_fence(&mut self) -> Value {
        self.pos += 3;
        let tag_start = self.pos;
        while self.peek().is_some() && self.peek() != Some('\n') {
            self.pos += 1;
        }
        let tag: String = self.chars[tag_start..self.pos].iter().collect();
        if self.peek() == Some('\n') {
            self.pos += 1;
        }

        let body_start = self.pos;
        while !self.at_end() && !self.starts_with("```") {
            self.pos += 1;
        }
        let raw_body: String = self.chars[body_start..self.pos].iter().collect();
        let state = if self.starts_with("```") {
            self.pos += 3;
            CompletionState::Complete
        } else {
            CompletionState::Incomplete
        };

        let body = dedent(raw_body.trim_end_matches('\n'));
        let lang_tag = tag.trim().split_whitespace().next().unwrap_or("").to_string();
        Value::Markdown(lang_tag, Box::new(Value::string(body, state)))
    }

    /// Reads digits/`.`/`-`/`+`/`true`/`false`/`null` and otherwise-bare
    /// unquoted content, applying the null-then-brace heuristic before
    /// falling through to plain classification.
    fn parse_unquoted_value(&mut self) -> Value {
        if self.starts_with("null{") {
            if let Some(v) = self.try_null_then_brace() {
                return v;
            }
        }
        let (text, multiline) = self.consume_unquoted_token();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Value::string("", CompletionState::Incomplete);
        }
        let state = if self.at_end() {
            CompletionState::Incomplete
        } else {
            CompletionState::Complete
        };
        let value = classify::classify_unquoted(trimmed, state);
        if multiline {
            value.with_fix(Fix::MergedMultilineUnquoted)
        } else {
            value
        }
    }

    /// Heuristic 3 — **null-then-brace**: `null{` is reinterpreted as the
    /// start of a string capturing the embedded JSON up to the first
    /// complete string *value* (or, failing that, to the first unterminated
    /// string literal, or EOF). Quoted tokens immediately followed by `:`
    /// are object keys, not values, and are skipped over rather than
    /// treated as the thing to capture through.
    fn try_null_then_brace(&mut self) -> Option<Value> {
        let capture_start = self.pos;
        let mut i = self.pos + 4; // index of '{'

        loop {
            let mut quote = None;
            while i < self.chars.len() {
                if self.chars[i] == '"' {
                    quote = Some(i);
                    break;
                }
                i += 1;
            }

            let q = match quote {
                Some(q) => q,
                None => {
                    let end = self.chars.len();
                    let text: String = self.chars[capture_start..end].iter().collect();
                    self.pos = end;
                    return Some(Value::string(text, CompletionState::Incomplete).with_fix(Fix::EmbeddedJsonAsString));
                }
            };

            let mut j = q + 1;
            let mut closed = false;
            while j < self.chars.len() {
                if self.chars[j] == '\\' {
                    j += 2;
                    continue;
                }
                if self.chars[j] == '"' {
                    closed = true;
                    break;
                }
                j += 1;
            }

            if !closed {
                let end = self.chars.len();
                let text: String = self.chars[capture_start..end].iter().collect();
                self.pos = end;
                return Some(Value::string(text, CompletionState::Incomplete).with_fix(Fix::EmbeddedJsonAsString));
            }

            let mut k = j + 1;
            while k < self.chars.len() && self.chars[k].is_whitespace() {
                k += 1;
            }
            if k < self.chars.len() && self.chars[k] == ':' {
                // This quoted token was an object key; resume scanning after
                // the colon for the value that follows it.
                i = k + 1;
                continue;
            }

            let end = (j + 1).min(self.chars.len());
            let text: String = self.chars[capture_start..end].iter().collect();
            self.pos = end;
            return Some(Value::string(text, CompletionState::Complete).with_fix(Fix::EmbeddedJsonAsString));
        }
    }

    /// Consumes an unquoted token, applying the comma/newline-in-multiline
    /// heuristics. Returns the trimmed text and whether a newline was
    /// absorbed into the token (`MergedMultilineUnquoted`).
    fn consume_unquoted_token(&mut self) -> (String, bool) {
        let start = self.pos;
        let mut multiline = false;

        loop {
            match self.peek() {
                None => break,
                Some(':') | Some('}') | Some(']') => break,
                Some(',') => {
                    let spans_newline = self.chars[start..self.pos].contains(&'\n');
                    if spans_newline {
                        if heuristics::comma_is_field_separator(&self.chars, self.pos + 1) {
                            break;
                        }
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Some('\n') => {
                    if heuristics::newline_starts_new_field(&self.chars, self.pos + 1) {
                        break;
                    }
                    multiline = true;
                    self.pos += 1;
                }
                Some(_) => {
                    self.pos += 1;
                }
            }
        }

        let raw: String = self.chars[start..self.pos].iter().collect();
        (raw.trim().to_string(), multiline)
    }
}

fn finish_quoted(buffer: String, _quote: char, state: CompletionState) -> Value {
    Value::string(buffer, state)
}

/// Strips the longest common leading whitespace from every non-blank line,
/// then trims a single leading/trailing blank line (as triple-quoted string
/// literals conventionally do).
fn dedent(s: &str) -> String {
    let lines: Vec<&str> = s.split('\n').collect();
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let dedented: Vec<String> = lines
        .iter()
        .map(|l| {
            if l.len() >= common {
                l[common..].to_string()
            } else {
                l.trim_start().to_string()
            }
        })
        .collect();

    let mut result = dedented.join("\n");
    if result.starts_with('\n') {
        result.remove(0);
    }
    if let Some(stripped) = result.strip_suffix('\n') {
        result = stripped.to_string();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> (Value, Vec<Fix>) {
        fix(input, false)
    }

    #[test]
    fn parses_strict_object() {
        let (v, fixes) = run(r#"{"a": 1, "b": "two"}"#);
        assert!(fixes.is_empty());
        match v {
            Value::Object(fields, CompletionState::Complete) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].0, "a");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unquoted_keys_are_flagged() {
        let (v, fixes) = run(r#"{name: "Alice", age: 30}"#);
        assert!(fixes.contains(&Fix::UnquotedKey));
        match v {
            Value::Object(fields, _) => assert_eq!(fields[0].0, "name"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn trailing_comma_removed() {
        let (v, fixes) = run("[1, 2, 3,]");
        assert!(fixes.contains(&Fix::RemovedTrailingComma));
        match v {
            Value::Array(items, CompletionState::Complete) => assert_eq!(items.len(), 3),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn truncated_object_auto_closes() {
        let (v, fixes) = run(r#"{"a": 1, "b":"#);
        assert!(fixes.contains(&Fix::AddedClosingBrace));
        match v {
            Value::Object(fields, CompletionState::Incomplete) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].0, "a");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn should_close_string_tolerates_embedded_quotes() {
        let (v, _) = run(r#""she said "hi", then left""#);
        assert_eq!(v, Value::string("she said \"hi\", then left", CompletionState::Complete));
    }

    #[test]
    fn single_quotes_are_converted() {
        let (v, _) = run(r#"{'a': 'b'}"#);
        match v {
            Value::Object(fields, _) => {
                assert_eq!(fields[0].0, "a");
                assert_eq!(fields[0].1, Value::string("b", CompletionState::Complete));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn line_comments_are_stripped() {
        let (v, fixes) = run("{\"a\": 1 // trailing note\n}");
        assert!(fixes.contains(&Fix::StrippedComment));
        match v {
            Value::Object(fields, CompletionState::Complete) => assert_eq!(fields.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn multiline_unquoted_value_is_merged() {
        let (v, fixes) = run("{a: first line\nsecond line, b: 2}");
        assert!(fixes.contains(&Fix::MergedMultilineUnquoted));
        match v {
            Value::Object(fields, _) => {
                assert_eq!(
                    fields[0].1,
                    Value::string("first line\nsecond line", CompletionState::Complete)
                );
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn triple_quoted_string_is_dedented() {
        let (v, fixes) = run("\"\"\"\n  line one\n  line two\n\"\"\"");
        assert!(fixes.contains(&Fix::ConvertedTripleQuote));
        assert!(fixes.contains(&Fix::DedentedTripleQuote));
        assert_eq!(v, Value::string("line one\nline two", CompletionState::Complete));
    }

    #[test]
    fn backtick_fence_captures_tag() {
        let (v, _) = run("```json\n{\"a\": 1}\n```");
        match v {
            Value::Markdown(tag, inner) => {
                assert_eq!(tag, "json");
                assert_eq!(*inner, Value::string("{\"a\": 1}", CompletionState::Complete));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn backtick_fence_tag_with_path_keeps_only_language() {
        let (v, _) = run("```json path=foo\n{\"a\": 1}\n```");
        match v {
            Value::Markdown(tag, _) => assert_eq!(tag, "json"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn null_then_brace_captures_embedded_json_as_string() {
        let (v, fixes) = run(r#"null{"foo1": "bar"}"#);
        assert!(fixes.contains(&Fix::EmbeddedJsonAsString));
        assert_eq!(v, Value::string(r#"null{"foo1": "bar""#, CompletionState::Complete));
    }

    #[test]
    fn find_all_mode_infers_array_of_top_level_objects() {
        let (v, fixes) = fix(r#"{"a": 1} {"b": 2}"#, true);
        assert!(fixes.contains(&Fix::InferredArray));
        match v {
            Value::Array(items, _) => assert_eq!(items.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unquoted_string_value_classified_as_string() {
        let (v, _) = run("the answer is TWO");
        // No wrapping collection closes this token; the scanner reaches EOF
        // mid-token and the open `UnquotedString` is auto-closed Incomplete.
        assert_eq!(v, Value::string("the answer is TWO", CompletionState::Incomplete));
    }
}
