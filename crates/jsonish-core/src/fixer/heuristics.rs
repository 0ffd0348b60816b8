//! The three lookahead heuristics the scanner consults mid-token. Each is a
//! pure function over the character buffer so the scanner can call them
//! without fighting the borrow checker over `&mut self`.

/// Heuristic 1 — **should-close-unescaped-string**: an unescaped quote of
/// the opening kind closes the string only if, after skipping whitespace,
/// the next character looks like what should follow a string value.
pub fn looks_like_string_close(chars: &[char], pos: usize) -> bool {
    let mut i = pos;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    if i >= chars.len() {
        return true;
    }
    matches!(chars[i], ',' | '}' | ']' | ':')
}

/// Shared by heuristics 2 and 3: does the text starting at `pos` look like
/// `identifier :` or `"identifier" :` (skipping horizontal whitespace)?
pub fn looks_like_key_start(chars: &[char], pos: usize) -> bool {
    let mut i = pos;
    while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
        i += 1;
    }
    if i >= chars.len() {
        return false;
    }

    if chars[i] == '"' || chars[i] == '\'' {
        let quote = chars[i];
        let mut j = i + 1;
        while j < chars.len() && chars[j] != quote {
            j += 1;
        }
        if j >= chars.len() {
            return false;
        }
        j += 1;
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        return j < chars.len() && chars[j] == ':';
    }

    let start = i;
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-') {
        i += 1;
    }
    if i == start {
        return false;
    }
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i < chars.len() && chars[i] == ':'
}

/// Heuristic 2 — **comma-in-multiline-unquoted**: inside an unquoted value
/// that has already spanned a newline, a comma is a field separator only if
/// the rest of the line looks like the start of a new key.
pub fn comma_is_field_separator(chars: &[char], pos_after_comma: usize) -> bool {
    looks_like_key_start(chars, pos_after_comma)
}

/// The newline-handling half of heuristic 2: a newline inside an unquoted
/// value terminates the token only if what follows looks like a new key.
pub fn newline_starts_new_field(chars: &[char], pos_after_newline: usize) -> bool {
    looks_like_key_start(chars, pos_after_newline)
}
