//! Classification of a closed `UnquotedString` buffer into its terminal
//! `Value`, per spec §4.2 "Unquoted terminal classification".

use std::sync::OnceLock;

use regex::Regex;

use crate::value::{CompletionState, Number, Value};

fn integer_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+$").unwrap())
}

fn fractional_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+\.\d+([eE][+-]?\d+)?$").unwrap())
}

/// Classifies `text` (already trimmed of surrounding whitespace by the
/// caller) in the order the spec fixes: booleans (case-sensitive), null
/// spellings, integers, fractions, then string.
pub fn classify_unquoted(text: &str, state: CompletionState) -> Value {
    match text {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        "null" | "Null" | "NULL" => return Value::Null,
        _ => {}
    }

    if integer_pattern().is_match(text) {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Number(Number::Integer(i), state);
        }
    }
    if fractional_pattern().is_match(text) {
        if let Ok(f) = text.parse::<f64>() {
            return Value::Number(Number::Float(f), state);
        }
    }

    Value::string(text, state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_booleans_case_sensitively() {
        assert_eq!(
            classify_unquoted("true", CompletionState::Complete),
            Value::Boolean(true)
        );
        assert!(matches!(
            classify_unquoted("True", CompletionState::Complete),
            Value::String(..)
        ));
    }

    #[test]
    fn classifies_null_spellings() {
        for spelling in ["null", "Null", "NULL"] {
            assert_eq!(classify_unquoted(spelling, CompletionState::Complete), Value::Null);
        }
    }

    #[test]
    fn classifies_integers_and_fractions() {
        assert_eq!(
            classify_unquoted("-42", CompletionState::Complete),
            Value::Number(Number::Integer(-42), CompletionState::Complete)
        );
        assert_eq!(
            classify_unquoted("3.14", CompletionState::Complete),
            Value::Number(Number::Float(3.14), CompletionState::Complete)
        );
    }

    #[test]
    fn falls_back_to_string() {
        assert_eq!(
            classify_unquoted("the answer is TWO", CompletionState::Complete),
            Value::string("the answer is TWO", CompletionState::Complete)
        );
    }
}
