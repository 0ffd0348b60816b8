//! Map coercion (spec §4.7).

use std::collections::HashMap;

use crate::context::ParsingContext;
use crate::error::ParseError;
use crate::schema::{Literal, Schema};
use crate::value::Value;

use super::string_matcher::{self, MatchFailure};
use super::{coerce, CoercedShape, CoercedValue, CoercionFlag};

/// Coerces `value` against `map<key_schema, val_schema>`. Only `Object`
/// input is accepted — a map whose key schema also accepts raw strings
/// (the recursive-alias case) is reached through a sibling union arm, not
/// by this coercer relaxing its own input shape.
pub fn coerce(
    value: &Value,
    key_schema: &Schema,
    val_schema: &Schema,
    ctx: &mut ParsingContext,
) -> Result<CoercedValue, ParseError> {
    let (inner, markdown_depth) = value.unwrap_layers();
    let mut map_flags = Vec::new();
    if matches!(value, Value::FixedJson(..)) {
        map_flags.push(CoercionFlag::ObjectFromFixedJson);
    }
    if markdown_depth > 0 {
        map_flags.push(CoercionFlag::ObjectFromMarkdown(markdown_depth));
    }

    let fields = match inner {
        Value::Object(fields, _) => fields,
        Value::Null => return Err(ParseError::UnexpectedNull { scope: ctx.scope_path() }),
        other => {
            return Err(ParseError::UnexpectedType {
                scope: ctx.scope_path(),
                reason: format!("expected a map, found {}", other.shape_tag()),
            })
        }
    };

    // Duplicate keys: last occurrence wins, earlier ones silently dropped.
    let mut order: Vec<String> = Vec::new();
    let mut last: HashMap<String, &Value> = HashMap::new();
    for (k, v) in fields {
        if !last.contains_key(k) {
            order.push(k.clone());
        }
        last.insert(k.clone(), v);
    }

    let mut entries = Vec::with_capacity(order.len());
    for raw_key in &order {
        let input_value = last[raw_key];

        let key_text = match coerce_map_key(raw_key, key_schema, ctx) {
            Ok(text) => text,
            Err(_) => {
                map_flags.push(CoercionFlag::MapKeyParseError);
                continue;
            }
        };

        let coerced = ctx.enter_field(raw_key.clone(), |ctx| coerce(input_value, val_schema, ctx));
        match coerced {
            Ok(cv) => entries.push((key_text, cv)),
            Err(_) => map_flags.push(CoercionFlag::MapValueParseError),
        }
    }

    Ok(CoercedValue::new(CoercedShape::Object(entries), map_flags))
}

/// Keys pass through unmodified for a plain `String` key schema; an
/// `Enum`/string-`Literal` key schema routes the raw key text through the
/// same string matcher used for enum values.
fn coerce_map_key(raw_key: &str, key_schema: &Schema, ctx: &mut ParsingContext) -> Result<String, ParseError> {
    match key_schema.resolve() {
        Schema::Enum(members) => {
            let names: Vec<String> = members.iter().map(|m| m.name.clone()).collect();
            match string_matcher::match_variants(raw_key, &names, true) {
                Ok((idx, _)) => Ok(names[idx].clone()),
                Err(MatchFailure::NoMatch) => Err(ParseError::UnexpectedType {
                    scope: ctx.scope_path(),
                    reason: format!("key {raw_key:?} does not match any enum member"),
                }),
                Err(MatchFailure::Ambiguous(candidates)) => Err(ParseError::AmbiguousMatch {
                    scope: ctx.scope_path(),
                    candidates,
                }),
            }
        }
        Schema::Literal(Literal::Str(expected)) => {
            if expected == raw_key {
                Ok(expected)
            } else {
                Err(ParseError::UnexpectedType {
                    scope: ctx.scope_path(),
                    reason: format!("key {raw_key:?} does not match literal {expected:?}"),
                })
            }
        }
        _ => Ok(raw_key.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{CompletionState, Number};

    #[test]
    fn string_keyed_map_coerces_each_value() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Object(
            vec![
                ("a".into(), Value::Number(Number::Integer(1), CompletionState::Complete)),
                ("b".into(), Value::Number(Number::Integer(2), CompletionState::Complete)),
            ],
            CompletionState::Complete,
        );
        let result = coerce(&v, &Schema::String, &Schema::Int, &mut ctx).unwrap();
        match result.shape {
            CoercedShape::Object(entries) => assert_eq!(entries.len(), 2),
            _ => panic!("expected object shape"),
        }
        assert!(result.flags.is_empty());
    }

    #[test]
    fn duplicate_keys_last_one_wins() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Object(
            vec![
                ("a".into(), Value::Number(Number::Integer(1), CompletionState::Complete)),
                ("a".into(), Value::Number(Number::Integer(2), CompletionState::Complete)),
            ],
            CompletionState::Complete,
        );
        let result = coerce(&v, &Schema::String, &Schema::Int, &mut ctx).unwrap();
        match result.shape {
            CoercedShape::Object(entries) => {
                assert_eq!(entries.len(), 1);
                assert!(matches!(entries[0].1.shape, CoercedShape::Int(2)));
            }
            _ => panic!("expected object shape"),
        }
    }

    #[test]
    fn value_parse_errors_are_dropped_and_flagged() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Object(
            vec![
                ("a".into(), Value::Number(Number::Integer(1), CompletionState::Complete)),
                ("b".into(), Value::Object(vec![], CompletionState::Complete)),
            ],
            CompletionState::Complete,
        );
        let result = coerce(&v, &Schema::String, &Schema::Int, &mut ctx).unwrap();
        match result.shape {
            CoercedShape::Object(entries) => assert_eq!(entries.len(), 1),
            _ => panic!("expected object shape"),
        }
        assert!(result.flags.contains(&CoercionFlag::MapValueParseError));
    }

    #[test]
    fn non_object_input_is_rejected() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Number(Number::Integer(1), CompletionState::Complete);
        let err = coerce(&v, &Schema::String, &Schema::Int, &mut ctx).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedType { .. }));
    }
}
