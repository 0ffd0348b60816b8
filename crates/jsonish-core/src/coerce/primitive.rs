//! Primitive coercers (spec §4.4): string, int, float, bool, null, literal,
//! and enum targets.

use crate::context::ParsingContext;
use crate::error::ParseError;
use crate::schema::{EnumMember, Literal};
use crate::value::{Number, Value};

use super::string_matcher::{self, MatchFailure};
use super::{CoercedShape, CoercedValue, CoercionFlag};

pub fn coerce_string(value: &Value, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let (inner, markdown_depth) = value.unwrap_layers();
    let flags = fixed_json_flag(value);
    let flags = extend_markdown(flags, markdown_depth);

    match inner {
        Value::String(s, _) => Ok(CoercedValue::new(CoercedShape::String(strip_quotes(s)), flags)),
        Value::Number(n, _) => Ok(CoercedValue::new(CoercedShape::String(n.to_string()), flags)),
        Value::Boolean(b) => Ok(CoercedValue::new(CoercedShape::String(b.to_string()), flags)),
        Value::Null => Err(ParseError::UnexpectedNull { scope: ctx.scope_path() }),
        Value::Object(fields, _) if fields.len() == 1 && is_primitive(&fields[0].1) => {
            let mut flags = flags;
            flags.push(CoercionFlag::ObjectToPrimitive);
            coerce_string(&fields[0].1, ctx).map(|cv| cv.with_flags(flags))
        }
        Value::Array(..) | Value::Object(..) => {
            let json = value_to_json(inner);
            let mut flags = flags;
            flags.push(CoercionFlag::JsonToString);
            Ok(CoercedValue::new(CoercedShape::String(json.to_string()), flags))
        }
        Value::Markdown(..) | Value::FixedJson(..) | Value::AnyOf(..) => {
            unreachable!("unwrap_layers strips Markdown/FixedJson; AnyOf is resolved by coerce()")
        }
    }
}

/// Strips one pair of surrounding matching quotes (`"`, `'`, `` ` ``), if
/// present, left over from input that was never a properly quoted JSON
/// string to begin with (e.g. a fixed unquoted value that still reads
/// `"like this"` after recovery).
fn strip_quotes(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = s.chars().next().unwrap();
        let last = s.chars().last().unwrap();
        if first == last && matches!(first, '"' | '\'' | '`') {
            return s[first.len_utf8()..s.len() - last.len_utf8()].to_string();
        }
    }
    s.to_string()
}

fn is_primitive(value: &Value) -> bool {
    let (inner, _) = value.unwrap_layers();
    matches!(
        inner,
        Value::String(..) | Value::Number(..) | Value::Boolean(_) | Value::Null
    )
}

pub fn coerce_int(value: &Value, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let (inner, markdown_depth) = value.unwrap_layers();
    let flags = fixed_json_flag(value);
    let flags = extend_markdown(flags, markdown_depth);

    match inner {
        Value::Number(Number::Integer(i), _) => Ok(CoercedValue::new(CoercedShape::Int(*i), flags)),
        Value::Number(Number::Float(f), _) => {
            let mut flags = flags;
            flags.push(CoercionFlag::FloatToInt);
            Ok(CoercedValue::new(CoercedShape::Int(f.round() as i64), flags))
        }
        Value::String(s, _) => parse_number_from_string(s)
            .and_then(|n| match n {
                Number::Integer(i) => Ok(CoercedValue::new(CoercedShape::Int(i), flags.clone())),
                Number::Float(f) => {
                    let mut flags = flags.clone();
                    flags.push(CoercionFlag::StringToFloat);
                    flags.push(CoercionFlag::FloatToInt);
                    Ok(CoercedValue::new(CoercedShape::Int(f.round() as i64), flags))
                }
            })
            .ok_or_else(|| ParseError::UnexpectedType {
                scope: ctx.scope_path(),
                reason: format!("cannot parse {s:?} as a number"),
            }),
        Value::Null => Err(ParseError::UnexpectedNull { scope: ctx.scope_path() }),
        other => Err(ParseError::UnexpectedType {
            scope: ctx.scope_path(),
            reason: format!("expected int, found {}", other.shape_tag()),
        }),
    }
}

pub fn coerce_float(value: &Value, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let (inner, markdown_depth) = value.unwrap_layers();
    let flags = fixed_json_flag(value);
    let flags = extend_markdown(flags, markdown_depth);

    match inner {
        Value::Number(n, _) => Ok(CoercedValue::new(CoercedShape::Float(n.as_f64()), flags)),
        Value::String(s, _) => {
            let mut flags = flags;
            flags.push(CoercionFlag::StringToFloat);
            parse_number_from_string(s)
                .map(|n| CoercedValue::new(CoercedShape::Float(n.as_f64()), flags))
                .ok_or_else(|| ParseError::UnexpectedType {
                    scope: ctx.scope_path(),
                    reason: format!("cannot parse {s:?} as a number"),
                })
        }
        Value::Null => Err(ParseError::UnexpectedNull { scope: ctx.scope_path() }),
        other => Err(ParseError::UnexpectedType {
            scope: ctx.scope_path(),
            reason: format!("expected float, found {}", other.shape_tag()),
        }),
    }
}

pub fn coerce_bool(value: &Value, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let (inner, markdown_depth) = value.unwrap_layers();
    let flags = fixed_json_flag(value);
    let flags = extend_markdown(flags, markdown_depth);

    match inner {
        Value::Boolean(b) => Ok(CoercedValue::new(CoercedShape::Bool(*b), flags)),
        Value::String(s, _) => {
            let lower = s.to_lowercase();
            let has_true = lower.contains("true");
            let has_false = lower.contains("false");
            if has_true && has_false {
                return Err(ParseError::AmbiguousBoolean { scope: ctx.scope_path() });
            }
            let mut flags = flags;
            flags.push(CoercionFlag::StringToBool);
            if has_true {
                Ok(CoercedValue::new(CoercedShape::Bool(true), flags))
            } else if has_false {
                Ok(CoercedValue::new(CoercedShape::Bool(false), flags))
            } else {
                Err(ParseError::UnexpectedType {
                    scope: ctx.scope_path(),
                    reason: format!("{s:?} contains neither \"true\" nor \"false\""),
                })
            }
        }
        Value::Null => Err(ParseError::UnexpectedNull { scope: ctx.scope_path() }),
        other => Err(ParseError::UnexpectedType {
            scope: ctx.scope_path(),
            reason: format!("expected bool, found {}", other.shape_tag()),
        }),
    }
}

pub fn coerce_null(value: &Value, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let (inner, _) = value.unwrap_layers();
    match inner {
        Value::Null => Ok(CoercedValue::leaf(CoercedShape::Null)),
        Value::String(s, _) if matches!(s.trim(), "null" | "Null" | "NULL") => {
            Ok(CoercedValue::new(CoercedShape::Null, vec![CoercionFlag::StringToNull]))
        }
        other => Err(ParseError::UnexpectedType {
            scope: ctx.scope_path(),
            reason: format!("expected null, found {}", other.shape_tag()),
        }),
    }
}

pub fn coerce_literal(value: &Value, literal: &Literal, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    match literal {
        Literal::Int(expected) => {
            let coerced = coerce_int(value, ctx)?;
            match coerced.shape {
                CoercedShape::Int(i) if i == *expected => Ok(coerced),
                CoercedShape::Int(i) => Err(ParseError::UnexpectedType {
                    scope: ctx.scope_path(),
                    reason: format!("expected literal {expected}, found {i}"),
                }),
                _ => unreachable!(),
            }
        }
        Literal::Bool(expected) => {
            let coerced = coerce_bool(value, ctx)?;
            match coerced.shape {
                CoercedShape::Bool(b) if b == *expected => Ok(coerced),
                CoercedShape::Bool(b) => Err(ParseError::UnexpectedType {
                    scope: ctx.scope_path(),
                    reason: format!("expected literal {expected}, found {b}"),
                }),
                _ => unreachable!(),
            }
        }
        Literal::Str(expected) => {
            let (inner, markdown_depth) = value.unwrap_layers();
            let text = match inner {
                Value::String(s, _) => s.clone(),
                Value::Number(n, _) => n.to_string(),
                Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(ParseError::UnexpectedType {
                        scope: ctx.scope_path(),
                        reason: format!("expected literal {expected:?}, found {}", other.shape_tag()),
                    })
                }
            };
            match string_matcher::match_variants(&text, std::slice::from_ref(expected), false) {
                Ok((_, mut flags)) => {
                    flags.extend(fixed_json_flag(value));
                    flags = extend_markdown(flags, markdown_depth);
                    Ok(CoercedValue::new(CoercedShape::String(expected.clone()), flags))
                }
                Err(MatchFailure::NoMatch) => Err(ParseError::UnexpectedType {
                    scope: ctx.scope_path(),
                    reason: format!("expected literal {expected:?}, found {text:?}"),
                }),
                Err(MatchFailure::Ambiguous(candidates)) => Err(ParseError::AmbiguousMatch {
                    scope: ctx.scope_path(),
                    candidates,
                }),
            }
        }
    }
}

pub fn coerce_enum(value: &Value, members: &[EnumMember], ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let (inner, markdown_depth) = value.unwrap_layers();
    let text = match inner {
        Value::String(s, _) => s.clone(),
        other => {
            return Err(ParseError::UnexpectedType {
                scope: ctx.scope_path(),
                reason: format!("expected an enum member name, found {}", other.shape_tag()),
            })
        }
    };

    let names: Vec<String> = members.iter().map(|m| m.name.clone()).collect();
    match string_matcher::match_variants(&text, &names, true) {
        Ok((idx, mut flags)) => {
            flags.extend(fixed_json_flag(value));
            flags = extend_markdown(flags, markdown_depth);
            Ok(CoercedValue::new(CoercedShape::String(names[idx].clone()), flags))
        }
        Err(MatchFailure::NoMatch) => Err(ParseError::UnexpectedType {
            scope: ctx.scope_path(),
            reason: format!("{text:?} does not match any enum member"),
        }),
        Err(MatchFailure::Ambiguous(candidates)) => Err(ParseError::AmbiguousMatch {
            scope: ctx.scope_path(),
            candidates,
        }),
    }
}

fn fixed_json_flag(value: &Value) -> Vec<CoercionFlag> {
    if matches!(value, Value::FixedJson(..)) {
        vec![CoercionFlag::ObjectFromFixedJson]
    } else {
        Vec::new()
    }
}

fn extend_markdown(mut flags: Vec<CoercionFlag>, depth: usize) -> Vec<CoercionFlag> {
    if depth > 0 {
        flags.push(CoercionFlag::ObjectFromMarkdown(depth));
    }
    flags
}

const CURRENCY_PREFIXES: &[char] = &['$', '€', '£', '¥'];

/// Normalizes the loose numeric textures LLMs tend to emit inside an
/// otherwise-unquoted string before falling back to plain parsing: a
/// leading currency symbol, comma thousand separators, a bare trailing
/// decimal point, and simple `a/b` fractions.
fn parse_number_from_string(s: &str) -> Option<Number> {
    let mut trimmed = s.trim();
    if let Some(c) = trimmed.chars().next() {
        if CURRENCY_PREFIXES.contains(&c) {
            trimmed = trimmed[c.len_utf8()..].trim_start();
        }
    }

    if let Some((num, den)) = trimmed.split_once('/') {
        let num = num.trim().replace(',', "");
        let den = den.trim();
        if let (Ok(n), Ok(d)) = (num.parse::<f64>(), den.parse::<f64>()) {
            if d != 0.0 {
                return Some(Number::Float(n / d));
            }
        }
    }

    let without_commas = trimmed.replace(',', "");
    let normalized = without_commas.strip_suffix('.').unwrap_or(&without_commas);

    if let Ok(i) = normalized.parse::<i64>() {
        return Some(Number::Integer(i));
    }
    normalized.parse::<f64>().ok().map(Number::Float)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s, _) => serde_json::Value::String(s.clone()),
        Value::Number(Number::Integer(i), _) => serde_json::json!(i),
        Value::Number(Number::Float(f), _) => serde_json::json!(f),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Null => serde_json::Value::Null,
        Value::Array(items, _) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Object(fields, _) => {
            serde_json::Value::Object(fields.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect())
        }
        Value::Markdown(_, inner) => value_to_json(inner),
        Value::FixedJson(inner, _) => value_to_json(inner),
        Value::AnyOf(candidates, _) => candidates.first().map(value_to_json).unwrap_or(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CompletionState;

    #[test]
    fn int_from_exact_number() {
        let mut ctx = ParsingContext::new(50);
        let v = coerce_int(&Value::Number(Number::Integer(5), CompletionState::Complete), &mut ctx).unwrap();
        assert!(matches!(v.shape, CoercedShape::Int(5)));
        assert!(v.flags.is_empty());
    }

    #[test]
    fn int_from_float_rounds_and_flags() {
        let mut ctx = ParsingContext::new(50);
        let v = coerce_int(&Value::Number(Number::Float(5.7), CompletionState::Complete), &mut ctx).unwrap();
        assert!(matches!(v.shape, CoercedShape::Int(6)));
        assert!(v.flags.contains(&CoercionFlag::FloatToInt));
    }

    #[test]
    fn bool_ambiguous_when_both_present() {
        let mut ctx = ParsingContext::new(50);
        let err = coerce_bool(
            &Value::String("true and false both appear".into(), CompletionState::Complete),
            &mut ctx,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::AmbiguousBoolean { .. }));
    }

    #[test]
    fn multi_field_object_to_string_serializes_as_json_and_flags() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Object(
            vec![
                ("a".into(), Value::Number(Number::Integer(1), CompletionState::Complete)),
                ("b".into(), Value::Number(Number::Integer(2), CompletionState::Complete)),
            ],
            CompletionState::Complete,
        );
        let coerced = coerce_string(&v, &mut ctx).unwrap();
        assert!(coerced.flags.contains(&CoercionFlag::JsonToString));
        match coerced.shape {
            CoercedShape::String(s) => assert_eq!(s, r#"{"a":1,"b":2}"#),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn single_primitive_field_object_to_string_unwraps_the_value() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Object(
            vec![("answer".into(), Value::string("42", CompletionState::Complete))],
            CompletionState::Complete,
        );
        let coerced = coerce_string(&v, &mut ctx).unwrap();
        assert!(coerced.flags.contains(&CoercionFlag::ObjectToPrimitive));
        match coerced.shape {
            CoercedShape::String(s) => assert_eq!(s, "42"),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn surrounding_quotes_are_stripped() {
        let mut ctx = ParsingContext::new(50);
        let v = coerce_string(&Value::string("\"hello\"", CompletionState::Complete), &mut ctx).unwrap();
        match v.shape {
            CoercedShape::String(s) => assert_eq!(s, "hello"),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn number_strings_normalize_commas_currency_and_fractions() {
        assert!(matches!(parse_number_from_string("1,234"), Some(Number::Integer(1234))));
        assert!(matches!(parse_number_from_string("$1,234.50"), Some(Number::Float(f)) if (f - 1234.50).abs() < 1e-9));
        assert!(matches!(parse_number_from_string("€1,000"), Some(Number::Integer(1000))));
        assert!(matches!(parse_number_from_string("12."), Some(Number::Float(f)) if (f - 12.0).abs() < 1e-9));
        assert!(matches!(parse_number_from_string("1/2"), Some(Number::Float(f)) if (f - 0.5).abs() < 1e-9));
    }

    #[test]
    fn enum_exact_match_has_no_flags() {
        let mut ctx = ParsingContext::new(50);
        let members = vec![EnumMember::new("RED"), EnumMember::new("BLUE")];
        let v = coerce_enum(&Value::String("RED".into(), CompletionState::Complete), &members, &mut ctx).unwrap();
        assert!(v.flags.is_empty());
    }

    #[test]
    fn null_literal_text_coerces_with_flag() {
        let mut ctx = ParsingContext::new(50);
        let v = coerce_null(&Value::String("null".into(), CompletionState::Complete), &mut ctx).unwrap();
        assert!(v.flags.contains(&CoercionFlag::StringToNull));
    }
}
