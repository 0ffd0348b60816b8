//! Object / class coercion (spec §4.8).

use std::rc::Rc;

use crate::context::ParsingContext;
use crate::error::ParseError;
use crate::schema::{ObjectField, ObjectSchema, Schema};
use crate::value::Value;

use super::{coerce, default_coerced_value, CoercedShape, CoercedValue, CoercionFlag};

/// Coerces `value` against an object schema with known fields. See spec
/// §4.8 for the numbered steps this function follows.
pub fn coerce(value: &Value, obj: &Rc<ObjectSchema>, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let key = (Rc::as_ptr(obj) as usize, value.digest());
    if ctx.mark_visited(key) {
        return Err(ParseError::CircularReference { scope: ctx.scope_path() });
    }
    let result = coerce_inner(value, obj, ctx);
    ctx.unmark_visited(&key);
    result
}

fn coerce_inner(value: &Value, obj: &Rc<ObjectSchema>, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let (inner, markdown_depth) = value.unwrap_layers();
    let mut base_flags = Vec::new();
    if matches!(value, Value::FixedJson(..)) {
        base_flags.push(CoercionFlag::ObjectFromFixedJson);
    }
    if markdown_depth > 0 {
        base_flags.push(CoercionFlag::ObjectFromMarkdown(markdown_depth));
    }

    // Step 1 — input shape dispatch.
    let input_fields: Vec<(String, Value)> = match inner {
        Value::Object(fields, _) => fields.clone(),
        Value::Null => return Err(ParseError::UnexpectedNull { scope: ctx.scope_path() }),
        Value::Array(..) if obj.fields.len() == 1 => {
            base_flags.push(CoercionFlag::ImpliedKey);
            vec![(obj.fields[0].name.clone(), inner.clone())]
        }
        other if obj.fields.len() == 1 => {
            base_flags.push(CoercionFlag::ImpliedKey);
            base_flags.push(CoercionFlag::InferredObject);
            vec![(obj.fields[0].name.clone(), other.clone())]
        }
        other => {
            return Err(ParseError::UnexpectedType {
                scope: ctx.scope_path(),
                reason: format!("expected object({}), found {}", obj.name, other.shape_tag()),
            })
        }
    };

    // Step 2 — field matching. Input keys drive the match (not the other way
    // round); the first input key that resolves to a given field wins, per
    // the documented "first structural match" divergence (spec §9).
    let mut matched: Vec<Option<Value>> = vec![None; obj.fields.len()];
    let mut extra_keys = 0usize;
    for (raw_key, val) in &input_fields {
        match match_field_index(obj, raw_key) {
            Some(idx) if matched[idx].is_none() => matched[idx] = Some(val.clone()),
            Some(_) => {} // field already satisfied by an earlier key; drop silently
            None => extra_keys += 1,
        }
    }
    if extra_keys > 0 {
        base_flags.extend(std::iter::repeat(CoercionFlag::ExtraKey).take(extra_keys));
    }

    // Steps 3-4 — per-field coercion with default resolution.
    let mut coerced_fields = Vec::with_capacity(obj.fields.len());
    let mut missing_required = Vec::new();
    let mut any_real_content = false;

    for (field, provided) in obj.fields.iter().zip(matched.into_iter()) {
        let outcome = resolve_field(field, provided, ctx);
        match outcome {
            FieldOutcome::Value(cv) => {
                any_real_content = any_real_content || !is_defaulted(&cv);
                coerced_fields.push((field.name.clone(), cv));
            }
            FieldOutcome::Missing => missing_required.push(field.name.clone()),
        }
    }

    if !missing_required.is_empty() {
        return Err(ParseError::MissingRequiredField {
            scope: ctx.scope_path(),
            names: missing_required,
        });
    }

    if !obj.fields.is_empty() && !any_real_content {
        base_flags.push(CoercionFlag::NoFields);
    }

    Ok(CoercedValue::new(CoercedShape::Object(coerced_fields), base_flags))
}

enum FieldOutcome {
    Value(CoercedValue),
    Missing,
}

fn resolve_field(field: &ObjectField, provided: Option<Value>, ctx: &mut ParsingContext) -> FieldOutcome {
    match provided {
        Some(val) => {
            let result = ctx.enter_field(field.name.clone(), |ctx| coerce(&val, &field.schema, ctx));
            match result {
                Ok(cv) => FieldOutcome::Value(cv),
                Err(_) => match &field.default {
                    Some(default) => FieldOutcome::Value(
                        default_coerced_value(default).with_flag(CoercionFlag::DefaultButHadUnparseableValue),
                    ),
                    None if field.required => FieldOutcome::Missing,
                    None => FieldOutcome::Value(
                        CoercedValue::new(CoercedShape::Null, vec![CoercionFlag::DefaultButHadUnparseableValue]),
                    ),
                },
            }
        }
        None => match &field.default {
            Some(default) => {
                FieldOutcome::Value(default_coerced_value(default).with_flag(CoercionFlag::DefaultFromNoValue))
            }
            None if field.required => FieldOutcome::Missing,
            None => FieldOutcome::Value(CoercedValue::new(
                CoercedShape::Null,
                vec![CoercionFlag::OptionalDefaultFromNoValue],
            )),
        },
    }
}

fn is_defaulted(cv: &CoercedValue) -> bool {
    cv.flags.iter().any(|f| {
        matches!(
            f,
            CoercionFlag::DefaultFromNoValue
                | CoercionFlag::OptionalDefaultFromNoValue
                | CoercionFlag::DefaultButHadUnparseableValue
        )
    })
}

/// Tries, in order: exact name; trimmed; case-insensitive; a
/// separator-blind fold that treats `snake_case`, `camelCase`,
/// `kebab-case`, and space-separated spellings as equivalent; and any of
/// the schema's declared domain aliases (exact or separator-blind).
fn match_field_index(obj: &ObjectSchema, raw_key: &str) -> Option<usize> {
    if let Some(i) = obj.fields.iter().position(|f| f.name == raw_key) {
        return Some(i);
    }
    let trimmed = raw_key.trim();
    if let Some(i) = obj.fields.iter().position(|f| f.name == trimmed) {
        return Some(i);
    }
    if let Some(i) = obj.fields.iter().position(|f| f.name.eq_ignore_ascii_case(trimmed)) {
        return Some(i);
    }
    let folded_key = fold_key(trimmed);
    if let Some(i) = obj.fields.iter().position(|f| fold_key(&f.name) == folded_key) {
        return Some(i);
    }
    obj.fields.iter().position(|f| {
        f.aliases
            .iter()
            .any(|alias| alias == trimmed || fold_key(alias) == folded_key)
    })
}

/// Folds a key to a separator-blind, case-blind canonical form so
/// `phone_number`, `phoneNumber`, `phone-number`, and `Phone Number` all
/// compare equal.
fn fold_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
