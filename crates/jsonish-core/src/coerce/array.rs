//! Array coercion (spec §4.6).

use crate::context::ParsingContext;
use crate::error::ParseError;
use crate::schema::Schema;
use crate::value::{CompletionState, Value};

use super::{coerce, CoercedShape, CoercedValue, CoercionFlag};

/// Coerces `value` against `array<elem>`. A bare (non-array) value is
/// treated as a single-element array (`SingleToArray`). Items that fail to
/// coerce are dropped rather than failing the whole array, each recording
/// one `ArrayItemParseError` on the array node; an array with no survivors
/// still succeeds, as an empty array.
pub fn coerce(value: &Value, elem: &Schema, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let (inner, markdown_depth) = value.unwrap_layers();

    let (items, array_state) = match inner {
        Value::Array(items, state) => (items.clone(), *state),
        Value::Null => return Err(ParseError::UnexpectedNull { scope: ctx.scope_path() }),
        _ => {
            let single = super::coerce(value, elem, ctx)?;
            return Ok(CoercedValue::new(
                CoercedShape::Array(vec![single]),
                vec![CoercionFlag::SingleToArray],
            ));
        }
    };

    let mut coerced = Vec::with_capacity(items.len());
    let mut array_flags = Vec::new();
    if matches!(value, Value::FixedJson(..)) {
        array_flags.push(CoercionFlag::ObjectFromFixedJson);
    }
    if markdown_depth > 0 {
        array_flags.push(CoercionFlag::ObjectFromMarkdown(markdown_depth));
    }

    let last_index = items.len().checked_sub(1);
    for (index, item) in items.iter().enumerate() {
        let result = ctx.enter_index(index, |ctx| coerce(item, elem, ctx));
        match result {
            Ok(item) => coerced.push(item),
            Err(_) => {
                // A truncated array's final element often fails to coerce
                // simply because it was cut off mid-stream; dropping it
                // silently (no flag) is more honest than reporting it as a
                // genuine parse error among otherwise-complete siblings.
                let trailing_incomplete = array_state == CompletionState::Incomplete
                    && Some(index) == last_index
                    && item.completion_state() == CompletionState::Incomplete;
                if !trailing_incomplete {
                    array_flags.push(CoercionFlag::ArrayItemParseError);
                }
            }
        }
    }

    Ok(CoercedValue::new(CoercedShape::Array(coerced), array_flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{CompletionState, Number};

    #[test]
    fn array_of_ints_coerces_each_item() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Array(
            vec![
                Value::Number(Number::Integer(1), CompletionState::Complete),
                Value::Number(Number::Integer(2), CompletionState::Complete),
            ],
            CompletionState::Complete,
        );
        let result = coerce(&v, &Schema::Int, &mut ctx).unwrap();
        match result.shape {
            CoercedShape::Array(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected array"),
        }
        assert!(result.flags.is_empty());
    }

    #[test]
    fn bare_value_becomes_single_element_array() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Number(Number::Integer(7), CompletionState::Complete);
        let result = coerce(&v, &Schema::Int, &mut ctx).unwrap();
        assert!(result.flags.contains(&CoercionFlag::SingleToArray));
        match result.shape {
            CoercedShape::Array(items) => assert_eq!(items.len(), 1),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn failing_items_are_dropped_and_flagged() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Array(
            vec![
                Value::Number(Number::Integer(1), CompletionState::Complete),
                Value::Object(vec![], CompletionState::Complete),
            ],
            CompletionState::Complete,
        );
        let result = coerce(&v, &Schema::Int, &mut ctx).unwrap();
        match &result.shape {
            CoercedShape::Array(items) => assert_eq!(items.len(), 1),
            _ => panic!("expected array"),
        }
        assert!(result.flags.contains(&CoercionFlag::ArrayItemParseError));
    }

    #[test]
    fn truncated_trailing_item_is_dropped_without_a_flag() {
        let mut ctx = ParsingContext::new(50);
        let v = Value::Array(
            vec![
                Value::Number(Number::Integer(1), CompletionState::Complete),
                Value::Object(vec![], CompletionState::Incomplete),
            ],
            CompletionState::Incomplete,
        );
        let result = coerce(&v, &Schema::Int, &mut ctx).unwrap();
        match &result.shape {
            CoercedShape::Array(items) => assert_eq!(items.len(), 1),
            _ => panic!("expected array"),
        }
        assert!(!result.flags.contains(&CoercionFlag::ArrayItemParseError));
    }
}
