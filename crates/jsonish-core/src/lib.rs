//! JSONish: a schema-directed, error-tolerant parser for text emitted by
//! large language models.
//!
//! Given a raw string and a [`Schema`] describing the expected shape, the
//! entry pipeline ([`crate::pipeline`]) tries progressively more permissive
//! interpretations of the input — strict JSON, fenced code blocks, balanced
//! multi-object scans, a character-level fixing tokenizer
//! ([`crate::fixer`]), and finally a raw-string fallback — and combines
//! whatever succeeds into an intermediate [`Value`]. The coercer
//! ([`crate::coerce`]) then maps that `Value` onto the schema, recording a
//! [`CoercionFlag`] for every lossy or ambiguous step and, for unions,
//! scoring every arm to pick the best fit.
//!
//! ```
//! use jsonish_core::{parse, ParseOptions, Schema};
//!
//! let schema = Schema::enum_of(vec![
//!     jsonish_core::EnumMember::new("ONE"),
//!     jsonish_core::EnumMember::new("TWO"),
//!     jsonish_core::EnumMember::new("THREE"),
//! ]);
//! let result = parse("The answer is **two**.", &schema, &ParseOptions::default()).unwrap();
//! assert_eq!(result.to_json(), serde_json::json!("TWO"));
//! ```

mod coerce;
mod config;
mod context;
mod error;
mod fixer;
mod pipeline;
mod schema;
mod value;

pub use coerce::{CoercedShape, CoercedValue, CoercionFlag};
pub use config::ParseOptions;
pub use context::ParsingContext;
pub use error::{ErrorCode, ParseError, ScopePath};
pub use schema::{EnumMember, Literal, ObjectField, ObjectSchema, Schema};
pub use value::{CompletionState, Fix, Number, Value};

/// Parses `input` against `schema`, returning the best-fitting typed value.
///
/// This is the single public entry point: it runs the entry pipeline to
/// build an intermediate [`Value`] (trying strict JSON, markdown
/// extraction, multi-object scanning, and the fixing tokenizer in turn),
/// then coerces that value onto `schema`, threading a fresh
/// [`ParsingContext`] through the whole call so recursion guards and
/// memoization caches never leak between independent top-level parses.
pub fn parse(input: &str, schema: &Schema, options: &ParseOptions) -> Result<CoercedValue, ParseError> {
    let mut value = pipeline::run(input, options, 0);
    if !options.is_done {
        value = pipeline::force_outer_incomplete(value);
    }
    let value = value.simplify();

    let mut ctx = ParsingContext::new(options.depth_limit);
    coerce::coerce(&value, schema, &mut ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_round_trips_through_the_public_entry_point() {
        let result = parse(r#"{"name": "Ada", "age": 36}"#, &person_schema(), &ParseOptions::default()).unwrap();
        assert_eq!(
            result.to_json(),
            serde_json::json!({"name": "Ada", "age": 36})
        );
    }

    #[test]
    fn trailing_prose_and_unquoted_keys_are_recovered() {
        let input = "Sure, here you go:\n{name: 'Ada', age: 36} — hope that helps!";
        let result = parse(input, &person_schema(), &ParseOptions::default()).unwrap();
        assert_eq!(
            result.to_json(),
            serde_json::json!({"name": "Ada", "age": 36})
        );
    }

    #[test]
    fn fenced_json_block_is_extracted() {
        let input = "```json\n{\"name\": \"Ada\", \"age\": 36}\n```";
        let result = parse(input, &person_schema(), &ParseOptions::default()).unwrap();
        assert_eq!(
            result.to_json(),
            serde_json::json!({"name": "Ada", "age": 36})
        );
    }

    #[test]
    fn bare_scalar_coerces_against_a_primitive_schema() {
        let result = parse("  42  ", &Schema::Int, &ParseOptions::default()).unwrap();
        assert_eq!(result.to_json(), serde_json::json!(42));
    }

    fn person_schema() -> Schema {
        Schema::object(
            "Person",
            vec![
                ObjectField::required("name", Schema::String),
                ObjectField::required("age", Schema::Int),
            ],
        )
    }
}
