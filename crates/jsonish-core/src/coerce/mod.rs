//! Schema-directed coercion: turns an untyped [`crate::value::Value`] into a
//! [`CoercedValue`] shaped like the target [`crate::schema::Schema`], with a
//! running list of [`CoercionFlag`]s recording every lossy or uncertain step
//! taken along the way. Flags drive union-arm scoring (`score`, §4.9) and are
//! surfaced to callers as provenance.

mod array;
mod map;
mod object;
mod primitive;
mod string_matcher;
mod union;

use serde_json::Value as Json;

use crate::context::ParsingContext;
use crate::error::ParseError;
use crate::schema::Schema;
use crate::value::Value;

/// A single lossy, ambiguous, or inferred step taken while coercing a value
/// toward its target schema. See spec §3/§4.9 for the full catalogue and the
/// penalty table `CoercedValue::score` sums over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoercionFlag {
    ObjectFromMarkdown(usize),
    ObjectFromFixedJson,
    DefaultFromNoValue,
    DefaultButHadValue,
    OptionalDefaultFromNoValue,
    DefaultButHadUnparseableValue,
    ObjectToString,
    ObjectToPrimitive,
    ObjectToMap,
    ExtraKey,
    StrippedPunctuation,
    SubstringMatch,
    SingleToArray,
    ArrayItemParseError,
    MapKeyParseError,
    MapValueParseError,
    JsonToString,
    ImpliedKey,
    InferredObject,
    UnionMatch(usize),
    StrMatchOneFromMany(usize),
    StringToBool,
    StringToNull,
    StringToFloat,
    FloatToInt,
    Incomplete,
    Pending,
    FirstMatch,
    /// A constraint-validation outcome; reserved for schema constraint
    /// checks layered on top of coercion (not implemented by this crate).
    ConstraintResults,
    /// An object coerced successfully but every field came from a default,
    /// not the input — used by the union resolver to prefer arms with real
    /// content (spec §4.9 heuristic 2).
    NoFields,
}

impl CoercionFlag {
    /// The per-occurrence penalty this flag contributes to `CoercedValue::score`.
    pub fn penalty(self) -> i64 {
        match self {
            CoercionFlag::ObjectFromMarkdown(depth) => depth as i64,
            CoercionFlag::StrMatchOneFromMany(count) => count as i64,
            CoercionFlag::UnionMatch(_)
            | CoercionFlag::ConstraintResults
            | CoercionFlag::Incomplete
            | CoercionFlag::Pending
            | CoercionFlag::InferredObject
            | CoercionFlag::ObjectFromFixedJson => 0,
            CoercionFlag::OptionalDefaultFromNoValue
            | CoercionFlag::ExtraKey
            | CoercionFlag::SingleToArray
            | CoercionFlag::StringToBool
            | CoercionFlag::StringToNull
            | CoercionFlag::StringToFloat
            | CoercionFlag::FloatToInt
            | CoercionFlag::MapKeyParseError
            | CoercionFlag::MapValueParseError
            | CoercionFlag::NoFields
            | CoercionFlag::FirstMatch => 1,
            CoercionFlag::ObjectToString
            | CoercionFlag::ObjectToPrimitive
            | CoercionFlag::ObjectToMap
            | CoercionFlag::SubstringMatch
            | CoercionFlag::ImpliedKey
            | CoercionFlag::JsonToString
            | CoercionFlag::DefaultButHadUnparseableValue
            | CoercionFlag::ArrayItemParseError => 2,
            CoercionFlag::StrippedPunctuation => 3,
            CoercionFlag::DefaultFromNoValue => 100,
            CoercionFlag::DefaultButHadValue => 110,
        }
    }
}

/// The coerced result shape. `Map` entries are represented the same way as
/// `Object` fields (both are ordered `(String, CoercedValue)` pairs) since a
/// map's key schema is always string-like; the distinction only matters
/// during coercion, not in the output shape.
#[derive(Debug, Clone)]
pub enum CoercedShape {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    Array(Vec<CoercedValue>),
    Object(Vec<(String, CoercedValue)>),
}

#[derive(Debug, Clone)]
pub struct CoercedValue {
    pub shape: CoercedShape,
    pub flags: Vec<CoercionFlag>,
}

impl CoercedValue {
    pub fn new(shape: CoercedShape, flags: Vec<CoercionFlag>) -> Self {
        Self { shape, flags }
    }

    pub fn leaf(shape: CoercedShape) -> Self {
        Self::new(shape, Vec::new())
    }

    pub fn with_flag(mut self, flag: CoercionFlag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = CoercionFlag>) -> Self {
        self.flags.extend(flags);
        self
    }

    /// The union-arm score (spec §4.9): sum of this node's own flag
    /// penalties, plus ten times the sum of every child's score. Lower is
    /// better; an exact, unmodified match scores zero.
    pub fn score(&self) -> i64 {
        let own: i64 = self.flags.iter().map(|f| f.penalty()).sum();
        let children: i64 = match &self.shape {
            CoercedShape::Array(items) => items.iter().map(CoercedValue::score).sum(),
            CoercedShape::Object(fields) => fields.iter().map(|(_, v)| v.score()).sum(),
            _ => 0,
        };
        own + 10 * children
    }

    pub fn to_json(&self) -> Json {
        match &self.shape {
            CoercedShape::String(s) => Json::String(s.clone()),
            CoercedShape::Int(i) => Json::Number((*i).into()),
            CoercedShape::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            CoercedShape::Bool(b) => Json::Bool(*b),
            CoercedShape::Null => Json::Null,
            CoercedShape::Array(items) => Json::Array(items.iter().map(CoercedValue::to_json).collect()),
            CoercedShape::Object(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Coerces `value` toward `schema`. This is the single entry point every
/// composite coercer recurses through — it is also the only place `AnyOf`
/// is resolved, regardless of what schema it's being matched against.
pub fn coerce(value: &Value, schema: &Schema, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    if ctx.depth_exceeded() {
        tracing::warn!(scope = %ctx.scope_path(), max_depth = ctx.depth_limit(), "coercion depth limit exceeded");
        return Err(ParseError::DepthLimitExceeded {
            scope: ctx.scope_path(),
            max_depth: ctx.depth_limit(),
        });
    }

    match value {
        Value::AnyOf(candidates, _original_text) => resolve_any_of(candidates, schema, ctx),
        _ => coerce_concrete(value, schema, ctx).map(|cv| {
            if value.is_self_incomplete() {
                cv.with_flag(CoercionFlag::Incomplete)
            } else {
                cv
            }
        }),
    }
}

/// Picks, among every successfully-coerced `AnyOf` candidate, the one with
/// the lowest `score()` (ties broken by candidate order). This is what lets
/// a schema-agnostic "try every interpretation" pipeline boundary resolve
/// into a single typed result, whether or not the target schema is itself a
/// union.
fn resolve_any_of(candidates: &[Value], schema: &Schema, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let mut best: Option<CoercedValue> = None;
    let mut best_score = i64::MAX;
    let mut causes = Vec::new();

    for candidate in candidates {
        match coerce(candidate, schema, ctx) {
            Ok(coerced) => {
                let score = coerced.score();
                if score < best_score {
                    best_score = score;
                    best = Some(coerced);
                }
            }
            Err(err) => causes.push(err),
        }
    }

    best.ok_or_else(|| ParseError::NoUnionMatch {
        scope: ctx.scope_path(),
        causes,
    })
}

fn coerce_concrete(value: &Value, schema: &Schema, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    match schema {
        Schema::Optional(inner) => coerce_optional(value, inner, ctx),
        Schema::Nullable(inner) => coerce_optional(value, inner, ctx),
        Schema::Default(inner, default) => coerce_default(value, inner, default, ctx),
        Schema::Lazy(lazy) => {
            let key = (schema.identity(), value.digest());
            if ctx.mark_visited(key) {
                return Err(ParseError::CircularReference { scope: ctx.scope_path() });
            }
            let resolved = lazy.resolve();
            let result = coerce(value, &resolved, ctx);
            ctx.unmark_visited(&key);
            result
        }
        Schema::Union(arms) => union::resolve(value, arms, ctx),
        Schema::String => primitive::coerce_string(value, ctx),
        Schema::Int => primitive::coerce_int(value, ctx),
        Schema::Float => primitive::coerce_float(value, ctx),
        Schema::Bool => primitive::coerce_bool(value, ctx),
        Schema::Null => primitive::coerce_null(value, ctx),
        Schema::Literal(lit) => primitive::coerce_literal(value, lit, ctx),
        Schema::Enum(members) => primitive::coerce_enum(value, members, ctx),
        Schema::Array(elem) => array::coerce(value, elem, ctx),
        Schema::Map(key, val) => map::coerce(value, key, val, ctx),
        Schema::Object(obj) => object::coerce(value, obj, ctx),
    }
}

/// `Optional`/`Nullable` schemas: `Null` input (or, for `Optional`, "no
/// value at all" handled one level up by the object coercer) yields `Null`
/// with no flag — the absence is exactly what was asked for, not a defect.
/// Any other input coerces against the inner schema unmodified.
fn coerce_optional(value: &Value, inner: &Schema, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    if value.is_null() {
        return Ok(CoercedValue::leaf(CoercedShape::Null));
    }
    coerce(value, inner, ctx)
}

/// `Default` schemas never fail: a coercible value is used as-is (flagged
/// `DefaultButHadValue` since having a default at all implies the field was
/// optional), `Null` or an uncoercible value falls back to the literal
/// default (`DefaultFromNoValue` / `DefaultButHadUnparseableValue`).
fn coerce_default(
    value: &Value,
    inner: &Schema,
    default: &crate::schema::Literal,
    ctx: &mut ParsingContext,
) -> Result<CoercedValue, ParseError> {
    use crate::schema::Literal;

    if value.is_null() {
        return Ok(default_coerced_value(default).with_flag(CoercionFlag::DefaultFromNoValue));
    }

    match coerce(value, inner, ctx) {
        Ok(coerced) => Ok(coerced.with_flag(CoercionFlag::DefaultButHadValue)),
        Err(_) => Ok(default_coerced_value(default).with_flag(CoercionFlag::DefaultButHadUnparseableValue)),
    }
}

pub(crate) fn default_coerced_value(default: &crate::schema::Literal) -> CoercedValue {
    use crate::schema::Literal;
    let shape = match default {
        Literal::Str(s) => CoercedShape::String(s.clone()),
        Literal::Int(i) => CoercedShape::Int(*i),
        Literal::Bool(b) => CoercedShape::Bool(*b),
    };
    CoercedValue::leaf(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Literal, Schema};
    use crate::value::{CompletionState, Value};

    #[test]
    fn score_sums_child_scores_times_ten() {
        let leaf = CoercedValue::leaf(CoercedShape::Int(1)).with_flag(CoercionFlag::FloatToInt);
        assert_eq!(leaf.score(), 1);

        let obj = CoercedValue::leaf(CoercedShape::Object(vec![("a".into(), leaf)]));
        assert_eq!(obj.score(), 10);
    }

    #[test]
    fn any_of_picks_lowest_scoring_candidate() {
        let mut ctx = ParsingContext::new(50);
        let value = Value::AnyOf(
            vec![
                Value::String("42".into(), CompletionState::Complete),
                Value::Number(crate::value::Number::Integer(42), CompletionState::Complete),
            ],
            "42".into(),
        );
        let result = coerce(&value, &Schema::Int, &mut ctx).unwrap();
        assert!(matches!(result.shape, CoercedShape::Int(42)));
        assert_eq!(result.score(), 0);
    }

    #[test]
    fn default_schema_falls_back_on_null() {
        let mut ctx = ParsingContext::new(50);
        let result = coerce(&Value::Null, &Schema::default_value(Schema::Int, Literal::Int(7)), &mut ctx).unwrap();
        assert!(matches!(result.shape, CoercedShape::Int(7)));
        assert!(result.flags.contains(&CoercionFlag::DefaultFromNoValue));
    }

    #[test]
    fn optional_schema_passes_null_through() {
        let mut ctx = ParsingContext::new(50);
        let result = coerce(&Value::Null, &Schema::optional(Schema::Int), &mut ctx).unwrap();
        assert!(matches!(result.shape, CoercedShape::Null));
    }

    #[test]
    fn incomplete_source_value_carries_the_incomplete_flag() {
        let mut ctx = ParsingContext::new(50);
        let value = Value::String("truncated".into(), CompletionState::Incomplete);
        let result = coerce(&value, &Schema::String, &mut ctx).unwrap();
        assert!(result.flags.contains(&CoercionFlag::Incomplete));
        assert_eq!(result.score(), 0, "Incomplete carries zero scoring penalty");
    }

    #[test]
    fn depth_limit_is_enforced_before_dispatch() {
        let mut ctx = ParsingContext::new(0);
        ctx.enter_field("x", |ctx| {
            let err = coerce(&Value::Null, &Schema::Int, ctx).unwrap_err();
            assert!(matches!(err, ParseError::DepthLimitExceeded { .. }));
        });
    }
}
