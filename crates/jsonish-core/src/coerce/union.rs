//! Union resolver + scorer (spec §4.9).

use std::rc::Rc;

use crate::context::ParsingContext;
use crate::error::ParseError;
use crate::schema::{Literal, ObjectSchema, Schema};
use crate::value::{Number, Value};

use super::{coerce, CoercedShape, CoercedValue, CoercionFlag};

/// Resolves `value` against a union schema. Phase A tries a conservative,
/// flag-free cast of every arm; a single winner short-circuits straight to
/// it. Otherwise Phase B coerces every arm fully and scores the survivors.
pub fn resolve(value: &Value, arms: &Rc<Vec<Schema>>, ctx: &mut ParsingContext) -> Result<CoercedValue, ParseError> {
    let key = (Rc::as_ptr(arms) as usize, value.digest());
    if let Some(cached) = ctx.cached_union_result(key) {
        tracing::trace!(arms = arms.len(), "union result served from memo cache");
        return Ok(cached);
    }

    if let Some(result) = try_discriminated_dispatch(value, arms, ctx) {
        let result = result.map(|cv| {
            ctx.cache_union_result(key, cv.clone());
            cv
        })?;
        return Ok(result);
    }

    // Phase A — exact dispatch: a cast that succeeds with zero score.
    let exact: Vec<(usize, CoercedValue)> = arms
        .iter()
        .enumerate()
        .filter_map(|(i, arm)| match coerce(value, arm, ctx) {
            Ok(cv) if cv.score() == 0 => Some((i, cv)),
            _ => None,
        })
        .collect();

    if exact.len() == 1 {
        let (idx, mut cv) = exact.into_iter().next().unwrap();
        cv.flags.push(CoercionFlag::UnionMatch(idx));
        ctx.cache_union_result(key, cv.clone());
        return Ok(cv);
    }

    // Phase B — full coercion against every arm.
    let mut results: Vec<(usize, CoercedValue)> = Vec::new();
    let mut causes = Vec::new();
    for (i, arm) in arms.iter().enumerate() {
        match coerce(value, arm, ctx) {
            Ok(mut cv) => {
                cv.flags.push(CoercionFlag::UnionMatch(i));
                results.push((i, cv));
            }
            Err(err) => causes.push(err),
        }
    }

    if results.is_empty() {
        return Err(ParseError::NoUnionMatch { scope: ctx.scope_path(), causes });
    }

    let winner = select_winner(results);
    ctx.cache_union_result(key, winner.clone());
    Ok(winner)
}

/// Discriminated-union fast path (spec §4.8 point 5): when every arm is an
/// object schema that shares one field name typed as a literal, dispatch
/// straight to the arm whose literal equals the input's value at that
/// field, skipping scoring entirely.
fn try_discriminated_dispatch(
    value: &Value,
    arms: &[Schema],
    ctx: &mut ParsingContext,
) -> Option<Result<CoercedValue, ParseError>> {
    let obj_arms: Vec<Rc<ObjectSchema>> = arms
        .iter()
        .map(|arm| match arm.resolve() {
            Schema::Object(o) => Some(o),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    let discriminator = find_common_literal_field(&obj_arms)?;

    let (inner, _) = value.unwrap_layers();
    let fields = match inner {
        Value::Object(fields, _) => fields,
        _ => return None,
    };
    let (_, disc_value) = fields.iter().find(|(k, _)| k == &discriminator)?;

    for (i, obj) in obj_arms.iter().enumerate() {
        let field = obj.fields.iter().find(|f| f.name == discriminator)?;
        if let Schema::Literal(lit) = field.schema.resolve() {
            if literal_matches(&lit, disc_value) {
                let mut result = coerce(value, &arms[i], ctx);
                if let Ok(cv) = &mut result {
                    cv.flags.push(CoercionFlag::UnionMatch(i));
                }
                return Some(result);
            }
        }
    }
    None
}

fn find_common_literal_field(obj_arms: &[Rc<ObjectSchema>]) -> Option<String> {
    let first = obj_arms.first()?;
    'candidate: for field in &first.fields {
        if !matches!(field.schema.resolve(), Schema::Literal(_)) {
            continue;
        }
        for other in &obj_arms[1..] {
            let shared = other
                .fields
                .iter()
                .any(|f| f.name == field.name && matches!(f.schema.resolve(), Schema::Literal(_)));
            if !shared {
                continue 'candidate;
            }
        }
        return Some(field.name.clone());
    }
    None
}

fn literal_matches(lit: &Literal, value: &Value) -> bool {
    let (inner, _) = value.unwrap_layers();
    match (lit, inner) {
        (Literal::Str(s), Value::String(v, _)) => s == v,
        (Literal::Int(i), Value::Number(Number::Integer(v), _)) => i == v,
        (Literal::Bool(b), Value::Boolean(v)) => b == v,
        _ => false,
    }
}

/// Applies the pre-score selection heuristics (spec §4.9), then breaks any
/// remaining tie by lowest score, then composite-over-primitive, then
/// markdown-free-over-markdown-sourced, then earliest arm index.
fn select_winner(mut results: Vec<(usize, CoercedValue)>) -> CoercedValue {
    if results.iter().any(|(_, cv)| is_real_array(cv)) {
        results.retain(|(_, cv)| is_real_array(cv) || !has_flag(cv, CoercionFlag::SingleToArray));
    }
    if results.iter().any(|(_, cv)| has_real_object_content(cv)) {
        results.retain(|(_, cv)| !is_all_default_object(cv) || has_real_object_content(cv));
    }

    results.sort_by(|(ia, a), (ib, b)| {
        effective_score(a)
            .cmp(&effective_score(b))
            .then_with(|| composite_rank(a).cmp(&composite_rank(b)))
            .then_with(|| markdown_rank(a).cmp(&markdown_rank(b)))
            .then_with(|| ia.cmp(ib))
    });

    results.into_iter().next().map(|(_, cv)| cv).expect("results is non-empty")
}

/// Heuristic 5: a single-field object synthesized from a bare primitive
/// (`ImpliedKey`) carries a +1 synthetic penalty on top of its own flags,
/// so a real composite match is preferred over spurious wrapping even when
/// the raw flag-sum would otherwise tie.
fn effective_score(cv: &CoercedValue) -> i64 {
    let mut score = cv.score();
    if is_single_field_object_from_primitive(cv) {
        score += 1;
    }
    score
}

fn has_flag(cv: &CoercedValue, flag: CoercionFlag) -> bool {
    cv.flags.contains(&flag)
}

fn is_real_array(cv: &CoercedValue) -> bool {
    matches!(cv.shape, CoercedShape::Array(_)) && !has_flag(cv, CoercionFlag::SingleToArray)
}

fn is_defaulted_field(cv: &CoercedValue) -> bool {
    cv.flags.iter().any(|f| {
        matches!(
            f,
            CoercionFlag::DefaultFromNoValue
                | CoercionFlag::OptionalDefaultFromNoValue
                | CoercionFlag::DefaultButHadUnparseableValue
        )
    })
}

fn is_all_default_object(cv: &CoercedValue) -> bool {
    match &cv.shape {
        CoercedShape::Object(fields) => !fields.is_empty() && fields.iter().all(|(_, v)| is_defaulted_field(v)),
        _ => false,
    }
}

fn has_real_object_content(cv: &CoercedValue) -> bool {
    match &cv.shape {
        CoercedShape::Object(fields) => fields.iter().any(|(_, v)| !is_defaulted_field(v)),
        _ => false,
    }
}

fn composite_rank(cv: &CoercedValue) -> u8 {
    match cv.shape {
        CoercedShape::Array(_) | CoercedShape::Object(_) => 0,
        _ => 1,
    }
}

fn markdown_rank(cv: &CoercedValue) -> u8 {
    if cv.flags.iter().any(|f| matches!(f, CoercionFlag::ObjectFromMarkdown(_))) {
        1
    } else {
        0
    }
}

fn is_single_field_object_from_primitive(cv: &CoercedValue) -> bool {
    matches!(&cv.shape, CoercedShape::Object(fields) if fields.len() == 1)
        && has_flag(cv, CoercionFlag::ImpliedKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumMember, Literal, ObjectField};
    use crate::value::CompletionState;

    #[test]
    fn exact_dispatch_picks_sole_matching_arm() {
        let mut ctx = ParsingContext::new(50);
        let arms = Rc::new(vec![Schema::String, Schema::Int]);
        let v = Value::Number(Number::Integer(42), CompletionState::Complete);
        let result = resolve(&v, &arms, &mut ctx).unwrap();
        assert!(matches!(result.shape, CoercedShape::Int(42)));
        assert_eq!(result.score(), 0);
    }

    #[test]
    fn string_wins_over_number_for_prose_with_bare_number() {
        let mut ctx = ParsingContext::new(50);
        let arms = Rc::new(vec![Schema::String, Schema::Int]);
        let v = Value::string("1 cup butter", CompletionState::Complete);
        let result = resolve(&v, &arms, &mut ctx).unwrap();
        match result.shape {
            CoercedShape::String(s) => assert_eq!(s, "1 cup butter"),
            _ => panic!("expected the string arm to win"),
        }
    }

    #[test]
    fn discriminated_union_skips_scoring() {
        let mut ctx = ParsingContext::new(50);
        let cat = Schema::object(
            "Cat",
            vec![
                ObjectField::required("kind", Schema::Literal(Literal::Str("cat".into()))),
                ObjectField::required("lives", Schema::Int),
            ],
        );
        let dog = Schema::object(
            "Dog",
            vec![
                ObjectField::required("kind", Schema::Literal(Literal::Str("dog".into()))),
                ObjectField::required("breed", Schema::String),
            ],
        );
        let arms = Rc::new(vec![cat, dog]);
        let v = Value::Object(
            vec![
                ("kind".into(), Value::string("dog", CompletionState::Complete)),
                ("breed".into(), Value::string("collie", CompletionState::Complete)),
            ],
            CompletionState::Complete,
        );
        let result = resolve(&v, &arms, &mut ctx).unwrap();
        match result.shape {
            CoercedShape::Object(fields) => {
                assert!(fields.iter().any(|(n, _)| n == "breed"));
            }
            _ => panic!("expected the dog arm"),
        }
    }

    #[test]
    fn memoized_result_is_reused_for_identical_value_digest() {
        let mut ctx = ParsingContext::new(50);
        let arms = Rc::new(vec![Schema::enum_of(vec![EnumMember::new("A"), EnumMember::new("B")])]);
        let v = Value::string("A", CompletionState::Complete);
        let first = resolve(&v, &arms, &mut ctx).unwrap();
        let second = resolve(&v, &arms, &mut ctx).unwrap();
        assert_eq!(first.score(), second.score());
    }
}
