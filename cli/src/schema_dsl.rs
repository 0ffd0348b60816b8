//! Translates a small JSON-based schema description into a
//! [`jsonish_core::Schema`] tree the library can coerce against.
//!
//! This is the CLI's only concern with schema *authoring* — the library
//! itself treats schemas as an opaque, already-built [`Schema`] (its own
//! description format is out of scope for `jsonish-core`). The DSL below
//! covers the common JSON-Schema-flavored shapes: primitives, `enum`,
//! `const`, `array`, object `properties`/`required`, a string-or-enum-keyed
//! map via `additionalProperties`, `anyOf`/`oneOf` unions, and `$ref` into a
//! sibling `$defs` map (resolved lazily so recursive schemas work).
//!
//! ```json
//! {
//!   "$defs": {
//!     "Node": {
//!       "type": "object",
//!       "properties": {
//!         "value": { "type": "integer" },
//!         "children": { "type": "array", "items": { "$ref": "#/$defs/Node" } }
//!       },
//!       "required": ["value"]
//!     }
//!   },
//!   "$ref": "#/$defs/Node"
//! }
//! ```

use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use jsonish_core::{EnumMember, Literal, ObjectField, Schema};
use serde_json::Value as Json;

/// Compiles a root schema description (with its own `$defs`, if any) into a
/// [`Schema`]. `$ref`s are resolved against `$defs` lazily via
/// [`Schema::lazy`], so self- and mutually-recursive definitions compile
/// without infinite recursion at build time.
pub fn compile(root: &Json) -> Result<Schema> {
    let defs = root
        .get("$defs")
        .or_else(|| root.get("definitions"))
        .and_then(Json::as_object)
        .cloned()
        .unwrap_or_default();
    let defs = Rc::new(defs);
    build(root, &defs)
}

fn build(node: &Json, defs: &Rc<serde_json::Map<String, Json>>) -> Result<Schema> {
    if let Some(reference) = node.get("$ref").and_then(Json::as_str) {
        let name = ref_name(reference)?;
        let defs = Rc::clone(defs);
        let def = defs
            .get(&name)
            .cloned()
            .ok_or_else(|| anyhow!("unresolved $ref {reference:?}"))?;
        return Ok(Schema::lazy(name.clone(), move || {
            build(&def, &defs).unwrap_or_else(|err| panic!("invalid schema at $ref {name:?}: {err}"))
        }));
    }

    if let Some(variants) = node.get("anyOf").or_else(|| node.get("oneOf")).and_then(Json::as_array) {
        let arms = variants.iter().map(|v| build(v, defs)).collect::<Result<Vec<_>>>()?;
        return Ok(Schema::union(arms));
    }

    if let Some(values) = node.get("enum").and_then(Json::as_array) {
        let members = values
            .iter()
            .map(|v| v.as_str().map(EnumMember::new).ok_or_else(|| anyhow!("enum members must be strings")))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Schema::enum_of(members));
    }

    if let Some(constant) = node.get("const") {
        return literal_of(constant).map(Schema::Literal);
    }

    let mut schema = match node.get("type").and_then(Json::as_str) {
        Some("string") => Schema::String,
        Some("integer") => Schema::Int,
        Some("number") => Schema::Float,
        Some("boolean") => Schema::Bool,
        Some("null") => Schema::Null,
        Some("array") => {
            let elem = node.get("items").map(|it| build(it, defs)).transpose()?.unwrap_or(Schema::String);
            Schema::array(elem)
        }
        Some("object") => build_object(node, defs)?,
        Some(other) => bail!("unsupported schema type {other:?}"),
        None if node.get("properties").is_some() => build_object(node, defs)?,
        None => bail!("schema node is missing a \"type\""),
    };

    if let Some(default) = node.get("default") {
        schema = Schema::default_value(schema, literal_of(default)?);
    }
    if node.get("nullable").and_then(Json::as_bool).unwrap_or(false) {
        schema = Schema::nullable(schema);
    }
    Ok(schema)
}

fn build_object(node: &Json, defs: &Rc<serde_json::Map<String, Json>>) -> Result<Schema> {
    if let Some(value_schema) = node.get("additionalProperties").filter(|v| !v.is_boolean()) {
        let key_schema = node
            .get("propertyNames")
            .map(|k| build(k, defs))
            .transpose()?
            .unwrap_or(Schema::String);
        let val_schema = build(value_schema, defs)?;
        return Ok(Schema::map(key_schema, val_schema));
    }

    let properties = node
        .get("properties")
        .and_then(Json::as_object)
        .cloned()
        .unwrap_or_default();
    let required: Vec<String> = node
        .get("required")
        .and_then(Json::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let mut fields = Vec::with_capacity(properties.len());
    for (name, prop) in &properties {
        let field_schema = build(prop, defs).with_context(|| format!("field {name:?}"))?;
        let mut field = if required.contains(name) {
            ObjectField::required(name.clone(), field_schema)
        } else {
            ObjectField::optional(name.clone(), field_schema)
        };
        if let Some(default) = prop.get("default") {
            field = field.with_default(literal_of(default)?);
        }
        if let Some(aliases) = prop.get("aliases").and_then(Json::as_array) {
            field = field.with_aliases(aliases.iter().filter_map(|a| a.as_str().map(String::from)));
        }
        fields.push(field);
    }

    let name = node.get("title").and_then(Json::as_str).unwrap_or("object").to_string();
    Ok(Schema::object(name, fields))
}

fn literal_of(value: &Json) -> Result<Literal> {
    match value {
        Json::String(s) => Ok(Literal::Str(s.clone())),
        Json::Bool(b) => Ok(Literal::Bool(*b)),
        Json::Number(n) if n.is_i64() || n.is_u64() => Ok(Literal::Int(n.as_i64().unwrap())),
        other => bail!("unsupported literal value {other}"),
    }
}

fn ref_name(reference: &str) -> Result<String> {
    reference
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| anyhow!("malformed $ref {reference:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_primitive_object_schema() {
        let schema = compile(&serde_json::json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer"}
            },
            "required": ["name"]
        }))
        .unwrap();
        match schema {
            Schema::Object(obj) => {
                assert_eq!(obj.fields.len(), 2);
                assert!(obj.fields.iter().find(|f| f.name == "name").unwrap().required);
                assert!(!obj.fields.iter().find(|f| f.name == "age").unwrap().required);
            }
            _ => panic!("expected object schema"),
        }
    }

    #[test]
    fn compiles_enum_and_union() {
        let schema = compile(&serde_json::json!({
            "anyOf": [
                {"enum": ["A", "B"]},
                {"type": "integer"}
            ]
        }))
        .unwrap();
        assert!(matches!(schema, Schema::Union(arms) if arms.len() == 2));
    }

    #[test]
    fn recursive_ref_resolves_lazily() {
        let schema = compile(&serde_json::json!({
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "integer"},
                        "children": {"type": "array", "items": {"$ref": "#/$defs/Node"}}
                    },
                    "required": ["value"]
                }
            },
            "$ref": "#/$defs/Node"
        }))
        .unwrap();
        match schema {
            Schema::Lazy(lazy) => match lazy.resolve() {
                Schema::Object(obj) => assert_eq!(obj.name, "Node"),
                _ => panic!("expected object"),
            },
            _ => panic!("expected lazy schema"),
        }
    }
}
