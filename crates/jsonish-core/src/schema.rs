//! The schema introspection surface the coercer consumes.
//!
//! The schema-description library itself is out of scope (spec §1) — this
//! module only models the introspectable *shape* a schema exposes: field
//! names, enum members, literal values, union arms, optional/nullable
//! modifiers, array element type, map key/value types, and lazy/recursive
//! references. A real integration would implement a thin adapter from a
//! user's own schema type to [`Schema`]; this crate ships [`Schema`] itself
//! as a concrete, constructible tree so the coercer is directly usable and
//! testable.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A literal scalar value, used for `literal(value)` schemas and for field
/// defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
}

/// One member of an `enum` schema.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub description: Option<String>,
}

impl EnumMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
        }
    }
}

/// One field of an `object` schema.
#[derive(Clone)]
pub struct ObjectField {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
    pub default: Option<Literal>,
    /// Known domain aliases beyond the automatic `snake_case`/`camelCase`/
    /// `kebab-case`/space-separated folding the object coercer always tries.
    pub aliases: Vec<String>,
}

impl ObjectField {
    pub fn required(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: true,
            default: None,
            aliases: Vec::new(),
        }
    }

    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: false,
            default: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: Literal) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = String>) -> Self {
        self.aliases = aliases.into_iter().collect();
        self
    }
}

/// The full shape of an `object` schema.
pub struct ObjectSchema {
    /// A name used in diagnostics and as part of the recursion-guard identity.
    pub name: String,
    pub fields: Vec<ObjectField>,
}

/// A schema whose body is produced lazily, used to express recursive types
/// (`JsonValue = null | bool | ... | array<JsonValue> | map<string,JsonValue>`).
///
/// The thunk is evaluated at most once per `LazySchema` instance; the result
/// is cached so repeated resolution during union scoring does not re-walk
/// the definition.
pub struct LazySchema {
    pub name: String,
    thunk: Box<dyn Fn() -> Schema>,
    cache: RefCell<Option<Schema>>,
}

impl LazySchema {
    pub fn resolve(&self) -> Schema {
        if let Some(cached) = self.cache.borrow().as_ref() {
            return cached.clone();
        }
        let resolved = (self.thunk)();
        *self.cache.borrow_mut() = Some(resolved.clone());
        resolved
    }
}

impl fmt::Debug for LazySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySchema").field("name", &self.name).finish()
    }
}

/// The introspectable shape of a user's expected type.
///
/// Composite variants (`Array`, `Map`, `Object`, `Union`, `Optional`,
/// `Nullable`, `Default`, `Lazy`) wrap their payload in `Rc` so `Schema` is
/// cheap to clone and so pointer identity can anchor the recursion guard in
/// [`crate::context::ParsingContext`].
#[derive(Clone)]
pub enum Schema {
    String,
    Int,
    Float,
    Bool,
    Null,
    Literal(Literal),
    Enum(Rc<Vec<EnumMember>>),
    Array(Rc<Schema>),
    /// `(key, value)`. Key must resolve (after stripping `Optional`/`Lazy`)
    /// to `String`, `Enum`, or a string `Literal`.
    Map(Rc<Schema>, Rc<Schema>),
    Object(Rc<ObjectSchema>),
    Union(Rc<Vec<Schema>>),
    Optional(Rc<Schema>),
    Nullable(Rc<Schema>),
    Default(Rc<Schema>, Literal),
    Lazy(Rc<LazySchema>),
}

impl Schema {
    pub fn array(elem: Schema) -> Schema {
        Schema::Array(Rc::new(elem))
    }

    pub fn map(key: Schema, value: Schema) -> Schema {
        Schema::Map(Rc::new(key), Rc::new(value))
    }

    pub fn object(name: impl Into<String>, fields: Vec<ObjectField>) -> Schema {
        Schema::Object(Rc::new(ObjectSchema {
            name: name.into(),
            fields,
        }))
    }

    pub fn union(arms: Vec<Schema>) -> Schema {
        Schema::Union(Rc::new(arms))
    }

    pub fn enum_of(members: Vec<EnumMember>) -> Schema {
        Schema::Enum(Rc::new(members))
    }

    pub fn optional(inner: Schema) -> Schema {
        Schema::Optional(Rc::new(inner))
    }

    pub fn nullable(inner: Schema) -> Schema {
        Schema::Nullable(Rc::new(inner))
    }

    pub fn default_value(inner: Schema, default: Literal) -> Schema {
        Schema::Default(Rc::new(inner), default)
    }

    pub fn lazy(name: impl Into<String>, thunk: impl Fn() -> Schema + 'static) -> Schema {
        Schema::Lazy(Rc::new(LazySchema {
            name: name.into(),
            thunk: Box::new(thunk),
            cache: RefCell::new(None),
        }))
    }

    /// A stable identity for this schema node, used to key recursion-guard
    /// and union-scoring caches. Primitive/literal variants collapse to a
    /// fixed sentinel per kind — they cannot participate in a cycle, so
    /// collisions among them are harmless.
    pub fn identity(&self) -> usize {
        match self {
            Schema::String => 1,
            Schema::Int => 2,
            Schema::Float => 3,
            Schema::Bool => 4,
            Schema::Null => 5,
            Schema::Literal(_) => 6,
            Schema::Enum(e) => Rc::as_ptr(e) as usize,
            Schema::Array(inner) => Rc::as_ptr(inner) as usize,
            Schema::Map(k, v) => (Rc::as_ptr(k) as usize) ^ (Rc::as_ptr(v) as usize).rotate_left(1),
            Schema::Object(o) => Rc::as_ptr(o) as usize,
            Schema::Union(arms) => Rc::as_ptr(arms) as usize,
            Schema::Optional(inner) => (Rc::as_ptr(inner) as usize).rotate_left(3),
            Schema::Nullable(inner) => (Rc::as_ptr(inner) as usize).rotate_left(5),
            Schema::Default(inner, _) => (Rc::as_ptr(inner) as usize).rotate_left(7),
            Schema::Lazy(l) => Rc::as_ptr(l) as usize,
        }
    }

    /// Strips `Optional`/`Nullable`/`Default` modifiers and resolves `Lazy`
    /// thunks to reach the underlying shape.
    pub fn resolve(&self) -> Schema {
        match self {
            Schema::Optional(inner) => inner.resolve(),
            Schema::Nullable(inner) => inner.resolve(),
            Schema::Default(inner, _) => inner.resolve(),
            Schema::Lazy(l) => l.resolve().resolve(),
            other => other.clone(),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Schema::Optional(_) | Schema::Nullable(_))
    }

    pub fn default_literal(&self) -> Option<&Literal> {
        match self {
            Schema::Default(_, lit) => Some(lit),
            _ => None,
        }
    }

    /// A human-readable name for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Schema::String => "string".into(),
            Schema::Int => "int".into(),
            Schema::Float => "float".into(),
            Schema::Bool => "bool".into(),
            Schema::Null => "null".into(),
            Schema::Literal(Literal::Str(s)) => format!("literal({s:?})"),
            Schema::Literal(Literal::Int(i)) => format!("literal({i})"),
            Schema::Literal(Literal::Bool(b)) => format!("literal({b})"),
            Schema::Enum(members) => format!(
                "enum[{}]",
                members
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            Schema::Array(inner) => format!("array<{}>", inner.describe()),
            Schema::Map(k, v) => format!("map<{}, {}>", k.describe(), v.describe()),
            Schema::Object(o) => format!("object({})", o.name),
            Schema::Union(arms) => arms
                .iter()
                .map(Schema::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            Schema::Optional(inner) => format!("optional<{}>", inner.describe()),
            Schema::Nullable(inner) => format!("nullable<{}>", inner.describe()),
            Schema::Default(inner, _) => format!("default<{}>", inner.describe()),
            Schema::Lazy(l) => format!("lazy({})", l.name),
        }
    }
}
