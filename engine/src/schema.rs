//! Schema declaration and resolution.
//!
//! A schema maps attribute names to [`Declaration`]s. Declarations come in the
//! three shapes applications write them in: a bare type, an object of type plus
//! constraints ([`AttributeDef`]), or a one-element array of either, meaning the
//! attribute is multi-valued. [`Schema::resolve`] normalizes a declaration into
//! a [`Descriptor`], evaluating any computed constraints against the record it
//! is resolved for.

use crate::{Record, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name of the identifier attribute when a schema does not choose one.
pub const DEFAULT_IDENTIFIER: &str = "id";

/// Attribute types understood by the codec and validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrType {
    String,
    Number,
    Boolean,
    Date,
    /// Structured JSON. Stored with the generic codec, rejected by validation.
    Object,
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::String => write!(f, "String"),
            AttrType::Number => write!(f, "Number"),
            AttrType::Boolean => write!(f, "Boolean"),
            AttrType::Date => write!(f, "Date"),
            AttrType::Object => write!(f, "Object"),
        }
    }
}

type ConstraintFn<T> = Arc<dyn Fn(&Record) -> Option<T> + Send + Sync>;

/// A constraint value: either a literal or a function of the record instance.
///
/// Computed constraints are evaluated every time a descriptor is resolved.
pub enum Constraint<T> {
    Fixed(T),
    Computed(ConstraintFn<T>),
}

impl<T: Clone> Constraint<T> {
    /// Wrap a function of the record instance.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Option<T> + Send + Sync + 'static,
    {
        Constraint::Computed(Arc::new(f))
    }

    /// Evaluate the constraint for `record`.
    pub fn resolve(&self, record: &Record) -> Option<T> {
        match self {
            Constraint::Fixed(value) => Some(value.clone()),
            Constraint::Computed(f) => f(record),
        }
    }
}

impl<T: Clone> Clone for Constraint<T> {
    fn clone(&self) -> Self {
        match self {
            Constraint::Fixed(value) => Constraint::Fixed(value.clone()),
            Constraint::Computed(f) => Constraint::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Constraint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Constraint::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

fn resolve<T: Clone>(constraint: &Option<Constraint<T>>, record: &Record) -> Option<T> {
    constraint.as_ref().and_then(|c| c.resolve(record))
}

/// Object-form declaration: a type plus named constraints.
#[derive(Debug, Clone)]
pub struct AttributeDef {
    kind: AttrType,
    array: Option<Constraint<bool>>,
    nullable: Option<Constraint<bool>>,
    default: Option<Constraint<Value>>,
    min: Option<Constraint<Value>>,
    max: Option<Constraint<Value>>,
    min_length: Option<Constraint<i64>>,
    max_length: Option<Constraint<i64>>,
    min_size: Option<Constraint<i64>>,
    max_size: Option<Constraint<i64>>,
    precision: Option<Constraint<u32>>,
    length: Option<Constraint<u32>>,
    enum_values: Option<Constraint<Vec<Value>>>,
    pattern: Option<Constraint<Regex>>,
    trim: Option<Constraint<bool>>,
    lowercase: Option<Constraint<bool>>,
    uppercase: Option<Constraint<bool>>,
    on_update: Option<Constraint<Value>>,
}

impl AttributeDef {
    pub fn new(kind: AttrType) -> Self {
        Self {
            kind,
            array: None,
            nullable: None,
            default: None,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            min_size: None,
            max_size: None,
            precision: None,
            length: None,
            enum_values: None,
            pattern: None,
            trim: None,
            lowercase: None,
            uppercase: None,
            on_update: None,
        }
    }

    pub fn string() -> Self {
        Self::new(AttrType::String)
    }

    pub fn number() -> Self {
        Self::new(AttrType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(AttrType::Boolean)
    }

    pub fn date() -> Self {
        Self::new(AttrType::Date)
    }

    /// Mark the attribute multi-valued.
    pub fn array(mut self) -> Self {
        self.array = Some(Constraint::Fixed(true));
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(Constraint::Fixed(nullable));
        self
    }

    pub fn nullable_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Option<bool> + Send + Sync + 'static,
    {
        self.nullable = Some(Constraint::computed(f));
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(Constraint::Fixed(value.into()));
        self
    }

    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Option<Value> + Send + Sync + 'static,
    {
        self.default = Some(Constraint::computed(f));
        self
    }

    /// Lower bound. For numbers this is also the encoding offset.
    pub fn min(mut self, value: impl Into<Value>) -> Self {
        self.min = Some(Constraint::Fixed(value.into()));
        self
    }

    pub fn min_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Option<Value> + Send + Sync + 'static,
    {
        self.min = Some(Constraint::computed(f));
        self
    }

    pub fn max(mut self, value: impl Into<Value>) -> Self {
        self.max = Some(Constraint::Fixed(value.into()));
        self
    }

    pub fn max_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Option<Value> + Send + Sync + 'static,
    {
        self.max = Some(Constraint::computed(f));
        self
    }

    pub fn min_length(mut self, n: i64) -> Self {
        self.min_length = Some(Constraint::Fixed(n));
        self
    }

    pub fn max_length(mut self, n: i64) -> Self {
        self.max_length = Some(Constraint::Fixed(n));
        self
    }

    pub fn min_size(mut self, n: i64) -> Self {
        self.min_size = Some(Constraint::Fixed(n));
        self
    }

    pub fn max_size(mut self, n: i64) -> Self {
        self.max_size = Some(Constraint::Fixed(n));
        self
    }

    /// Fractional digits kept by the number codec.
    pub fn precision(mut self, digits: u32) -> Self {
        self.precision = Some(Constraint::Fixed(digits));
        self
    }

    /// Zero-padded width of the integer part in the number codec.
    pub fn length(mut self, digits: u32) -> Self {
        self.length = Some(Constraint::Fixed(digits));
        self
    }

    pub fn one_of<T: Into<Value>>(mut self, values: Vec<T>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.enum_values = Some(Constraint::Fixed(values));
        self
    }

    pub fn matches(mut self, pattern: Regex) -> Self {
        self.pattern = Some(Constraint::Fixed(pattern));
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = Some(Constraint::Fixed(true));
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = Some(Constraint::Fixed(true));
        self
    }

    pub fn uppercase(mut self) -> Self {
        self.uppercase = Some(Constraint::Fixed(true));
        self
    }

    /// Value written on every save.
    pub fn on_update(mut self, value: impl Into<Value>) -> Self {
        self.on_update = Some(Constraint::Fixed(value.into()));
        self
    }

    pub fn on_update_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_update = Some(Constraint::computed(f));
        self
    }

    fn resolve(&self, record: &Record) -> Descriptor {
        Descriptor {
            kind: Some(self.kind),
            is_array: resolve(&self.array, record).unwrap_or(false),
            is_identifier: false,
            nullable: resolve(&self.nullable, record),
            default: resolve(&self.default, record),
            min: resolve(&self.min, record),
            max: resolve(&self.max, record),
            min_length: resolve(&self.min_length, record),
            max_length: resolve(&self.max_length, record),
            min_size: resolve(&self.min_size, record),
            max_size: resolve(&self.max_size, record),
            precision: resolve(&self.precision, record),
            length: resolve(&self.length, record),
            enum_values: resolve(&self.enum_values, record),
            pattern: resolve(&self.pattern, record),
            trim: resolve(&self.trim, record).unwrap_or(false),
            lowercase: resolve(&self.lowercase, record).unwrap_or(false),
            uppercase: resolve(&self.uppercase, record).unwrap_or(false),
            on_update: resolve(&self.on_update, record),
        }
    }
}

/// One schema entry as written by the application.
#[derive(Debug, Clone)]
pub enum Declaration {
    /// Bare type, no constraints.
    Type(AttrType),
    /// Type plus constraints.
    Def(AttributeDef),
    /// Multi-valued attribute of the inner declaration.
    Array(Box<Declaration>),
}

impl Declaration {
    pub fn array_of(inner: impl Into<Declaration>) -> Self {
        Declaration::Array(Box::new(inner.into()))
    }

    fn resolve(&self, record: &Record) -> Descriptor {
        match self {
            Declaration::Type(kind) => Descriptor::of(*kind),
            Declaration::Def(def) => def.resolve(record),
            Declaration::Array(inner) => {
                let mut descriptor = inner.resolve(record);
                descriptor.is_array = true;
                descriptor
            }
        }
    }
}

impl From<AttrType> for Declaration {
    fn from(kind: AttrType) -> Self {
        Declaration::Type(kind)
    }
}

impl From<AttributeDef> for Declaration {
    fn from(def: AttributeDef) -> Self {
        Declaration::Def(def)
    }
}

/// Canonical, resolved metadata for one attribute.
///
/// `kind == None` is the empty descriptor: no schema enforcement, generic codec.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    pub kind: Option<AttrType>,
    pub is_array: bool,
    pub is_identifier: bool,
    pub nullable: Option<bool>,
    pub default: Option<Value>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
    pub min_size: Option<i64>,
    pub max_size: Option<i64>,
    pub precision: Option<u32>,
    pub length: Option<u32>,
    pub enum_values: Option<Vec<Value>>,
    pub pattern: Option<Regex>,
    pub trim: bool,
    pub lowercase: bool,
    pub uppercase: bool,
    pub on_update: Option<Value>,
}

impl Descriptor {
    /// The empty descriptor.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Descriptor for a bare type.
    pub fn of(kind: AttrType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Whether this is the empty descriptor.
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
    }

    /// Minimum as a number, if it is one.
    pub fn min_number(&self) -> Option<f64> {
        self.min.as_ref().and_then(Value::as_f64).filter(|n| !n.is_nan())
    }

    /// Maximum as a number, if it is one.
    pub fn max_number(&self) -> Option<f64> {
        self.max.as_ref().and_then(Value::as_f64).filter(|n| !n.is_nan())
    }
}

/// Attribute declarations for one record type.
#[derive(Debug, Clone)]
pub struct Schema {
    attributes: BTreeMap<String, Declaration>,
    identifier: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// Create an empty schema whose identifier attribute is `id`.
    pub fn new() -> Self {
        Self {
            attributes: BTreeMap::new(),
            identifier: DEFAULT_IDENTIFIER.to_string(),
        }
    }

    /// Add an attribute declaration.
    pub fn add_attribute(
        &mut self,
        name: impl Into<String>,
        declaration: impl Into<Declaration>,
    ) -> &mut Self {
        self.attributes.insert(name.into(), declaration.into());
        self
    }

    /// Builder-style method to add an attribute.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        declaration: impl Into<Declaration>,
    ) -> Self {
        self.add_attribute(name, declaration);
        self
    }

    /// Use a different attribute as the record's identifier.
    pub fn with_identifier(mut self, name: impl Into<String>) -> Self {
        self.identifier = name.into();
        self
    }

    /// Name of the identifier attribute.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Whether `name` is declared (the identifier always is).
    pub fn contains(&self, name: &str) -> bool {
        name == self.identifier || self.attributes.contains_key(name)
    }

    /// Declared attribute names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.attributes.get(name)
    }

    /// Resolve the descriptor for `name` against `record`.
    ///
    /// Unknown names yield the empty descriptor. The identifier always resolves
    /// to a scalar string.
    pub fn resolve(&self, name: &str, record: &Record) -> Descriptor {
        let declared = self.attributes.get(name).map(|d| d.resolve(record));
        if name == self.identifier {
            let mut descriptor = declared.unwrap_or_default();
            descriptor.kind = Some(AttrType::String);
            descriptor.is_array = false;
            descriptor.is_identifier = true;
            return descriptor;
        }
        declared.unwrap_or_default()
    }

    /// Resolved `default` values for every attribute that declares one.
    pub fn defaults(&self, record: &Record) -> BTreeMap<String, Value> {
        self.names()
            .filter_map(|name| {
                self.resolve(name, record)
                    .default
                    .map(|value| (name.to_string(), value))
            })
            .collect()
    }

    /// Resolved `on_update` values for every attribute that declares one.
    pub fn on_update_values(&self, record: &Record) -> BTreeMap<String, Value> {
        self.names()
            .filter(|name| *name != self.identifier)
            .filter_map(|name| {
                self.resolve(name, record)
                    .on_update
                    .map(|value| (name.to_string(), value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_schema() -> Schema {
        Schema::new()
            .with_attribute("firstName", AttrType::String)
            .with_attribute("middleInitial", AttributeDef::string().max_length(1))
            .with_attribute("age", AttributeDef::number().min(18).length(3))
            .with_attribute("favoriteColors", Declaration::array_of(AttrType::String))
            .with_attribute(
                "tags",
                Declaration::array_of(AttributeDef::string().lowercase()),
            )
            .with_attribute("scores", AttributeDef::number().array())
    }

    #[test]
    fn resolve_bare_type() {
        let schema = test_schema();
        let descriptor = schema.resolve("firstName", &Record::new());
        assert_eq!(descriptor.kind, Some(AttrType::String));
        assert!(!descriptor.is_array);
        assert!(!descriptor.is_identifier);
    }

    #[test]
    fn resolve_object_form() {
        let schema = test_schema();
        let descriptor = schema.resolve("age", &Record::new());
        assert_eq!(descriptor.kind, Some(AttrType::Number));
        assert_eq!(descriptor.min_number(), Some(18.0));
        assert_eq!(descriptor.length, Some(3));
        assert_eq!(descriptor.precision, None);
    }

    #[test]
    fn resolve_array_forms() {
        let schema = test_schema();
        let record = Record::new();

        let colors = schema.resolve("favoriteColors", &record);
        assert!(colors.is_array);
        assert_eq!(colors.kind, Some(AttrType::String));

        let tags = schema.resolve("tags", &record);
        assert!(tags.is_array);
        assert!(tags.lowercase);

        assert!(schema.resolve("scores", &record).is_array);
    }

    #[test]
    fn unknown_name_is_empty() {
        let schema = test_schema();
        let descriptor = schema.resolve("nickname", &Record::new());
        assert!(descriptor.is_empty());
        assert!(!descriptor.is_array);
    }

    #[test]
    fn identifier_is_scalar_string() {
        let schema = Schema::new().with_attribute("id", AttributeDef::number().array());
        let descriptor = schema.resolve("id", &Record::new());
        assert_eq!(descriptor.kind, Some(AttrType::String));
        assert!(!descriptor.is_array);
        assert!(descriptor.is_identifier);

        let undeclared = Schema::new().with_identifier("key");
        assert!(undeclared.resolve("key", &Record::new()).is_identifier);
        assert!(undeclared.contains("key"));
        assert!(!undeclared.resolve("id", &Record::new()).is_identifier);
    }

    #[test]
    fn computed_constraint_sees_record() {
        let schema = Schema::new().with_attribute(
            "endYear",
            AttributeDef::number().min_with(|record| {
                record.get("startYear").and_then(Value::as_f64).map(Value::Number)
            }),
        );

        let mut record = Record::new();
        assert_eq!(schema.resolve("endYear", &record).min, None);

        record.insert("startYear", 1999);
        assert_eq!(schema.resolve("endYear", &record).min_number(), Some(1999.0));

        record.insert("startYear", 2005);
        assert_eq!(schema.resolve("endYear", &record).min_number(), Some(2005.0));
    }

    #[test]
    fn defaults_and_on_update() {
        let schema = Schema::new()
            .with_attribute("status", AttributeDef::string().default_value("active"))
            .with_attribute("revision", AttributeDef::number().on_update(1))
            .with_attribute("name", AttrType::String);

        let defaults = schema.defaults(&Record::new());
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults["status"], Value::from("active"));

        let updates = schema.on_update_values(&Record::new());
        assert_eq!(updates.len(), 1);
        assert_eq!(updates["revision"], Value::Number(1.0));
    }

    #[test]
    fn attr_type_display() {
        assert_eq!(AttrType::String.to_string(), "String");
        assert_eq!(AttrType::Number.to_string(), "Number");
        assert_eq!(AttrType::Object.to_string(), "Object");
    }
}
