//! Record types.
//!
//! A [`Record`] is one item: an optional identifier (the store's item name),
//! its typed attributes, and the names unset since it was last persisted. A
//! [`RecordSet`] is the result of a multi-record query. Both rely on the
//! stateless [`Schema`] for typing rather than carrying one.

use crate::codec::coerce;
use crate::{error::Result, Error, ItemName, Schema, Value};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

/// Key carrying unset attribute names in the wire JSON.
pub const UNSET_NAMES_KEY: &str = "_unsetAttributeNames";

/// Key carrying the continuation token in collection wire JSON.
pub const NEXT_TOKEN_KEY: &str = "_nextToken";

/// A structured record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    id: Option<ItemName>,
    attributes: BTreeMap<String, Value>,
    unset: BTreeSet<String>,
}

impl Record {
    /// Create a new record with no identifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record for an existing item.
    pub fn with_id(id: impl Into<ItemName>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Build a record from already decoded attributes.
    pub fn from_attributes(id: impl Into<ItemName>, attributes: BTreeMap<String, Value>) -> Self {
        Self {
            id: Some(id.into()),
            attributes,
            unset: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<ItemName>) {
        self.id = Some(id.into());
    }

    /// Remove and return the identifier, leaving the record new.
    pub fn take_id(&mut self) -> Option<ItemName> {
        self.id.take()
    }

    /// A record is new until it has been given an identifier.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Insert a value as is, without schema coercion.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Set an attribute, coercing string input to the declared type.
    ///
    /// Array attributes are coerced element-wise and de-duplicated, since the
    /// store cannot hold the same name/value pair twice. Setting the
    /// identifier attribute sets the record's identifier.
    pub fn set(&mut self, name: &str, value: impl Into<Value>, schema: &Schema) {
        let value = value.into();
        if name == schema.identifier() {
            self.id = match value {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_json().to_string()),
            };
            return;
        }

        let descriptor = schema.resolve(name, self);
        let value = match value {
            Value::Array(items) if descriptor.is_array => {
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    let item = coerce(item, &descriptor);
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Value::Array(unique)
            }
            Value::Array(items) => Value::Array(items),
            other => coerce(other, &descriptor),
        };
        self.attributes.insert(name.to_string(), value);
    }

    /// Remove an attribute and remember that it must be deleted from the store
    /// on the next save.
    pub fn unset(&mut self, name: &str, schema: &Schema) -> Result<()> {
        if name == schema.identifier() {
            return Err(Error::IdentifierUnset(name.to_string()));
        }
        self.attributes.remove(name);
        self.unset.insert(name.to_string());
        Ok(())
    }

    /// Names unset since the last persist that still have no value.
    ///
    /// Empty for new records: there is nothing stored to delete.
    pub fn pending_unsets(&self) -> Vec<String> {
        if self.is_new() {
            return Vec::new();
        }
        self.unset
            .iter()
            .filter(|name| !self.attributes.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Forget unset tracking after a successful persist.
    pub fn mark_persisted(&mut self) {
        self.unset.clear();
    }

    /// Fill in declared defaults for attributes that have no value.
    pub fn with_defaults(mut self, schema: &Schema) -> Self {
        for (name, value) in schema.defaults(&self) {
            self.attributes.entry(name).or_insert(value);
        }
        self
    }

    /// Parse wire JSON: either `{"model": {...}, "_unsetAttributeNames": [...]}`
    /// or a bare attribute object. Values go through [`Record::set`].
    pub fn from_json(json: &serde_json::Value, schema: &Schema) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::InvalidPayload("payload must be an object".into()))?;

        let (model, unset) = match object.get("model") {
            Some(model) => (
                model
                    .as_object()
                    .ok_or_else(|| Error::InvalidPayload("model must be an object".into()))?,
                object.get(UNSET_NAMES_KEY),
            ),
            None => (object, None),
        };

        let mut record = Record::new();
        for (name, value) in model {
            record.set(name, Value::from_json(value.clone()), schema);
        }
        if let Some(names) = unset.and_then(|u| u.as_array()) {
            for name in names.iter().filter_map(|n| n.as_str()) {
                if !record.contains(name) {
                    record.unset(name, schema)?;
                }
            }
        }
        Ok(record)
    }

    /// Render wire JSON: `{"model": {...}}`, plus pending unset names when
    /// requested.
    pub fn to_json(&self, schema: &Schema, options: &JsonOptions) -> serde_json::Value {
        let mut model = serde_json::Map::new();
        if let Some(id) = &self.id {
            if options.keeps(schema.identifier()) {
                model.insert(schema.identifier().to_string(), json!(id));
            }
        }
        for (name, value) in &self.attributes {
            if options.keeps(name) {
                model.insert(name.clone(), value.to_json());
            }
        }

        let mut wire = json!({ "model": model });
        if options.include_unset {
            let pending = self.pending_unsets();
            if !pending.is_empty() {
                wire[UNSET_NAMES_KEY] = json!(pending);
            }
        }
        wire
    }
}

/// Attribute filters for [`Record::to_json`]. `exclude` wins over `include`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_unset: bool,
}

impl JsonOptions {
    fn keeps(&self, name: &str) -> bool {
        if !self.exclude.is_empty() {
            return !self.exclude.iter().any(|n| n == name);
        }
        self.include.is_empty() || self.include.iter().any(|n| n == name)
    }
}

/// Records returned by a multi-record query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub records: Vec<Record>,
    /// Opaque token for the next page, if any.
    pub next_token: Option<String>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id() == Some(id))
    }

    /// Render wire JSON: `{"collection": [{"model": ...}], "_nextToken": ...}`.
    pub fn to_json(&self, schema: &Schema) -> serde_json::Value {
        let options = JsonOptions::default();
        let collection: Vec<_> = self
            .records
            .iter()
            .map(|r| r.to_json(schema, &options))
            .collect();
        let mut wire = json!({ "collection": collection });
        if let Some(token) = &self.next_token {
            wire[NEXT_TOKEN_KEY] = json!(token);
        }
        wire
    }
}
