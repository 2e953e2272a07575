//! Projection between records and the store's flat attribute list.
//!
//! The store holds an unordered list of `(name, value)` string pairs per item
//! and may repeat a name. Array attributes become one pair per element, with
//! sentinels for the shapes a list of pairs cannot express: an empty array
//! and an array holding a single `null`.

use crate::codec::{decode, encode, NULL_SENTINEL};
use crate::{Record, Schema, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire value of an empty array.
pub const EMPTY_ARRAY: &str = "[]";

/// Wire value of `[null]`.
pub const NULL_ARRAY: &str = "[null]";

/// One stored name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlatAttribute {
    pub name: String,
    pub value: String,
}

impl FlatAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A pair to write. `replace` drops every stored value under the name first;
/// otherwise the value is added next to the existing ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutAttribute {
    pub name: String,
    pub value: String,
    pub replace: bool,
}

/// Flatten every present attribute of `record` into store pairs.
///
/// The identifier is never emitted; it travels as the item name.
pub fn flatten(record: &Record, schema: &Schema) -> Vec<FlatAttribute> {
    let mut pairs = Vec::new();
    for (name, value) in record.attributes() {
        if name == schema.identifier() {
            continue;
        }
        let descriptor = schema.resolve(name, record);
        match value {
            Value::Array(items) if descriptor.is_array => {
                if items.is_empty() {
                    pairs.push(FlatAttribute::new(name, EMPTY_ARRAY));
                } else if items.len() == 1 && items[0].is_null() {
                    pairs.push(FlatAttribute::new(name, NULL_ARRAY));
                } else {
                    let mut seen: Vec<String> = Vec::with_capacity(items.len());
                    for item in items {
                        let encoded = encode(item, &descriptor);
                        if !seen.contains(&encoded) {
                            seen.push(encoded);
                        }
                    }
                    // [null, null] dedups to a lone null element
                    if seen.len() == 1 && seen[0] == NULL_SENTINEL {
                        pairs.push(FlatAttribute::new(name, NULL_ARRAY));
                    } else {
                        pairs.extend(seen.into_iter().map(|v| FlatAttribute::new(name, v)));
                    }
                }
            }
            _ => pairs.push(FlatAttribute::new(name, encode(value, &descriptor))),
        }
    }
    pairs
}

/// Flatten `record` into put instructions: the first pair under each name
/// replaces what is stored, the rest are added.
pub fn put_attributes(record: &Record, schema: &Schema) -> Vec<PutAttribute> {
    let mut previous: Option<String> = None;
    flatten(record, schema)
        .into_iter()
        .map(|pair| {
            let replace = previous.as_deref() != Some(pair.name.as_str());
            previous = Some(pair.name.clone());
            PutAttribute {
                name: pair.name,
                value: pair.value,
                replace,
            }
        })
        .collect()
}

/// Rebuild typed attributes from store pairs.
///
/// `context` is the record descriptors are resolved against, usually one
/// holding just the item name. Pairs named after the identifier are ignored.
pub fn unflatten(
    pairs: &[FlatAttribute],
    schema: &Schema,
    context: &Record,
) -> BTreeMap<String, Value> {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for pair in pairs {
        if pair.name == schema.identifier() {
            continue;
        }
        grouped
            .entry(pair.name.as_str())
            .or_default()
            .push(pair.value.as_str());
    }

    grouped
        .into_iter()
        .map(|(name, raws)| {
            let descriptor = schema.resolve(name, context);
            let value = if descriptor.is_array {
                unflatten_array(&raws, |raw| decode(raw, &descriptor))
            } else {
                raws.last()
                    .map(|raw| decode(raw, &descriptor))
                    .unwrap_or_default()
            };
            (name.to_string(), value)
        })
        .collect()
}

fn unflatten_array(raws: &[&str], decode: impl Fn(&str) -> Value) -> Value {
    if raws.contains(&EMPTY_ARRAY) {
        return Value::Array(Vec::new());
    }
    if raws == [NULL_ARRAY] {
        return Value::Array(vec![Value::Null]);
    }

    // A lone null pair is a null array; a null followed by values is an
    // array whose first element is null. A `[null]` sentinel mixed in with
    // other values stands for a null element.
    let mut current: Option<Value> = None;
    for raw in raws {
        let decoded = if *raw == NULL_ARRAY {
            Value::Null
        } else {
            decode(raw)
        };
        current = Some(match current {
            None if decoded.is_null() => Value::Null,
            None => Value::Array(vec![decoded]),
            Some(Value::Array(mut items)) => {
                items.push(decoded);
                Value::Array(items)
            }
            Some(_) => Value::Array(vec![Value::Null, decoded]),
        });
    }
    current.unwrap_or_default()
}

impl Record {
    /// Build a record for `id` from its stored pairs.
    pub fn from_pairs(id: impl Into<String>, pairs: &[FlatAttribute], schema: &Schema) -> Self {
        let context = Record::with_id(id);
        let attributes = unflatten(pairs, schema, &context);
        let mut record = context;
        for (name, value) in attributes {
            record.insert(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttrType, AttributeDef, Declaration};
    use chrono::{TimeZone, Utc};

    fn clients_schema() -> Schema {
        Schema::new()
            .with_attribute("firstName", AttrType::String)
            .with_attribute("lastName", AttrType::String)
            .with_attribute("middleInitial", AttributeDef::string().max_length(1))
            .with_attribute("favoriteColors", Declaration::array_of(AttrType::String))
            .with_attribute("age", AttributeDef::number().min(18).length(3))
            .with_attribute("joined", AttrType::Date)
    }

    fn colors(value: Value) -> Record {
        let mut record = Record::with_id("client-1");
        record.insert("favoriteColors", value);
        record
    }

    fn values(pairs: &[FlatAttribute]) -> Vec<&str> {
        pairs.iter().map(|p| p.value.as_str()).collect()
    }

    #[test]
    fn flatten_scalars() {
        let schema = clients_schema();
        let mut record = Record::with_id("client-1");
        record.insert("firstName", "Kristina");
        record.insert("age", 25);
        record.insert("joined", Utc.with_ymd_and_hms(2012, 3, 4, 5, 6, 7).unwrap());
        record.insert("middleInitial", Value::Null);

        let pairs = flatten(&record, &schema);
        assert_eq!(
            pairs,
            vec![
                FlatAttribute::new("age", "043"),
                FlatAttribute::new("firstName", "Kristina"),
                FlatAttribute::new("joined", "2012-03-04T05:06:07.000Z"),
                FlatAttribute::new("middleInitial", "null"),
            ]
        );
    }

    #[test]
    fn flatten_array_sentinels() {
        let schema = clients_schema();

        let pairs = flatten(&colors(Value::Array(vec![])), &schema);
        assert_eq!(values(&pairs), vec!["[]"]);

        let pairs = flatten(&colors(Value::Array(vec![Value::Null])), &schema);
        assert_eq!(values(&pairs), vec!["[null]"]);

        let pairs = flatten(&colors(Value::Null), &schema);
        assert_eq!(values(&pairs), vec!["null"]);

        let pairs = flatten(&colors(Value::Array(vec![Value::Null, "purple".into()])), &schema);
        assert_eq!(values(&pairs), vec!["null", "purple"]);
    }

    #[test]
    fn flatten_removes_duplicate_elements() {
        let schema = clients_schema();
        let record = colors(Value::from(vec!["white", "brown", "purple", "brown"]));
        let pairs = flatten(&record, &schema);
        assert_eq!(values(&pairs), vec!["white", "brown", "purple"]);

        let record = colors(Value::Array(vec![Value::Null, Value::Null]));
        assert_eq!(values(&flatten(&record, &schema)), vec!["[null]"]);
    }

    #[test]
    fn flatten_skips_identifier_and_keeps_unknown() {
        let schema = clients_schema();
        let mut record = Record::with_id("client-1");
        record.insert("id", "client-1");
        record.insert("nickname", "KC");
        record.insert("visits", 3);

        let pairs = flatten(&record, &schema);
        assert_eq!(
            pairs,
            vec![
                FlatAttribute::new("nickname", "\"KC\""),
                FlatAttribute::new("visits", "3"),
            ]
        );
    }

    #[test]
    fn put_replaces_first_pair_per_name() {
        let schema = clients_schema();
        let mut record = colors(Value::from(vec!["red", "green"]));
        record.insert("firstName", "Karen");

        let puts = put_attributes(&record, &schema);
        let flags: Vec<_> = puts
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str(), p.replace))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("favoriteColors", "red", true),
                ("favoriteColors", "green", false),
                ("firstName", "Karen", true),
            ]
        );
    }

    #[test]
    fn unflatten_arrays() {
        let schema = clients_schema();
        let context = Record::with_id("client-1");
        let decode = |raws: &[&str]| {
            let pairs: Vec<_> = raws
                .iter()
                .map(|v| FlatAttribute::new("favoriteColors", *v))
                .collect();
            unflatten(&pairs, &schema, &context).remove("favoriteColors")
        };

        assert_eq!(decode(&["[]"]), Some(Value::Array(vec![])));
        assert_eq!(decode(&["[null]"]), Some(Value::Array(vec![Value::Null])));
        assert_eq!(decode(&["null"]), Some(Value::Null));
        assert_eq!(decode(&["blue"]), Some(Value::from(vec!["blue"])));
        assert_eq!(
            decode(&["null", "purple"]),
            Some(Value::Array(vec![Value::Null, "purple".into()]))
        );
        assert_eq!(
            decode(&["purple", "null"]),
            Some(Value::Array(vec!["purple".into(), Value::Null]))
        );
        assert_eq!(decode(&["red", "[]"]), Some(Value::Array(vec![])));
    }

    #[test]
    fn unflatten_null_sentinel_next_to_values() {
        let schema = clients_schema();
        let context = Record::with_id("client-1");
        let pairs = vec![
            FlatAttribute::new("favoriteColors", "red"),
            FlatAttribute::new("favoriteColors", "[null]"),
        ];
        let attributes = unflatten(&pairs, &schema, &context);
        assert_eq!(
            attributes["favoriteColors"],
            Value::Array(vec!["red".into(), Value::Null])
        );

        let pairs = vec![
            FlatAttribute::new("favoriteColors", "[null]"),
            FlatAttribute::new("favoriteColors", "blue"),
        ];
        let attributes = unflatten(&pairs, &schema, &context);
        assert_eq!(
            attributes["favoriteColors"],
            Value::Array(vec![Value::Null, "blue".into()])
        );
    }

    #[test]
    fn unflatten_scalars_and_unknown() {
        let schema = clients_schema();
        let pairs = vec![
            FlatAttribute::new("age", "043"),
            FlatAttribute::new("firstName", "Paige"),
            FlatAttribute::new("id", "ignored"),
            FlatAttribute::new("nickname", "\"PC\""),
            FlatAttribute::new("legacy", "plain text"),
            FlatAttribute::new("blank", ""),
        ];
        let attributes = unflatten(&pairs, &schema, &Record::new());
        assert_eq!(attributes.len(), 5);
        assert_eq!(attributes["age"], Value::Number(25.0));
        assert_eq!(attributes["firstName"], Value::from("Paige"));
        assert_eq!(attributes["nickname"], Value::from("PC"));
        assert_eq!(attributes["legacy"], Value::from("plain text"));
        assert_eq!(attributes["blank"], Value::from(""));
    }

    #[test]
    fn record_roundtrip() {
        let schema = clients_schema();
        let shapes = vec![
            Value::Null,
            Value::Array(vec![]),
            Value::Array(vec![Value::Null]),
            Value::Array(vec![Value::Null, "purple".into()]),
            Value::from(vec!["red", "green"]),
        ];
        for shape in shapes {
            let mut record = colors(shape);
            record.insert("firstName", "Sherri");
            record.insert("age", 40);

            let pairs = flatten(&record, &schema);
            let restored = Record::from_pairs("client-1", &pairs, &schema);
            assert_eq!(restored, record);
        }
    }
}
