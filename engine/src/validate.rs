//! Attribute validation.
//!
//! Validation is the single point where a record can be rejected before it
//! is persisted. Every violation is reported, in attribute order, so a client
//! can show all problems at once.

use crate::schema::{AttrType, Descriptor};
use crate::{Record, Schema, Value};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Largest number of values an array attribute may hold.
pub const MAX_ARRAY_SIZE: i64 = 256;

/// Largest string length accepted by the store.
pub const MAX_STRING_LENGTH: i64 = 1024;

/// Upper bound for numbers without a declared `max`.
pub const DEFAULT_MAX_NUMBER: f64 = 9_999_999_999.0;

/// Why an attribute value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationCode {
    CannotBeNull,
    MustBeArray,
    SizeOutOfRange,
    ValueNotInEnum,
    IncorrectType,
    LengthOutOfRange,
    DoesNotMatchRegExp,
    OutOfRange,
    InvalidType,
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One rejected attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub attribute_name: String,
    pub code: ViolationCode,
    /// The offending element, for array attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_value: Option<Value>,
}

impl Violation {
    pub fn new(attribute_name: impl Into<String>, code: ViolationCode) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            code,
            error_value: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.error_value = Some(value);
        self
    }
}

/// The full list of violations for one record. Never partial.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub errors: Vec<Violation>,
}

impl ValidationError {
    /// Code reported to clients alongside the violation list.
    pub const CODE: &'static str = "ValidationError";

    pub fn new(errors: Vec<Violation>) -> Self {
        Self { errors }
    }

    /// Violations for one attribute.
    pub fn for_attribute<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.errors.iter().filter(move |v| v.attribute_name == name)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: ")?;
        for (i, violation) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", violation.attribute_name, violation.code)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationError", 2)?;
        state.serialize_field("code", Self::CODE)?;
        state.serialize_field("errors", &self.errors)?;
        state.end()
    }
}

/// Validate every present attribute of `record` against `schema`.
///
/// Returns `None` when nothing is wrong. Attributes without a descriptor are
/// not checked.
pub fn validate(record: &Record, schema: &Schema) -> Option<ValidationError> {
    let mut errors = Vec::new();
    for (name, value) in record.attributes() {
        let descriptor = schema.resolve(name, record);
        validate_attribute(name, value, &descriptor, &mut errors);
    }
    if errors.is_empty() {
        None
    } else {
        Some(ValidationError::new(errors))
    }
}

fn validate_attribute(
    name: &str,
    value: &Value,
    descriptor: &Descriptor,
    errors: &mut Vec<Violation>,
) {
    if descriptor.is_empty() {
        return;
    }

    if value.is_null() {
        if descriptor.nullable == Some(false) {
            errors.push(Violation::new(name, ViolationCode::CannotBeNull));
        }
        return;
    }

    if !descriptor.is_array {
        if let Some(code) = check_value(value, descriptor) {
            errors.push(Violation::new(name, code));
        }
        return;
    }

    let Value::Array(items) = value else {
        errors.push(Violation::new(name, ViolationCode::MustBeArray));
        return;
    };

    let min = descriptor.min_size.unwrap_or(0).max(0);
    // A declared maxSize of 0 means no declared limit.
    let max = descriptor
        .max_size
        .filter(|&max| max != 0)
        .unwrap_or(MAX_ARRAY_SIZE)
        .min(MAX_ARRAY_SIZE);
    let size = items.len() as i64;
    if size < min || size > max {
        errors.push(Violation::new(name, ViolationCode::SizeOutOfRange));
        return;
    }

    for item in items {
        if let Some(code) = check_value(item, descriptor) {
            errors.push(Violation::new(name, code).with_value(item.clone()));
        }
    }
}

/// Scalar rules. Array elements come through here one at a time.
fn check_value(value: &Value, descriptor: &Descriptor) -> Option<ViolationCode> {
    if value.is_null() {
        return (descriptor.nullable == Some(false)).then_some(ViolationCode::CannotBeNull);
    }

    if let Some(allowed) = &descriptor.enum_values {
        if !allowed.contains(value) {
            return Some(ViolationCode::ValueNotInEnum);
        }
    }

    match descriptor.kind {
        Some(AttrType::String) => check_string(value, descriptor),
        Some(AttrType::Number) => check_number(value, descriptor),
        Some(AttrType::Boolean) => match value {
            Value::Bool(_) => None,
            _ => Some(ViolationCode::IncorrectType),
        },
        Some(AttrType::Date) => check_date(value, descriptor),
        Some(AttrType::Object) | None => Some(ViolationCode::InvalidType),
    }
}

fn check_string(value: &Value, descriptor: &Descriptor) -> Option<ViolationCode> {
    let Value::String(text) = value else {
        return Some(ViolationCode::IncorrectType);
    };

    let min = descriptor.min_length.unwrap_or(0).max(0);
    let max = descriptor
        .max_length
        .unwrap_or(MAX_STRING_LENGTH)
        .min(MAX_STRING_LENGTH);
    // Lengths are counted in UTF-16 code units, as browsers count them.
    let length = text.encode_utf16().count() as i64;
    if length < min || length > max {
        return Some(ViolationCode::LengthOutOfRange);
    }

    match &descriptor.pattern {
        Some(pattern) if !pattern.is_match(text) => Some(ViolationCode::DoesNotMatchRegExp),
        _ => None,
    }
}

fn check_number(value: &Value, descriptor: &Descriptor) -> Option<ViolationCode> {
    let n = match value {
        Value::Number(n) if !n.is_nan() => *n,
        _ => return Some(ViolationCode::IncorrectType),
    };
    let min = descriptor.min_number().unwrap_or(0.0);
    let max = descriptor.max_number().unwrap_or(DEFAULT_MAX_NUMBER);
    (n < min || n > max).then_some(ViolationCode::OutOfRange)
}

fn check_date(value: &Value, descriptor: &Descriptor) -> Option<ViolationCode> {
    let Value::Date(date) = value else {
        return Some(ViolationCode::IncorrectType);
    };
    let below = matches!(&descriptor.min, Some(Value::Date(min)) if date < min);
    let above = matches!(&descriptor.max, Some(Value::Date(max)) if date > max);
    (below || above).then_some(ViolationCode::OutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttributeDef, Declaration};
    use chrono::{TimeZone, Utc};
    use regex::Regex;
    use serde_json::json;

    fn test_schema() -> Schema {
        Schema::new()
            .with_attribute("name", AttributeDef::string().min_length(2).max_length(8))
            .with_attribute("initial", AttributeDef::string().max_length(1).nullable(false))
            .with_attribute("age", AttributeDef::number().min(18).max(99))
            .with_attribute("score", AttrType::Number)
            .with_attribute("active", AttrType::Boolean)
            .with_attribute(
                "born",
                AttributeDef::date().min(Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap()),
            )
            .with_attribute(
                "code",
                AttributeDef::string().matches(Regex::new("^[A-Z]{3}$").unwrap()),
            )
            .with_attribute("size", AttributeDef::string().one_of(vec!["S", "M", "L"]))
            .with_attribute(
                "colors",
                Declaration::array_of(AttributeDef::string().max_size(3).nullable(false)),
            )
            .with_attribute("meta", AttrType::Object)
    }

    fn codes(error: &ValidationError) -> Vec<(&str, ViolationCode)> {
        error
            .errors
            .iter()
            .map(|v| (v.attribute_name.as_str(), v.code))
            .collect()
    }

    #[test]
    fn valid_record_passes() {
        let schema = test_schema();
        let mut record = Record::new();
        record.insert("name", "Alice");
        record.insert("age", 30);
        record.insert("active", true);
        record.insert("code", "ABC");
        record.insert("size", "M");
        record.insert("colors", vec!["red", "blue"]);
        record.insert("nickname", 12);
        record.insert("score", Value::Null);

        assert_eq!(validate(&record, &schema), None);
    }

    #[test]
    fn nullable_defaults_to_true() {
        let schema = test_schema();
        let mut record = Record::new();
        record.insert("name", Value::Null);
        assert_eq!(validate(&record, &schema), None);

        record.insert("initial", Value::Null);
        let error = validate(&record, &schema).unwrap();
        assert_eq!(codes(&error), vec![("initial", ViolationCode::CannotBeNull)]);
    }

    #[test]
    fn string_rules() {
        let schema = test_schema();
        let mut record = Record::new();
        record.insert("name", "A");
        record.insert("code", "abc");
        record.insert("initial", 5);
        record.insert("size", "XL");

        let error = validate(&record, &schema).unwrap();
        assert_eq!(
            codes(&error),
            vec![
                ("code", ViolationCode::DoesNotMatchRegExp),
                ("initial", ViolationCode::IncorrectType),
                ("name", ViolationCode::LengthOutOfRange),
                ("size", ViolationCode::ValueNotInEnum),
            ]
        );
    }

    #[test]
    fn number_rules() {
        let schema = test_schema();
        let mut record = Record::new();
        record.insert("age", 17);
        record.insert("score", -1);
        let error = validate(&record, &schema).unwrap();
        assert_eq!(
            codes(&error),
            vec![
                ("age", ViolationCode::OutOfRange),
                ("score", ViolationCode::OutOfRange),
            ]
        );

        let mut record = Record::new();
        record.insert("age", f64::NAN);
        record.insert("score", "12");
        let error = validate(&record, &schema).unwrap();
        assert_eq!(
            codes(&error),
            vec![
                ("age", ViolationCode::IncorrectType),
                ("score", ViolationCode::IncorrectType),
            ]
        );

        let mut record = Record::new();
        record.insert("score", 9_999_999_999.0);
        assert_eq!(validate(&record, &schema), None);
        record.insert("score", 10_000_000_000.0);
        assert!(validate(&record, &schema).is_some());
    }

    #[test]
    fn boolean_and_date_rules() {
        let schema = test_schema();
        let mut record = Record::new();
        record.insert("active", "true");
        record.insert("born", Utc.with_ymd_and_hms(1850, 6, 1, 0, 0, 0).unwrap());
        let error = validate(&record, &schema).unwrap();
        assert_eq!(
            codes(&error),
            vec![
                ("active", ViolationCode::IncorrectType),
                ("born", ViolationCode::OutOfRange),
            ]
        );

        let mut record = Record::new();
        record.insert("born", "1980-01-01");
        let error = validate(&record, &schema).unwrap();
        assert_eq!(codes(&error), vec![("born", ViolationCode::IncorrectType)]);
    }

    #[test]
    fn undeclared_type_is_invalid() {
        let schema = test_schema();
        let mut record = Record::new();
        record.insert("meta", Value::from_json(json!({"a": 1})));
        let error = validate(&record, &schema).unwrap();
        assert_eq!(codes(&error), vec![("meta", ViolationCode::InvalidType)]);
    }

    #[test]
    fn array_rules() {
        let schema = test_schema();

        let mut record = Record::new();
        record.insert("colors", "red");
        let error = validate(&record, &schema).unwrap();
        assert_eq!(codes(&error), vec![("colors", ViolationCode::MustBeArray)]);

        let mut record = Record::new();
        record.insert("colors", vec!["a", "b", "c", "d"]);
        let error = validate(&record, &schema).unwrap();
        assert_eq!(codes(&error), vec![("colors", ViolationCode::SizeOutOfRange)]);

        let mut record = Record::new();
        record.insert(
            "colors",
            Value::Array(vec!["red".into(), Value::Null, Value::Number(3.0)]),
        );
        let error = validate(&record, &schema).unwrap();
        assert_eq!(
            codes(&error),
            vec![
                ("colors", ViolationCode::CannotBeNull),
                ("colors", ViolationCode::IncorrectType),
            ]
        );
        assert_eq!(error.errors[0].error_value, Some(Value::Null));
        assert_eq!(error.errors[1].error_value, Some(Value::Number(3.0)));
    }

    #[test]
    fn zero_max_size_falls_back_to_default() {
        let schema = Schema::new().with_attribute(
            "tags",
            Declaration::array_of(AttributeDef::string().max_size(0)),
        );
        let mut record = Record::new();
        record.insert("tags", vec!["a", "b"]);
        assert_eq!(validate(&record, &schema), None);

        let too_many: Vec<String> = (0..257).map(|i| i.to_string()).collect();
        record.insert("tags", too_many);
        let error = validate(&record, &schema).unwrap();
        assert_eq!(codes(&error), vec![("tags", ViolationCode::SizeOutOfRange)]);
    }

    #[test]
    fn string_length_counts_utf16_units() {
        let schema = test_schema();
        let mut record = Record::new();
        // four astral chars are eight code units
        record.insert("name", "🎉🚀💯🎈");
        assert_eq!(validate(&record, &schema), None);

        record.insert("name", "🎉🚀💯🎈🎁");
        let error = validate(&record, &schema).unwrap();
        assert_eq!(codes(&error), vec![("name", ViolationCode::LengthOutOfRange)]);
    }

    #[test]
    fn null_array_respects_nullable() {
        let schema = test_schema();
        let mut record = Record::new();
        record.insert("colors", Value::Null);
        let error = validate(&record, &schema).unwrap();
        assert_eq!(codes(&error), vec![("colors", ViolationCode::CannotBeNull)]);
    }

    #[test]
    fn all_violations_reported() {
        let schema = test_schema();
        let mut record = Record::new();
        record.insert("name", "");
        record.insert("age", 5);
        record.insert("active", 1);
        record.insert("code", "x");
        record.insert("colors", Value::Array(vec![Value::Null, Value::Null]));

        let error = validate(&record, &schema).unwrap();
        assert_eq!(error.errors.len(), 6);
        assert_eq!(error.for_attribute("colors").count(), 2);
    }

    #[test]
    fn computed_max_is_evaluated_per_record() {
        let schema = Schema::new()
            .with_attribute("limit", AttrType::Number)
            .with_attribute(
                "used",
                AttributeDef::number().max_with(|record| record.get("limit").cloned()),
            );

        let mut record = Record::new();
        record.insert("limit", 10);
        record.insert("used", 11);
        assert!(validate(&record, &schema).is_some());

        record.insert("limit", 20);
        assert_eq!(validate(&record, &schema), None);
    }

    #[test]
    fn error_serialization() {
        let error = ValidationError::new(vec![
            Violation::new("age", ViolationCode::OutOfRange),
            Violation::new("colors", ViolationCode::IncorrectType).with_value(Value::Number(3.0)),
        ]);
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({
                "code": "ValidationError",
                "errors": [
                    {"attributeName": "age", "code": "OutOfRange"},
                    {"attributeName": "colors", "code": "IncorrectType", "errorValue": 3}
                ]
            })
        );
    }
}
