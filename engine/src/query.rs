//! Query expression compiler.
//!
//! Turns a MongoDB-style JSON query tree into a SimpleDB-style `SELECT`.
//! Literals are encoded with the attribute's codec so comparisons run on the
//! stored, order-preserving strings.
//!
//! ```text
//! {"age": {"$between": [25, 35]}, "$or": [{"a": 1}, {"b": 2}]}
//!   -> (`a` = "1" OR `b` = "2") AND `age` BETWEEN "043" AND "053"
//! ```
//!
//! Malformed branches produce no predicate instead of an error; an empty
//! WHERE clause matches everything.

use crate::codec::{coerce, encode, NULL_SENTINEL};
use crate::schema::Descriptor;
use crate::{Record, Schema, Value};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

/// Comparison operators and their SELECT spelling.
const OPERATORS: &[(&str, &str)] = &[
    ("$eq", "="),
    ("$ne", "!="),
    ("$lt", "<"),
    ("$lte", "<="),
    ("$gt", ">"),
    ("$gte", ">="),
    ("$like", "LIKE"),
    ("$notlike", "NOT LIKE"),
];

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortOrder::Desc)
        } else {
            Err(format!("unknown sort order '{s}'"))
        }
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether a query fetches into a single record or a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Target {
    #[default]
    Collection,
    /// Forces `LIMIT 1`.
    Single,
}

/// Options accepted next to a query tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    pub order_by: Option<String>,
    pub order: Option<SortOrder>,
    pub limit: Option<u32>,
    /// Continuation token from a previous page. Not part of the expression.
    pub next_token: Option<String>,
    #[serde(skip)]
    pub target: Target,
    /// Compile `SELECT COUNT(*)` instead of `SELECT *`.
    #[serde(skip)]
    pub count: bool,
}

impl QueryOptions {
    pub fn single() -> Self {
        Self {
            target: Target::Single,
            ..Self::default()
        }
    }

    pub fn count() -> Self {
        Self {
            count: true,
            ..Self::default()
        }
    }
}

/// Compile a full `SELECT` statement against `domain`.
pub fn compile(domain: &str, tree: &JsonValue, schema: &Schema, options: &QueryOptions) -> String {
    let mut tree = match tree {
        JsonValue::Null => JsonValue::Object(Map::new()),
        other => other.clone(),
    };

    let mut sort = String::new();
    if let Some(order_by) = &options.order_by {
        // The sort attribute has to appear in the predicate.
        if let JsonValue::Object(map) = &mut tree {
            if !truthy(map.get(order_by)) {
                map.insert(order_by.clone(), json!({ "$isundefined": false }));
            }
        }
        sort = format!(" ORDER BY {}", quote_attribute(order_by, schema));
        if let Some(order) = options.order {
            sort.push(' ');
            sort.push_str(order.as_str());
        }
    }

    let mut select = if options.count {
        String::from("SELECT COUNT(*) FROM ")
    } else {
        String::from("SELECT * FROM ")
    };
    select.push_str(&quote_name(domain));

    let condition = where_clause(&tree, schema);
    if !condition.is_empty() {
        select.push_str(" WHERE ");
        select.push_str(&condition);
    }
    select.push_str(&sort);

    match (options.target, options.limit) {
        (Target::Single, _) => select.push_str(" LIMIT 1"),
        (Target::Collection, Some(limit)) if limit > 0 => {
            select.push_str(&format!(" LIMIT {limit}"));
        }
        _ => {}
    }
    select
}

/// Compile just the WHERE condition of `tree`. Empty when nothing constrains.
pub fn where_clause(tree: &JsonValue, schema: &Schema) -> String {
    Compiler::new(schema).tree(tree)
}

/// `"value"` with embedded quotes doubled.
pub fn quote_value(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// `` `name` `` with embedded backticks doubled.
pub fn quote_name(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Attribute reference: `itemName()` for the identifier, a quoted name
/// otherwise.
pub fn quote_attribute(name: &str, schema: &Schema) -> String {
    if name == schema.identifier() {
        "itemName()".to_string()
    } else {
        quote_name(name)
    }
}

fn truthy(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(JsonValue::String(s)) => !s.is_empty(),
        Some(JsonValue::Array(_)) | Some(JsonValue::Object(_)) => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    And,
    Or,
    Intersection,
    Not,
}

impl Combinator {
    fn parse(key: &str) -> Option<Self> {
        let name = key.strip_prefix('$')?;
        if name.eq_ignore_ascii_case("and") {
            Some(Combinator::And)
        } else if name.eq_ignore_ascii_case("or") {
            Some(Combinator::Or)
        } else if name.eq_ignore_ascii_case("intersection") {
            Some(Combinator::Intersection)
        } else if name.eq_ignore_ascii_case("not") {
            Some(Combinator::Not)
        } else {
            None
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
            // the store rejects the upper-cased spelling
            Combinator::Intersection => "intersection",
            Combinator::Not => "NOT",
        }
    }
}

struct Compiler<'a> {
    schema: &'a Schema,
    context: Record,
}

impl<'a> Compiler<'a> {
    fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            context: Record::new(),
        }
    }

    /// AND-joined condition for a whole tree, with the redundant outer
    /// parentheses of a lone combinator removed.
    fn tree(&self, tree: &JsonValue) -> String {
        let JsonValue::Object(map) = tree else {
            return String::new();
        };
        let clause = self.fragments(map).join(" AND ");

        let lone_combinator = map.len() == 1 && map.keys().all(|k| Combinator::parse(k).is_some());
        if lone_combinator && clause.starts_with('(') && clause.ends_with(')') && clause.len() >= 2 {
            return clause[1..clause.len() - 1].to_string();
        }
        clause
    }

    fn fragments(&self, map: &Map<String, JsonValue>) -> Vec<String> {
        map.iter()
            .filter_map(|(key, expression)| {
                if let Some(combinator) = Combinator::parse(key) {
                    self.combinator(combinator, expression)
                } else if key.starts_with('$') {
                    None
                } else {
                    self.expression(key, expression)
                }
            })
            .collect()
    }

    fn combinator(&self, combinator: Combinator, expression: &JsonValue) -> Option<String> {
        if combinator == Combinator::Not {
            let inner = self.tree(expression);
            return (!inner.is_empty()).then(|| format!("(NOT({inner}))"));
        }

        let JsonValue::Array(items) = expression else {
            return None;
        };
        let parts: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                JsonValue::Object(map) if !map.is_empty() => {
                    let mut fragments = self.fragments(map);
                    match fragments.len() {
                        0 => None,
                        1 => fragments.pop(),
                        _ => Some(format!("({})", fragments.join(" AND "))),
                    }
                }
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            return None;
        }
        let separator = format!(" {} ", combinator.keyword());
        Some(format!("({})", parts.join(&separator)))
    }

    fn expression(&self, name: &str, expression: &JsonValue) -> Option<String> {
        let descriptor = self.schema.resolve(name, &self.context);
        let quoted = quote_attribute(name, self.schema);

        if let JsonValue::Object(map) = expression {
            if map.len() > 1 {
                let parts: Vec<String> = map
                    .iter()
                    .filter_map(|(op, operand)| {
                        let mut single = Map::new();
                        single.insert(op.clone(), operand.clone());
                        self.expression(name, &JsonValue::Object(single))
                    })
                    .collect();
                return (!parts.is_empty()).then(|| format!("({})", parts.join(" AND ")));
            }
            if let Some(operand) = map.get("$every") {
                return self.single(&format!("EVERY({quoted})"), operand, &descriptor);
            }
            if let Some(operand) = map.get("$not") {
                return self.single(&format!("NOT {quoted}"), operand, &descriptor);
            }
        }
        self.single(&quoted, expression, &descriptor)
    }

    fn single(&self, quoted: &str, expression: &JsonValue, descriptor: &Descriptor) -> Option<String> {
        match expression {
            JsonValue::Object(map) => {
                let (key, operand) = map.iter().next()?;
                if let Some(operator) = operator(key) {
                    return self.comparison(quoted, operator, operand, descriptor);
                }
                match (key.as_str(), operand) {
                    ("$in", JsonValue::Array(values)) if !values.is_empty() => {
                        let list: Vec<String> =
                            values.iter().map(|v| self.literal(v, descriptor)).collect();
                        Some(format!("{quoted} IN ({})", list.join(",")))
                    }
                    ("$between", JsonValue::Array(bounds)) if bounds.len() >= 2 => Some(format!(
                        "{quoted} BETWEEN {} AND {}",
                        self.literal(&bounds[0], descriptor),
                        self.literal(&bounds[1], descriptor)
                    )),
                    ("$isnull", JsonValue::Bool(is_null)) => {
                        let operator = if *is_null { "=" } else { "!=" };
                        Some(format!("{quoted} {operator} {}", quote_value(NULL_SENTINEL)))
                    }
                    ("$isundefined", JsonValue::Bool(true)) => Some(format!("{quoted} IS NULL")),
                    ("$isundefined", JsonValue::Bool(false)) => {
                        Some(format!("{quoted} IS NOT NULL"))
                    }
                    _ => None,
                }
            }
            other => self.comparison(quoted, "=", other, descriptor),
        }
    }

    /// A comparison against one literal, or against each element of an array
    /// operand AND-joined.
    fn comparison(
        &self,
        quoted: &str,
        operator: &str,
        operand: &JsonValue,
        descriptor: &Descriptor,
    ) -> Option<String> {
        match operand {
            JsonValue::Array(values) => {
                if values.is_empty() {
                    return None;
                }
                let parts: Vec<String> = values
                    .iter()
                    .map(|v| format!("{quoted} {operator} {}", self.literal(v, descriptor)))
                    .collect();
                Some(format!("({})", parts.join(" AND ")))
            }
            JsonValue::Object(_) => None,
            value => Some(format!("{quoted} {operator} {}", self.literal(value, descriptor))),
        }
    }

    fn literal(&self, value: &JsonValue, descriptor: &Descriptor) -> String {
        let value = coerce(Value::from_json(value.clone()), descriptor);
        quote_value(&encode(&value, descriptor))
    }
}

fn operator(key: &str) -> Option<&'static str> {
    OPERATORS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, symbol)| *symbol)
}
