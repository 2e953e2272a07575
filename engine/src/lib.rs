//! # sdbsync Engine
//!
//! Typed records on top of a string-only attribute store.
//!
//! The store this crate targets keeps every item as an unordered list of
//! `(name, value)` string pairs, compares values lexicographically and is
//! queried with a restricted SQL-like `SELECT`. This crate bridges typed
//! application records to that model.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never talks to a store; it only transforms data
//! - **Pure**: every function is a function of its inputs, safe to call from
//!   any thread without coordination
//! - **Forgiving**: malformed input degrades to a fallback encoding or a
//!   skipped predicate, so a record or query written before a schema change
//!   keeps working. Validation is the only point that rejects.
//!
//! ## Core Concepts
//!
//! ### Schema
//!
//! A [`Schema`] maps attribute names to [`Declaration`]s: a bare
//! [`AttrType`], an [`AttributeDef`] with constraints, or an array of either.
//! Constraints may be computed from the record they are resolved for.
//!
//! ### Codec
//!
//! The [`codec`] module encodes typed values so that string order matches
//! value order: numbers are offset and zero-padded, dates are fixed-width
//! ISO-8601 and `null` has a sentinel.
//!
//! ### Projection
//!
//! [`flatten`] turns a [`Record`] into store pairs and [`unflatten`] reverses
//! it, including the empty-array and `[null]` sentinels.
//!
//! ### Validation
//!
//! [`validate`] checks a record against its schema and reports every
//! violation at once.
//!
//! ### Queries
//!
//! [`compile`] turns a MongoDB-style JSON tree into a `SELECT` statement with
//! literals encoded by the codec.
//!
//! ## Quick Start
//!
//! ```rust
//! use sdbsync_engine::{
//!     compile, flatten, validate, AttrType, AttributeDef, Declaration, QueryOptions, Record,
//!     Schema, Value,
//! };
//! use serde_json::json;
//!
//! // 1. Define a schema
//! let schema = Schema::new()
//!     .with_attribute("name", AttributeDef::string().max_length(32))
//!     .with_attribute("age", AttributeDef::number().min(18).length(3))
//!     .with_attribute("colors", Declaration::array_of(AttrType::String));
//!
//! // 2. Build a record; string input is coerced to the declared type
//! let mut client = Record::new();
//! client.set("name", "Kristina", &schema);
//! client.set("age", "25", &schema);
//! client.set("colors", vec!["red", "green", "red"], &schema);
//! assert_eq!(client.get("age"), Some(&Value::Number(25.0)));
//!
//! // 3. Validate before persisting
//! assert!(validate(&client, &schema).is_none());
//!
//! // 4. Project to store pairs and back
//! client.set_id("client-1");
//! let pairs = flatten(&client, &schema);
//! assert_eq!(pairs.len(), 4);
//! assert_eq!(Record::from_pairs("client-1", &pairs, &schema), client);
//!
//! // 5. Compile a query
//! let select = compile(
//!     "Clients",
//!     &json!({"age": {"$gte": 21}}),
//!     &schema,
//!     &QueryOptions::default(),
//! );
//! assert_eq!(select, r#"SELECT * FROM `Clients` WHERE `age` >= "039""#);
//! ```

pub mod codec;
pub mod domain;
pub mod error;
pub mod projection;
pub mod query;
pub mod record;
pub mod schema;
pub mod validate;
pub mod value;

// Re-export main types at crate root
pub use domain::{Domain, SchemaSource};
pub use error::Error;
pub use projection::{flatten, put_attributes, unflatten, FlatAttribute, PutAttribute};
pub use query::{compile, where_clause, QueryOptions, SortOrder, Target};
pub use record::{JsonOptions, Record, RecordSet};
pub use schema::{AttrType, AttributeDef, Constraint, Declaration, Descriptor, Schema};
pub use validate::{validate, ValidationError, Violation, ViolationCode};
pub use value::Value;

/// Type aliases for clarity
pub type ItemName = String;
pub type DomainName = String;
