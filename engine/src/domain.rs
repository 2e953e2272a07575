//! Domains: a named store table plus the schema of the records kept in it.

use crate::{DomainName, Record, Schema};
use std::fmt;
use std::sync::Arc;

type SchemaFn = Arc<dyn Fn(&Record) -> Schema + Send + Sync>;

/// Where a domain's schema comes from.
#[derive(Clone)]
pub enum SchemaSource {
    Static(Arc<Schema>),
    /// Built from the record being handled, for per-instance schemas.
    Dynamic(SchemaFn),
}

/// A store domain and the schema its records follow.
#[derive(Clone)]
pub struct Domain {
    name: DomainName,
    schema: SchemaSource,
}

impl Domain {
    pub fn new(name: impl Into<DomainName>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema: SchemaSource::Static(Arc::new(schema)),
        }
    }

    /// Domain whose schema is computed from each record.
    pub fn with_schema_fn<F>(name: impl Into<DomainName>, f: F) -> Self
    where
        F: Fn(&Record) -> Schema + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            schema: SchemaSource::Dynamic(Arc::new(f)),
        }
    }

    /// Domain named after a resource URL: `/clients` becomes `Clients`.
    pub fn from_url(url: &str, schema: Schema) -> Self {
        Self::new(domain_name_from_url(url), schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema for `record`.
    pub fn schema_for(&self, record: &Record) -> Arc<Schema> {
        match &self.schema {
            SchemaSource::Static(schema) => Arc::clone(schema),
            SchemaSource::Dynamic(f) => Arc::new(f(record)),
        }
    }

    /// Schema used when there is no record yet, e.g. to compile a query.
    pub fn schema(&self) -> Arc<Schema> {
        self.schema_for(&Record::new())
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.schema {
            SchemaSource::Static(_) => "static",
            SchemaSource::Dynamic(_) => "dynamic",
        };
        f.debug_struct("Domain")
            .field("name", &self.name)
            .field("schema", &source)
            .finish()
    }
}

/// Strip one leading slash and upper-case the first letter.
pub fn domain_name_from_url(url: &str) -> DomainName {
    let trimmed = url.strip_prefix('/').unwrap_or(url);
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => DomainName::new(),
    }
}
