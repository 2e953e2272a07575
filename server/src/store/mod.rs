//! Attribute store collaborator.
//!
//! The sync layer talks to the store only through [`AttributeStore`]: four
//! calls over flat `(name, value)` pairs keyed by domain and item name. A
//! keyed fetch that finds nothing returns an empty list, which is distinct
//! from a [`StoreError`].

mod memory;
mod postgres;
pub mod select;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use sdbsync_engine::{DomainName, FlatAttribute, ItemName, PutAttribute};
use std::fmt;

/// Attribute carrying the result of a `SELECT COUNT(*)`.
pub const COUNT_ATTRIBUTE: &str = "Count";

/// Page size used when neither the query nor the configuration sets one.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Address of one stored item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub domain: DomainName,
    pub item_name: ItemName,
}

impl ItemKey {
    pub fn new(domain: impl Into<DomainName>, item_name: impl Into<ItemName>) -> Self {
        Self {
            domain: domain.into(),
            item_name: item_name.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.item_name)
    }
}

/// An item returned by a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub name: ItemName,
    pub attributes: Vec<FlatAttribute>,
}

/// One page of select results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectPage {
    pub items: Vec<StoredItem>,
    /// Opaque token for the next page.
    pub next_token: Option<String>,
}

/// Store failures. "Not found" is not one of them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid select expression: {0}")]
    InvalidSelect(String),

    #[error("invalid next token")]
    InvalidToken,

    #[error("malformed store response: {0}")]
    MalformedResponse(String),
}

/// Result type for store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Operations the sync layer needs from an attribute store.
///
/// Implementations keep every value as a string and may hold several values
/// under one name, never the same `(name, value)` pair twice.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// All pairs stored for `key`; empty when the item does not exist.
    async fn get_attributes(&self, key: &ItemKey) -> StoreResult<Vec<FlatAttribute>>;

    /// Upsert pairs. A pair with `replace` set first drops every stored value
    /// under its name; other pairs are added next to existing values.
    async fn put_attributes(&self, key: &ItemKey, attributes: &[PutAttribute]) -> StoreResult<()>;

    /// Remove the named attributes, or the whole item when `names` is empty.
    async fn delete_attributes(&self, key: &ItemKey, names: &[String]) -> StoreResult<()>;

    /// Run a select expression, continuing from `next_token` when given.
    async fn select(&self, expression: &str, next_token: Option<&str>) -> StoreResult<SelectPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_key_display() {
        let key = ItemKey::new("Clients", "client-1");
        assert_eq!(key.to_string(), "Clients/client-1");
    }

    #[test]
    fn store_error_display() {
        assert_eq!(StoreError::InvalidToken.to_string(), "invalid next token");
        assert_eq!(
            StoreError::InvalidSelect("unexpected end".into()).to_string(),
            "invalid select expression: unexpected end"
        );
    }
}
