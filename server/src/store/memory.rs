//! In-process attribute store.

use super::select::SelectStatement;
use super::{
    AttributeStore, ItemKey, SelectPage, StoreResult, StoredItem, DEFAULT_PAGE_SIZE,
};
use async_trait::async_trait;
use dashmap::DashMap;
use sdbsync_engine::{FlatAttribute, PutAttribute};
use std::sync::Arc;

/// Attribute store held in memory.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug)]
pub struct MemoryStore {
    /// Stored pairs, keyed by domain and item name.
    items: DashMap<ItemKey, Vec<FlatAttribute>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store whose selects return at most `page_size` items per page
    /// unless the expression sets a `LIMIT`.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            items: DashMap::new(),
            page_size,
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored items across all domains.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl AttributeStore for MemoryStore {
    async fn get_attributes(&self, key: &ItemKey) -> StoreResult<Vec<FlatAttribute>> {
        let pairs = self
            .items
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        tracing::debug!(item = %key, pairs = pairs.len(), "get attributes");
        Ok(pairs)
    }

    async fn put_attributes(&self, key: &ItemKey, attributes: &[PutAttribute]) -> StoreResult<()> {
        if attributes.is_empty() {
            return Ok(());
        }
        let mut entry = self.items.entry(key.clone()).or_default();
        let stored = entry.value_mut();

        for attribute in attributes.iter().filter(|a| a.replace) {
            stored.retain(|pair| pair.name != attribute.name);
        }
        for attribute in attributes {
            let pair = FlatAttribute::new(attribute.name.clone(), attribute.value.clone());
            if !stored.contains(&pair) {
                stored.push(pair);
            }
        }

        tracing::debug!(item = %key, pairs = attributes.len(), "put attributes");
        Ok(())
    }

    async fn delete_attributes(&self, key: &ItemKey, names: &[String]) -> StoreResult<()> {
        if names.is_empty() {
            self.items.remove(key);
        } else {
            let now_empty = match self.items.get_mut(key) {
                Some(mut entry) => {
                    entry.retain(|pair| !names.contains(&pair.name));
                    entry.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.items.remove_if(key, |_, pairs| pairs.is_empty());
            }
        }

        tracing::debug!(item = %key, names = ?names, "delete attributes");
        Ok(())
    }

    async fn select(&self, expression: &str, next_token: Option<&str>) -> StoreResult<SelectPage> {
        let statement = SelectStatement::parse(expression)?;
        let items: Vec<StoredItem> = self
            .items
            .iter()
            .filter(|entry| entry.key().domain == statement.domain())
            .map(|entry| StoredItem {
                name: entry.key().item_name.clone(),
                attributes: entry.value().clone(),
            })
            .collect();

        let page = statement.execute(items, next_token, self.page_size)?;
        tracing::debug!(
            expression,
            items = page.items.len(),
            more = page.next_token.is_some(),
            "select"
        );
        Ok(page)
    }
}
