//! Attribute store backed by PostgreSQL, one row per stored pair.

use super::select::SelectStatement;
use super::{AttributeStore, ItemKey, SelectPage, StoreResult, StoredItem, DEFAULT_PAGE_SIZE};
use crate::db::{self, AttributeRow, Pool};
use async_trait::async_trait;
use sdbsync_engine::{FlatAttribute, PutAttribute};

/// PostgreSQL attribute store.
///
/// Selects load the domain's rows and run the shared evaluator over them.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Pool,
    page_size: usize,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self::with_page_size(pool, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(pool: Pool, page_size: usize) -> Self {
        Self { pool, page_size }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

/// Group rows sorted by item name into items.
fn group_rows(rows: Vec<AttributeRow>) -> Vec<StoredItem> {
    let mut items: Vec<StoredItem> = Vec::new();
    for row in rows {
        let pair = row.to_pair();
        let same_item = items.last().is_some_and(|item| item.name == row.item_name);
        if same_item {
            if let Some(item) = items.last_mut() {
                item.attributes.push(pair);
            }
        } else {
            items.push(StoredItem {
                name: row.item_name,
                attributes: vec![pair],
            });
        }
    }
    items
}

#[async_trait]
impl AttributeStore for PgStore {
    async fn get_attributes(&self, key: &ItemKey) -> StoreResult<Vec<FlatAttribute>> {
        let rows = db::get_item_attributes(&self.pool, &key.domain, &key.item_name).await?;
        tracing::debug!(item = %key, pairs = rows.len(), "get attributes");
        Ok(rows.iter().map(AttributeRow::to_pair).collect())
    }

    async fn put_attributes(&self, key: &ItemKey, attributes: &[PutAttribute]) -> StoreResult<()> {
        if attributes.is_empty() {
            return Ok(());
        }
        db::put_item_attributes(&self.pool, &key.domain, &key.item_name, attributes).await?;
        tracing::debug!(item = %key, pairs = attributes.len(), "put attributes");
        Ok(())
    }

    async fn delete_attributes(&self, key: &ItemKey, names: &[String]) -> StoreResult<()> {
        let removed = if names.is_empty() {
            db::delete_item(&self.pool, &key.domain, &key.item_name).await?
        } else {
            db::delete_item_attributes(&self.pool, &key.domain, &key.item_name, names).await?
        };
        tracing::debug!(item = %key, names = ?names, removed, "delete attributes");
        Ok(())
    }

    async fn select(&self, expression: &str, next_token: Option<&str>) -> StoreResult<SelectPage> {
        let statement = SelectStatement::parse(expression)?;
        let rows = db::get_domain_attributes(&self.pool, statement.domain()).await?;
        let page = statement.execute(group_rows(rows), next_token, self.page_size)?;
        tracing::debug!(
            expression,
            items = page.items.len(),
            more = page.next_token.is_some(),
            "select"
        );
        Ok(page)
    }
}
