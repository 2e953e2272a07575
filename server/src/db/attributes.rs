//! Queries over the attributes table.

use sdbsync_engine::{FlatAttribute, PutAttribute};
use sqlx::{PgPool, Row};

/// A stored attribute row.
#[derive(Debug)]
pub struct AttributeRow {
    pub item_name: String,
    pub name: String,
    pub value: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for AttributeRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(AttributeRow {
            item_name: row.try_get("item_name")?,
            name: row.try_get("name")?,
            value: row.try_get("value")?,
        })
    }
}

impl AttributeRow {
    pub fn to_pair(&self) -> FlatAttribute {
        FlatAttribute::new(self.name.clone(), self.value.clone())
    }
}

/// Every pair stored for one item, in insertion order.
pub async fn get_item_attributes(
    pool: &PgPool,
    domain: &str,
    item_name: &str,
) -> Result<Vec<AttributeRow>, sqlx::Error> {
    sqlx::query_as::<_, AttributeRow>(
        r#"
        SELECT item_name, name, value
        FROM attributes
        WHERE domain = $1 AND item_name = $2
        ORDER BY id
        "#,
    )
    .bind(domain)
    .bind(item_name)
    .fetch_all(pool)
    .await
}

/// Apply a put in one transaction: drop replaced names, then insert pairs.
pub async fn put_item_attributes(
    pool: &PgPool,
    domain: &str,
    item_name: &str,
    attributes: &[PutAttribute],
) -> Result<(), sqlx::Error> {
    let replaced: Vec<String> = attributes
        .iter()
        .filter(|a| a.replace)
        .map(|a| a.name.clone())
        .collect();

    let mut tx = pool.begin().await?;

    if !replaced.is_empty() {
        sqlx::query(
            r#"
            DELETE FROM attributes
            WHERE domain = $1 AND item_name = $2 AND name = ANY($3)
            "#,
        )
        .bind(domain)
        .bind(item_name)
        .bind(&replaced)
        .execute(&mut *tx)
        .await?;
    }

    for attribute in attributes {
        sqlx::query(
            r#"
            INSERT INTO attributes (domain, item_name, name, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (domain, item_name, name, value) DO NOTHING
            "#,
        )
        .bind(domain)
        .bind(item_name)
        .bind(&attribute.name)
        .bind(&attribute.value)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Remove an item entirely.
pub async fn delete_item(pool: &PgPool, domain: &str, item_name: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM attributes WHERE domain = $1 AND item_name = $2")
        .bind(domain)
        .bind(item_name)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Remove every value stored under `names` for one item.
pub async fn delete_item_attributes(
    pool: &PgPool,
    domain: &str,
    item_name: &str,
    names: &[String],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM attributes
        WHERE domain = $1 AND item_name = $2 AND name = ANY($3)
        "#,
    )
    .bind(domain)
    .bind(item_name)
    .bind(names)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Every row of a domain, grouped by item.
pub async fn get_domain_attributes(
    pool: &PgPool,
    domain: &str,
) -> Result<Vec<AttributeRow>, sqlx::Error> {
    sqlx::query_as::<_, AttributeRow>(
        r#"
        SELECT item_name, name, value
        FROM attributes
        WHERE domain = $1
        ORDER BY item_name, id
        "#,
    )
    .bind(domain)
    .fetch_all(pool)
    .await
}
