//! Query and count handlers.

use crate::error::Result;
use crate::sync::Syncer;
use sdbsync_engine::{Domain, JsonOptions, QueryOptions};
use serde::{Deserialize, Serialize};

/// Body of a query or count request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    /// MongoDB-style query tree. Absent or `null` matches every record.
    pub query: serde_json::Value,
    pub options: QueryOptions,
    /// Return the first match as `{"model": ...}` instead of a collection.
    pub single: bool,
}

/// Response for a count request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Run a query; returns collection wire JSON or one record.
pub async fn handle_query(
    syncer: &Syncer,
    domain: &Domain,
    request: &QueryRequest,
) -> Result<serde_json::Value> {
    if request.single {
        let record = syncer
            .query_one(domain, &request.query, &request.options)
            .await?;
        let schema = domain.schema_for(&record);
        return Ok(record.to_json(&schema, &JsonOptions::default()));
    }

    let set = syncer
        .query(domain, &request.query, &request.options)
        .await?;
    tracing::debug!(
        domain = domain.name(),
        records = set.len(),
        more = set.next_token.is_some(),
        "query"
    );
    Ok(set.to_json(&domain.schema()))
}

pub async fn handle_count(
    syncer: &Syncer,
    domain: &Domain,
    request: &QueryRequest,
) -> Result<CountResponse> {
    let count = syncer
        .count(domain, &request.query, &request.options)
        .await?;
    Ok(CountResponse { count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdbsync_engine::SortOrder;

    #[test]
    fn request_defaults() {
        let request: QueryRequest = serde_json::from_str("{}").unwrap();
        assert!(request.query.is_null());
        assert!(!request.single);
        assert_eq!(request.options, QueryOptions::default());

        let request: QueryRequest = serde_json::from_str(
            r#"{"query": {"age": {"$gt": 30}}, "options": {"orderBy": "age", "order": "desc", "limit": 5}}"#,
        )
        .unwrap();
        assert_eq!(request.options.order_by.as_deref(), Some("age"));
        assert_eq!(request.options.order, Some(SortOrder::Desc));
        assert_eq!(request.options.limit, Some(5));
    }
}
