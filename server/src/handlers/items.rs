//! Single-record handlers: create, fetch, update, destroy.

use crate::error::{AppError, Result};
use crate::registry::DomainRegistry;
use crate::sync::Syncer;
use sdbsync_engine::{Domain, JsonOptions, Record};
use serde::Deserialize;

/// Query parameters for fetching one record.
#[derive(Debug, Default, Deserialize)]
pub struct FetchParams {
    /// Comma-separated attribute names to return.
    pub include: Option<String>,
    /// Comma-separated attribute names to leave out. Wins over `include`.
    pub exclude: Option<String>,
}

impl FetchParams {
    pub fn to_options(&self) -> JsonOptions {
        JsonOptions {
            include: split_names(self.include.as_deref()),
            exclude: split_names(self.exclude.as_deref()),
            include_unset: false,
        }
    }
}

fn split_names(names: Option<&str>) -> Vec<String> {
    names
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Look up the domain served under `resource`.
pub fn find_domain(registry: &DomainRegistry, resource: &str) -> Result<Domain> {
    registry
        .get(resource)
        .ok_or_else(|| AppError::NotFound(format!("unknown resource '{resource}'")))
}

/// Create a record from wire JSON. An identifier in the body becomes the
/// item name; otherwise one is generated.
pub async fn handle_create(
    syncer: &Syncer,
    domain: &Domain,
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    let mut record = Record::from_json(body, &domain.schema())?;
    let outcome = match record.take_id() {
        Some(id) => syncer.create_with_id(domain, &mut record, id).await?,
        None => syncer.save(domain, &mut record).await?,
    };
    tracing::info!(domain = domain.name(), id = %outcome.id, "record created");
    Ok(outcome.to_json())
}

/// Fetch one record as wire JSON.
pub async fn handle_fetch(
    syncer: &Syncer,
    domain: &Domain,
    id: &str,
    params: &FetchParams,
) -> Result<serde_json::Value> {
    let record = syncer.fetch(domain, id).await?;
    let schema = domain.schema_for(&record);
    Ok(record.to_json(&schema, &params.to_options()))
}

/// Update the record at `id`. The path identifier wins over one in the body.
pub async fn handle_update(
    syncer: &Syncer,
    domain: &Domain,
    id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    let mut record = Record::from_json(body, &domain.schema())?;
    record.set_id(id);
    let outcome = syncer.save(domain, &mut record).await?;
    Ok(outcome.to_json())
}

pub async fn handle_destroy(syncer: &Syncer, domain: &Domain, id: &str) -> Result<()> {
    syncer.destroy(domain, id).await?;
    tracing::info!(domain = domain.name(), id, "record destroyed");
    Ok(())
}
