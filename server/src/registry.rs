//! Domains the server knows about, keyed by resource name.

use dashmap::DashMap;
use sdbsync_engine::{Domain, Schema};
use std::sync::Arc;

/// Registered domains.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct DomainRegistry {
    /// Domains keyed by the resource segment of their URL, e.g. `clients`.
    domains: DashMap<String, Domain>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self {
            domains: DashMap::new(),
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register `domain` under `resource`. Replaces any earlier registration.
    pub fn register(&self, resource: impl Into<String>, domain: Domain) {
        let resource = resource.into();
        tracing::info!(resource = %resource, domain = domain.name(), "domain registered");
        self.domains.insert(resource, domain);
    }

    /// Register a domain named after its URL: `/clients` serves `Clients`.
    pub fn register_url(&self, url: &str, schema: Schema) -> Domain {
        let domain = Domain::from_url(url, schema);
        self.register(url.trim_start_matches('/'), domain.clone());
        domain
    }

    pub fn get(&self, resource: &str) -> Option<Domain> {
        self.domains.get(resource).map(|entry| entry.value().clone())
    }

    /// Registered resource names, sorted.
    pub fn resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.domains.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdbsync_engine::AttrType;

    #[test]
    fn register_by_url() {
        let registry = DomainRegistry::new();
        let domain = registry.register_url(
            "/clients",
            Schema::new().with_attribute("name", AttrType::String),
        );
        assert_eq!(domain.name(), "Clients");
        assert_eq!(registry.get("clients").map(|d| d.name().to_string()), Some("Clients".into()));
        assert!(registry.get("vendors").is_none());
        assert_eq!(registry.resources(), vec!["clients"]);
    }
}
