//! Save, fetch, destroy and query records through an [`AttributeStore`].
//!
//! The engine does the typing work; this layer sequences store calls and
//! turns their results back into records.

use crate::store::{AttributeStore, ItemKey, StoreError, COUNT_ATTRIBUTE};
use sdbsync_engine::{
    compile, put_attributes, validate, Domain, ItemName, QueryOptions, Record, RecordSet, Target,
    ValidationError, Value,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sync layer failures.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// What happened to the attributes unset since the last save.
#[derive(Debug)]
pub enum UnsetOutcome {
    /// Nothing was pending.
    Nothing,
    /// The named attributes were deleted from the store.
    Deleted(Vec<String>),
    /// The delete failed; the names are still pending on the record.
    Failed { names: Vec<String>, error: StoreError },
}

/// Result of a successful save.
#[derive(Debug)]
pub struct SaveOutcome {
    pub id: ItemName,
    /// Attributes the save assigned: a generated identifier and `onUpdate`
    /// values.
    pub changed: BTreeMap<String, Value>,
    pub unset: UnsetOutcome,
}

impl SaveOutcome {
    /// Wire JSON: `{"model": changed}`, plus the names still pending when the
    /// unset delete failed.
    pub fn to_json(&self) -> serde_json::Value {
        let changed: serde_json::Map<String, serde_json::Value> = self
            .changed
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        let mut wire = json!({ "model": changed });
        if let UnsetOutcome::Failed { names, .. } = &self.unset {
            wire[sdbsync_engine::record::UNSET_NAMES_KEY] = json!(names);
        }
        wire
    }
}

/// Drives records through a store.
#[derive(Clone)]
pub struct Syncer {
    store: Arc<dyn AttributeStore>,
}

impl Syncer {
    pub fn new(store: Arc<dyn AttributeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AttributeStore> {
        &self.store
    }

    /// Create or update `record`. New records get a UUID v4 item name.
    pub async fn save(&self, domain: &Domain, record: &mut Record) -> Result<SaveOutcome> {
        self.save_with(domain, record, None).await
    }

    /// Create a new record under a caller-chosen item name.
    pub async fn create_with_id(
        &self,
        domain: &Domain,
        record: &mut Record,
        id: impl Into<ItemName>,
    ) -> Result<SaveOutcome> {
        self.save_with(domain, record, Some(id.into())).await
    }

    /// Validate, assign the identifier and `onUpdate` values, then issue the
    /// unset delete and the put together.
    ///
    /// The record is left untouched when validation fails. A failed unset
    /// delete does not fail the save; it is reported in the outcome and the
    /// names stay pending.
    pub async fn save_with(
        &self,
        domain: &Domain,
        record: &mut Record,
        custom_id: Option<ItemName>,
    ) -> Result<SaveOutcome> {
        let schema = domain.schema_for(record);
        if let Some(error) = validate(record, &schema) {
            tracing::debug!(domain = domain.name(), violations = error.errors.len(), "save rejected");
            return Err(error.into());
        }

        let unset_names = record.pending_unsets();
        let mut changed = BTreeMap::new();

        let id = match record.id() {
            Some(id) => id.to_string(),
            None => {
                let id = custom_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                record.set_id(id.clone());
                changed.insert(schema.identifier().to_string(), Value::String(id.clone()));
                id
            }
        };

        for (name, value) in schema.on_update_values(record) {
            record.insert(name.clone(), value.clone());
            changed.insert(name, value);
        }

        let key = ItemKey::new(domain.name(), id.clone());
        let pairs = put_attributes(record, &schema);

        let delete = async {
            if unset_names.is_empty() {
                return None;
            }
            Some(self.store.delete_attributes(&key, &unset_names).await)
        };
        let put = self.store.put_attributes(&key, &pairs);
        let (deleted, put_result) = futures::join!(delete, put);

        put_result?;

        let unset = match deleted {
            None => UnsetOutcome::Nothing,
            Some(Ok(())) => UnsetOutcome::Deleted(unset_names),
            Some(Err(error)) => {
                tracing::warn!(item = %key, names = ?unset_names, error = %error, "unset delete failed");
                UnsetOutcome::Failed {
                    names: unset_names,
                    error,
                }
            }
        };
        if !matches!(unset, UnsetOutcome::Failed { .. }) {
            record.mark_persisted();
        }

        tracing::debug!(item = %key, pairs = pairs.len(), "saved");
        Ok(SaveOutcome { id, changed, unset })
    }

    /// Load one record. An item with no attributes does not exist.
    pub async fn fetch(&self, domain: &Domain, id: &str) -> Result<Record> {
        let key = ItemKey::new(domain.name(), id);
        let pairs = self.store.get_attributes(&key).await?;
        if pairs.is_empty() {
            return Err(SyncError::NotFound(key.to_string()));
        }
        let schema = domain.schema_for(&Record::with_id(id));
        Ok(Record::from_pairs(id, &pairs, &schema))
    }

    /// Delete the whole item.
    pub async fn destroy(&self, domain: &Domain, id: &str) -> Result<()> {
        let key = ItemKey::new(domain.name(), id);
        self.store.delete_attributes(&key, &[]).await?;
        tracing::debug!(item = %key, "destroyed");
        Ok(())
    }

    /// Run a query tree and decode one page of results.
    pub async fn query(
        &self,
        domain: &Domain,
        tree: &serde_json::Value,
        options: &QueryOptions,
    ) -> Result<RecordSet> {
        let schema = domain.schema();
        let expression = compile(domain.name(), tree, &schema, options);
        let page = self
            .store
            .select(&expression, options.next_token.as_deref())
            .await?;

        let records = page
            .items
            .iter()
            .map(|item| {
                let schema = domain.schema_for(&Record::with_id(item.name.clone()));
                Record::from_pairs(item.name.clone(), &item.attributes, &schema)
            })
            .collect();

        Ok(RecordSet {
            records,
            next_token: page.next_token,
        })
    }

    /// First record matching `tree`.
    pub async fn query_one(
        &self,
        domain: &Domain,
        tree: &serde_json::Value,
        options: &QueryOptions,
    ) -> Result<Record> {
        let options = QueryOptions {
            target: Target::Single,
            ..options.clone()
        };
        let set = self.query(domain, tree, &options).await?;
        set.records
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::NotFound(domain.name().to_string()))
    }

    /// Number of records matching `tree`.
    pub async fn count(
        &self,
        domain: &Domain,
        tree: &serde_json::Value,
        options: &QueryOptions,
    ) -> Result<u64> {
        let options = QueryOptions {
            count: true,
            next_token: None,
            ..options.clone()
        };
        let schema = domain.schema();
        let expression = compile(domain.name(), tree, &schema, &options);
        let page = self.store.select(&expression, None).await?;

        page.items
            .iter()
            .flat_map(|item| item.attributes.iter())
            .find(|pair| pair.name == COUNT_ATTRIBUTE)
            .and_then(|pair| pair.value.parse().ok())
            .ok_or_else(|| {
                StoreError::MalformedResponse(format!("no {COUNT_ATTRIBUTE} in {expression}"))
                    .into()
            })
    }
}
