//! Persisted snapshots of the last pushed payload per scope

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::scope::SyncScope;

/// Rows of `(command id, normalized payload)` per scope
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Rows of `scope` among `ids`; unknown ids are skipped
    async fn find(&self, scope: SyncScope, ids: &[String]) -> Result<Vec<(String, Value)>, StoreError>;

    /// Every row of `scope`
    async fn list(&self, scope: SyncScope) -> Result<HashMap<String, Value>, StoreError>;

    async fn upsert(&self, scope: SyncScope, id: &str, schema: &Value) -> Result<(), StoreError>;

    async fn delete(&self, scope: SyncScope, ids: &[String]) -> Result<(), StoreError>;

    /// Drop every row of `scope`
    async fn clear(&self, scope: SyncScope) -> Result<(), StoreError>;
}

/// In-memory snapshots, lost on restart
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    scopes: DashMap<SyncScope, HashMap<String, Value>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn find(&self, scope: SyncScope, ids: &[String]) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(self
            .scopes
            .get(&scope)
            .map(|rows| {
                ids.iter()
                    .filter_map(|id| rows.get(id).map(|schema| (id.clone(), schema.clone())))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list(&self, scope: SyncScope) -> Result<HashMap<String, Value>, StoreError> {
        Ok(self.scopes.get(&scope).map(|rows| rows.clone()).unwrap_or_default())
    }

    async fn upsert(&self, scope: SyncScope, id: &str, schema: &Value) -> Result<(), StoreError> {
        self.scopes
            .entry(scope)
            .or_default()
            .insert(id.to_string(), schema.clone());
        Ok(())
    }

    async fn delete(&self, scope: SyncScope, ids: &[String]) -> Result<(), StoreError> {
        if let Some(mut rows) = self.scopes.get_mut(&scope) {
            for id in ids {
                rows.remove(id);
            }
        }
        Ok(())
    }

    async fn clear(&self, scope: SyncScope) -> Result<(), StoreError> {
        self.scopes.remove(&scope);
        Ok(())
    }
}

/// Snapshots in a sled database, one tree per scope
#[derive(Debug, Clone)]
pub struct SledSnapshotStore {
    db: Arc<sled::Db>,
}

impl SledSnapshotStore {
    /// Open or create the database at `db_path`
    pub fn open<P: AsRef<Path>>(db_path: P, cache_capacity_mb: u64) -> Result<Self, StoreError> {
        info!("Opening command snapshot database at: {:?}", db_path.as_ref());

        let db = sled::Config::default()
            .path(db_path.as_ref())
            .cache_capacity(cache_capacity_mb * 1024 * 1024)
            .open()?;

        Ok(Self::from_db(Arc::new(db)))
    }

    pub fn from_db(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    fn tree(&self, scope: SyncScope) -> Result<sled::Tree, StoreError> {
        Ok(self.db.open_tree(format!("snapshots:{}", scope.key()))?)
    }

    fn decode(id: &str, bytes: &[u8]) -> Result<Value, StoreError> {
        serde_json::from_slice(bytes).map_err(|source| StoreError::Corrupt {
            id: id.to_string(),
            source,
        })
    }
}

#[async_trait]
impl SnapshotStore for SledSnapshotStore {
    async fn find(&self, scope: SyncScope, ids: &[String]) -> Result<Vec<(String, Value)>, StoreError> {
        let tree = self.tree(scope)?;
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bytes) = tree.get(id.as_bytes())? {
                rows.push((id.clone(), Self::decode(id, &bytes)?));
            }
        }
        Ok(rows)
    }

    async fn list(&self, scope: SyncScope) -> Result<HashMap<String, Value>, StoreError> {
        let tree = self.tree(scope)?;
        let mut rows = HashMap::new();
        for entry in tree.iter() {
            let (key, bytes) = entry?;
            let id = String::from_utf8_lossy(&key).into_owned();
            let schema = Self::decode(&id, &bytes)?;
            rows.insert(id, schema);
        }
        debug!("Loaded {} snapshot rows for {}", rows.len(), scope);
        Ok(rows)
    }

    async fn upsert(&self, scope: SyncScope, id: &str, schema: &Value) -> Result<(), StoreError> {
        let tree = self.tree(scope)?;
        tree.insert(id.as_bytes(), serde_json::to_vec(schema)?)?;
        tree.flush_async().await?;
        Ok(())
    }

    async fn delete(&self, scope: SyncScope, ids: &[String]) -> Result<(), StoreError> {
        let tree = self.tree(scope)?;
        for id in ids {
            tree.remove(id.as_bytes())?;
        }
        tree.flush_async().await?;
        Ok(())
    }

    async fn clear(&self, scope: SyncScope) -> Result<(), StoreError> {
        let tree = self.tree(scope)?;
        tree.clear()?;
        tree.flush_async().await?;
        Ok(())
    }
}
