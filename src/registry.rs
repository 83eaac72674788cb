//! Published schema snapshot.
//!
//! Readers take an `Arc` to the current [`DBInfo`] and keep using it for as
//! long as they like. A refresh builds a complete new snapshot first and only
//! then swaps the reference, so nobody sees a half-built schema and a failed
//! refresh leaves the old one in place.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{CatalogSource, Engine};
use crate::error::SchemaqlResult;
use crate::schema::{DBInfo, discover_schema};

struct Published {
    info: Arc<DBInfo>,
    at: DateTime<Utc>,
}

/// Holder of the current schema snapshot.
pub struct SchemaRegistry {
    current: RwLock<Published>,
}

impl SchemaRegistry {
    pub fn new(info: DBInfo) -> Self {
        Self {
            current: RwLock::new(Published {
                info: Arc::new(info),
                at: Utc::now(),
            }),
        }
    }

    /// Discover and publish the first snapshot.
    pub async fn load<C, S>(source: &C, engine: Engine, block_list: &[S]) -> SchemaqlResult<Self>
    where
        C: CatalogSource + ?Sized,
        S: AsRef<str> + Sync,
    {
        Ok(Self::new(discover_schema(source, engine, block_list).await?))
    }

    pub async fn snapshot(&self) -> Arc<DBInfo> {
        self.current.read().await.info.clone()
    }

    pub async fn refreshed_at(&self) -> DateTime<Utc> {
        self.current.read().await.at
    }

    /// Swap in a new snapshot, returning the one it replaced.
    pub async fn publish(&self, info: DBInfo) -> Arc<DBInfo> {
        let mut guard = self.current.write().await;
        let previous = std::mem::replace(&mut guard.info, Arc::new(info));
        guard.at = Utc::now();
        tracing::info!(
            "Published schema snapshot {:016x} (was {:016x})",
            guard.info.hash(),
            previous.hash()
        );
        previous
    }

    /// Rediscover the schema and publish it. Returns whether the content
    /// hash changed. On error the published snapshot is untouched.
    pub async fn refresh<C, S>(&self, source: &C, engine: Engine, block_list: &[S]) -> SchemaqlResult<bool>
    where
        C: CatalogSource + ?Sized,
        S: AsRef<str> + Sync,
    {
        let info = discover_schema(source, engine, block_list).await?;
        let new_hash = info.hash();
        let previous = self.publish(info).await;
        Ok(previous.hash() != new_hash)
    }
}
