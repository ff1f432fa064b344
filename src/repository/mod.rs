//! Repository layer: storage traits and their backends
//!
//! Each app gets its own store trait. `PgStore` implements all of them on a
//! PostgreSQL pool; `MemoryStore` keeps the same tables in process.

pub mod catalog;
pub mod memory;
pub mod relationship;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::error::AppResult;

pub use catalog::CatalogStore;
pub use memory::MemoryStore;
pub use relationship::RelationshipStore;
pub use users::UserStore;

/// Backend liveness probe used by the readiness endpoint
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}

/// PostgreSQL backend
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Handles on every store, shared by the services
#[derive(Clone)]
pub struct Repository {
    pub catalog: Arc<dyn CatalogStore>,
    pub relationship: Arc<dyn RelationshipStore>,
    pub users: Arc<dyn UserStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repository {
    /// Create a repository backed by the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::from_store(PgStore::new(pool))
    }

    /// Create a repository backed by fresh in-process tables
    pub fn in_memory() -> Self {
        Self::from_store(MemoryStore::new())
    }

    pub fn from_store<S>(store: S) -> Self
    where
        S: CatalogStore + RelationshipStore + UserStore + StoreHealth + 'static,
    {
        let store = Arc::new(store);
        Self {
            catalog: store.clone(),
            relationship: store.clone(),
            users: store.clone(),
            health: store,
        }
    }
}
