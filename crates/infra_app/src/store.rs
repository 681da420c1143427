//! Item persistence.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, warn};

use crate::config::DbOptions;
use crate::error::{AppError, AppResult};

const CREATE_ITEMS: &str = "CREATE TABLE IF NOT EXISTS items (id SERIAL PRIMARY KEY, name TEXT NOT NULL)";
const INSERT_ITEM: &str = "INSERT INTO items (name) VALUES ($1)";

/// Storage for submitted items.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Durably record one item.
    async fn insert_item(&self, name: &str) -> AppResult<()>;
}

/// PostgreSQL store. Every call opens its own connection, commits and
/// closes it; there is no pool.
pub struct PgItemStore {
    options: DbOptions,
}

impl PgItemStore {
    pub fn new(options: DbOptions) -> Self {
        Self { options }
    }

    async fn connect(&self) -> AppResult<Client> {
        let config = self.options.pg_config()?;
        let (client, connection) = config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("Database connection closed with error: {}", e);
            }
        });
        Ok(client)
    }

    /// Create the `items` table if it does not exist.
    pub async fn ensure_schema(&self) -> AppResult<()> {
        let client = self.connect().await?;
        client.batch_execute(CREATE_ITEMS).await?;
        info!("Items table ready");
        Ok(())
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn insert_item(&self, name: &str) -> AppResult<()> {
        let mut client = self.connect().await?;
        let transaction = client.transaction().await?;
        transaction.execute(INSERT_ITEM, &[&name]).await?;
        transaction.commit().await?;
        debug!("Inserted item {:?}", name);
        Ok(())
    }
}

/// In-memory store for tests and local runs without a database.
#[derive(Clone, Default)]
pub struct MemoryItemStore {
    items: Arc<RwLock<Vec<String>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert fail with `message`.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.failure.write() = Some(message.into());
        self
    }

    pub fn items(&self) -> Vec<String> {
        self.items.read().clone()
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn insert_item(&self, name: &str) -> AppResult<()> {
        if let Some(message) = self.failure.read().clone() {
            return Err(AppError::Store(message));
        }
        self.items.write().push(name.to_string());
        Ok(())
    }
}
