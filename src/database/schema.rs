// file: src/database/schema.rs
// description: sqlite schema management for the sync state table
// reference: https://www.sqlite.org/lang_createtable.html

use crate::database::store::StateStore;
use crate::error::Result;
use tracing::{info, warn};

pub const TABLE_NAME: &str = "repos";

pub struct SchemaManager<'a> {
    store: &'a StateStore,
}

impl<'a> SchemaManager<'a> {
    pub fn new(store: &'a StateStore) -> Self {
        Self { store }
    }

    /// Idempotent. Column types match state files written by earlier
    /// releases, so nullable columns are kept.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                name TEXT PRIMARY KEY,
                last_sha TEXT,
                last_sync_at TEXT
            )
            "#,
            TABLE_NAME
        ))
        .execute(self.store.pool())
        .await?;

        info!("State schema ready");
        Ok(())
    }

    pub async fn verify_schema(&self) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")
                .bind(TABLE_NAME)
                .fetch_optional(self.store.pool())
                .await?;

        if row.is_none() {
            warn!("Table '{}' does not exist", TABLE_NAME);
            return Ok(false);
        }

        info!("Table '{}' exists", TABLE_NAME);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = StateStore::open_in_memory().await.unwrap();
        let manager = SchemaManager::new(&store);

        manager.initialize().await.unwrap();
        manager.initialize().await.unwrap();
        assert!(manager.verify_schema().await.unwrap());
    }
}
