// file: src/database/store.rs
// description: sqlite-backed sync state, one record per repository name
// reference: https://docs.rs/sqlx

use crate::database::schema::{SchemaManager, TABLE_NAME};
use crate::error::{MirrorError, Result};
use crate::models::SyncRecord;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Clone)]
pub struct StateStore {
    pool: SqlitePool,
}

impl StateStore {
    /// Opens (creating if absent) the store and ensures the schema exists.
    /// Safe to call on every run.
    pub async fn open(path: &Path) -> Result<Self> {
        let store = Self::connect(path).await?;
        SchemaManager::new(&store).initialize().await?;
        Ok(store)
    }

    /// Opens the database file without touching the schema.
    pub async fn connect(path: &Path) -> Result<Self> {
        info!("Opening state store at {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;
        Ok(Self { pool })
    }

    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str(":memory:")?.create_if_missing(true);

        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        SchemaManager::new(&store).initialize().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert-or-replace in a single statement. `last_sync_at` keeps the
    /// later of the stored and new timestamps.
    pub async fn upsert(&self, repo_name: &str, sha: &str) -> Result<()> {
        let now = format_timestamp(Utc::now());

        sqlx::query(&format!(
            r#"
            INSERT INTO {table} (name, last_sha, last_sync_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                last_sha = excluded.last_sha,
                last_sync_at = MAX(COALESCE({table}.last_sync_at, ''), excluded.last_sync_at)
            "#,
            table = TABLE_NAME
        ))
        .bind(repo_name)
        .bind(sha)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(repository = repo_name, sha, "Recorded sync state");
        Ok(())
    }

    pub async fn get(&self, repo_name: &str) -> Result<Option<SyncRecord>> {
        let row: Option<(String, Option<String>, Option<String>)> = sqlx::query_as(&format!(
            "SELECT name, last_sha, last_sync_at FROM {} WHERE name = ?1",
            TABLE_NAME
        ))
        .bind(repo_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(name, last_sha, last_sync_at)| {
            Ok(SyncRecord {
                repo_name: name,
                last_sha: last_sha.unwrap_or_default(),
                last_sync_at: parse_timestamp(last_sync_at.as_deref().unwrap_or_default())?,
            })
        })
        .transpose()
    }

    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Fixed-width UTC so that string order equals time order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 and the naive ISO-8601 form written by older state
/// files.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| MirrorError::Serialization(format!("Invalid last_sync_at {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = StateStore::open_in_memory().await.unwrap();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins_and_monotonic() {
        let store = StateStore::open_in_memory().await.unwrap();

        store.upsert("node", "aaa").await.unwrap();
        let first = store.get("node").await.unwrap().unwrap();
        assert_eq!(first.last_sha, "aaa");

        store.upsert("node", "bbb").await.unwrap();
        let second = store.get("node").await.unwrap().unwrap();
        assert_eq!(second.last_sha, "bbb");
        assert!(second.last_sync_at >= first.last_sync_at);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_timestamp_never_moves_backwards() {
        let store = StateStore::open_in_memory().await.unwrap();
        let future = "2999-01-01T00:00:00.000000Z";
        sqlx::query("INSERT INTO repos (name, last_sha, last_sync_at) VALUES ('node', 'old', ?1)")
            .bind(future)
            .execute(store.pool())
            .await
            .unwrap();

        store.upsert("node", "new").await.unwrap();
        let record = store.get("node").await.unwrap().unwrap();
        assert_eq!(record.last_sha, "new");
        assert_eq!(format_timestamp(record.last_sync_at), future);
    }

    #[tokio::test]
    async fn test_reads_legacy_rows() {
        let store = StateStore::open_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO repos (name, last_sha, last_sync_at) VALUES ('legacy', 'abc', '2024-05-01T10:20:30.123456')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let record = store.get("legacy").await.unwrap().unwrap();
        assert_eq!(record.last_sha, "abc");
        assert_eq!(
            format_timestamp(record.last_sync_at),
            "2024-05-01T10:20:30.123456Z"
        );
    }

    #[tokio::test]
    async fn test_state_persists_across_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join(".mirror_state.sqlite");

        {
            let store = StateStore::open(&path).await.unwrap();
            store.upsert("a", "111").await.unwrap();
            store.close().await;
        }

        let store = StateStore::open(&path).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().unwrap().last_sha, "111");
    }

    #[test]
    fn test_format_timestamp_is_fixed_width() {
        let a = format_timestamp(DateTime::from_timestamp(0, 0).unwrap());
        let b = format_timestamp(Utc::now());
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }
}
