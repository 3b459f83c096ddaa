// file: src/models/sync_record.rs
// description: persisted per-repository mirror marker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub repo_name: String,
    pub last_sha: String,
    pub last_sync_at: DateTime<Utc>,
}

impl SyncRecord {
    /// Conservative drift check: only an identical, known head counts as
    /// unchanged.
    pub fn matches_head(&self, head: &str) -> bool {
        !self.last_sha.is_empty() && self.last_sha == head
    }
}
