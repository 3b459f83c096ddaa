// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod credential;
pub mod report;
pub mod repository;
pub mod sync_record;

pub use credential::Credential;
pub use report::{Outcome, PairOutcome, RunReport, SkipReason};
pub use repository::{Destination, Repository};
pub use sync_record::SyncRecord;
