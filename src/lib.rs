// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod database;
pub mod error;
pub mod exporter;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod utils;

pub use config::{Config, PipelineConfig, ResolvedSettings, SourceConfig, TransferConfig};
pub use database::{SchemaManager, StateStore};
pub use error::{MirrorError, Result, TransferStage};
pub use exporter::JsonExporter;
pub use models::{
    Credential, Destination, Outcome, PairOutcome, Repository, RunReport, SkipReason, SyncRecord,
};
pub use pipeline::{MirrorOrchestrator, NoopProtections, ProtectionHook, RunOptions};
pub use repository::{
    CommandRunner, GitHubLister, ProcessRunner, RepositoryLister, Transfer, TransferExecutor,
};
