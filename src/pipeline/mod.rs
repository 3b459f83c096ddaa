// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod orchestrator;
mod progress;
mod protections;

pub use orchestrator::{MirrorOrchestrator, RunOptions};
pub use progress::{ProgressTracker, RunStats};
pub use protections::{NoopProtections, ProtectionHook};
