// file: src/pipeline/protections.rs
// description: extension point invoked after a successful mirror

use crate::error::Result;
use crate::models::{Destination, Repository};
use async_trait::async_trait;
use tracing::trace;

/// Called after each successful (repository, destination) mirror, e.g. to
/// configure branch protection on the destination. Failures are logged by
/// the orchestrator and never change the pair's outcome.
#[async_trait]
pub trait ProtectionHook: Send + Sync {
    async fn apply_protections(&self, repo: &Repository, destination: &Destination) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProtections;

#[async_trait]
impl ProtectionHook for NoopProtections {
    async fn apply_protections(&self, repo: &Repository, destination: &Destination) -> Result<()> {
        trace!(
            repository = %repo.name,
            destination = %destination.organization,
            "No branch protections configured"
        );
        Ok(())
    }
}
