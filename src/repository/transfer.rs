// file: src/repository/transfer.rs
// description: mirror clone + mirror push of one repository into one destination
// reference: https://git-scm.com/docs/git-push#Documentation/git-push.txt---mirror

use crate::config::TransferConfig;
use crate::error::{MirrorError, Result, TransferStage};
use crate::models::{Credential, Destination, Repository};
use crate::repository::command::{AuthenticatedUrl, CommandOutput, CommandRunner, GitCommand};
use crate::utils::Validator;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outputs of a successful transfer. Both command outputs are kept for
/// diagnostics even though they succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub head_sha: Option<String>,
    pub clone: CommandOutput,
    pub push: CommandOutput,
}

/// Seam between the orchestrator and the git transfer.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn mirror_transfer(
        &self,
        repo: &Repository,
        source_credential: &Credential,
        destination: &Destination,
    ) -> Result<TransferReport>;
}

/// One (repository, destination) transfer. Lives for a single clone+push
/// sequence.
#[derive(Debug)]
pub struct TransferJob<'a> {
    pub repo: &'a Repository,
    pub destination: &'a Destination,
    pub working_dir: PathBuf,
}

pub struct TransferExecutor {
    config: TransferConfig,
    runner: Arc<dyn CommandRunner>,
}

impl TransferExecutor {
    pub fn new(config: TransferConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Scratch path is deterministic on the repository name so a crashed
    /// run's leftovers are found and removed by the next attempt.
    pub fn scratch_path(&self, repo_name: &str) -> PathBuf {
        self.config.scratch_dir.join(format!("{}.git", repo_name))
    }

    pub fn destination_url(&self, destination: &Destination, repo_name: &str) -> String {
        format!(
            "https://{}/{}/{}.git",
            self.config.git_host, destination.organization, repo_name
        )
    }

    async fn execute(
        &self,
        job: &TransferJob<'_>,
        source_credential: &Credential,
        destination_credential: &Credential,
    ) -> Result<TransferReport> {
        let repo = job.repo;
        let source_url = AuthenticatedUrl::new(&repo.clone_url, source_credential)?;
        let destination_url = AuthenticatedUrl::new(
            &self.destination_url(job.destination, &repo.name),
            destination_credential,
        )?;

        info!(
            repository = %repo.name,
            destination = %job.destination.organization,
            "Cloning"
        );
        let clone = self
            .runner
            .run(&GitCommand::clone_mirror(
                &self.config.git_binary,
                source_url,
                &job.working_dir,
            ))
            .await?;
        check(TransferStage::Clone, &clone)?;

        let head_sha = self.runner.resolve_head(&job.working_dir).await?;
        debug!(repository = %repo.name, head = ?head_sha, "Resolved source HEAD");

        info!(
            repository = %repo.name,
            destination = %job.destination.organization,
            "Pushing"
        );
        let push = self
            .runner
            .run(&GitCommand::push_mirror(
                &self.config.git_binary,
                &job.working_dir,
                destination_url,
                self.config.prune,
            ))
            .await?;
        check(TransferStage::Push, &push)?;

        Ok(TransferReport {
            head_sha,
            clone,
            push,
        })
    }
}

#[async_trait]
impl Transfer for TransferExecutor {
    async fn mirror_transfer(
        &self,
        repo: &Repository,
        source_credential: &Credential,
        destination: &Destination,
    ) -> Result<TransferReport> {
        Validator::validate_repo_name(&repo.name)?;

        let destination_credential = destination.credential.as_ref().ok_or_else(|| {
            MirrorError::Configuration(format!(
                "No credential for destination {}",
                destination.organization
            ))
        })?;

        let job = TransferJob {
            repo,
            destination,
            working_dir: self.scratch_path(&repo.name),
        };

        remove_scratch(&job.working_dir).await?;

        let result = self
            .execute(&job, source_credential, destination_credential)
            .await;

        if let Err(e) = remove_scratch(&job.working_dir).await {
            warn!(
                repository = %repo.name,
                path = %job.working_dir.display(),
                error = %e,
                "Failed to remove scratch directory"
            );
            if result.is_ok() {
                return Err(e);
            }
        }

        result
    }
}

fn check(stage: TransferStage, output: &CommandOutput) -> Result<()> {
    if output.success() {
        return Ok(());
    }
    Err(MirrorError::Transfer {
        stage,
        exit_code: output.exit_code,
        stderr: output.stderr.trim().to_string(),
    })
}

async fn remove_scratch(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await?,
        Ok(_) => tokio::fs::remove_file(path).await?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    }
    debug!(path = %path.display(), "Removed scratch path");
    Ok(())
}
