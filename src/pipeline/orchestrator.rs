// file: src/pipeline/orchestrator.rs
// description: fans every source repository out to every destination with per-pair failure isolation
// reference: orchestrates the asynchronous mirror workflow

use crate::config::{Config, PipelineConfig};
use crate::database::StateStore;
use crate::error::{MirrorError, Result};
use crate::models::{
    Credential, Destination, Outcome, PairOutcome, Repository, RunReport, SkipReason,
};
use crate::pipeline::progress::{ProgressTracker, RunStats};
use crate::pipeline::protections::{NoopProtections, ProtectionHook};
use crate::repository::{GitHubLister, ProcessRunner, RepositoryLister, Transfer, TransferExecutor};
use crate::utils::Validator;
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Repositories mirrored concurrently. Destinations of one repository
    /// are always processed in order, one at a time.
    pub parallel_workers: usize,
    pub skip_unchanged: bool,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallel_workers: 1,
            skip_unchanged: false,
            show_progress: false,
        }
    }
}

impl From<&PipelineConfig> for RunOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            parallel_workers: config.parallel_workers,
            skip_unchanged: config.skip_unchanged,
            show_progress: config.show_progress,
        }
    }
}

pub struct MirrorOrchestrator {
    lister: Arc<dyn RepositoryLister>,
    transfer: Arc<dyn Transfer>,
    store: StateStore,
    protections: Arc<dyn ProtectionHook>,
    options: RunOptions,
}

impl MirrorOrchestrator {
    pub fn new(
        lister: Arc<dyn RepositoryLister>,
        transfer: Arc<dyn Transfer>,
        store: StateStore,
        options: RunOptions,
    ) -> Self {
        Self {
            lister,
            transfer,
            store,
            protections: Arc::new(NoopProtections),
            options,
        }
    }

    /// Wires the GitHub lister and the git-process transfer from `config`.
    pub fn from_config(config: &Config, store: StateStore) -> Self {
        let runner = Arc::new(ProcessRunner::new(Duration::from_secs(
            config.transfer.timeout_secs,
        )));
        Self::new(
            Arc::new(GitHubLister::new(config.source.api_url.clone())),
            Arc::new(TransferExecutor::new(config.transfer.clone(), runner)),
            store,
            RunOptions::from(&config.pipeline),
        )
    }

    pub fn with_protections(mut self, protections: Arc<dyn ProtectionHook>) -> Self {
        self.protections = protections;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Mirrors every repository of `source_org` to every destination.
    ///
    /// Fails when configuration is missing, the repository listing fails,
    /// or a transfer surfaces a fatal error kind. Every other per-pair
    /// problem is reported as an outcome instead.
    pub async fn run(
        &self,
        source_org: Option<&str>,
        source_credential: Option<&Credential>,
        destinations: &[Destination],
    ) -> Result<RunReport> {
        let source_org = source_org
            .map(str::trim)
            .filter(|org| !org.is_empty())
            .ok_or_else(|| {
                MirrorError::Configuration("Source organization is not configured".to_string())
            })?;
        Validator::validate_org_slug(source_org)?;

        let source_credential = source_credential.ok_or_else(|| {
            MirrorError::Configuration("Source credential is not configured".to_string())
        })?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, organization = source_org, "Starting mirror run");

        let repositories = self
            .lister
            .list_repositories(source_org, Some(source_credential))
            .await?;

        if repositories.is_empty() {
            warn!(organization = source_org, "No repositories found");
        }

        let progress = ProgressTracker::new(
            repositories.len() * destinations.len(),
            self.options.show_progress,
        );

        let workers = self.options.parallel_workers.max(1);
        let per_repository: Vec<Vec<PairOutcome>> = stream::iter(
            repositories
                .iter()
                .map(|repo| self.mirror_repository(repo, source_credential, destinations, &progress)),
        )
        .buffered(workers)
        .try_collect()
        .await?;

        let stats = progress.get_stats();
        progress.finish();

        let report = RunReport {
            run_id,
            source_organization: source_org.to_string(),
            started_at,
            finished_at: Utc::now(),
            repositories: repositories.len(),
            destinations: destinations.len(),
            entries: per_repository.into_iter().flatten().collect(),
        };

        self.log_final_stats(&report, &stats);
        Ok(report)
    }

    /// Runs [`run`](Self::run) on a private current-thread runtime. Must
    /// not be called from inside an async context.
    pub fn run_blocking(
        &self,
        source_org: Option<&str>,
        source_credential: Option<&Credential>,
        destinations: &[Destination],
    ) -> Result<RunReport> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run(source_org, source_credential, destinations))
    }

    async fn mirror_repository(
        &self,
        repo: &Repository,
        source_credential: &Credential,
        destinations: &[Destination],
        progress: &ProgressTracker,
    ) -> Result<Vec<PairOutcome>> {
        let recorded_head = if self.options.skip_unchanged {
            self.unchanged_head(repo, source_credential).await
        } else {
            None
        };

        let mut outcomes = Vec::with_capacity(destinations.len());
        for destination in destinations {
            let outcome = match &destination.credential {
                None => {
                    warn!(
                        repository = %repo.name,
                        destination = %destination.organization,
                        "No token provided for destination; skipping"
                    );
                    Outcome::Skipped {
                        reason: SkipReason::MissingCredential,
                    }
                }
                Some(credential) => {
                    let unchanged = match recorded_head.as_deref() {
                        Some(head) => {
                            self.destination_at(repo, destination, credential, head)
                                .await
                        }
                        None => false,
                    };

                    if unchanged {
                        info!(
                            repository = %repo.name,
                            destination = %destination.organization,
                            "Upstream head unchanged since last sync; skipping"
                        );
                        Outcome::Skipped {
                            reason: SkipReason::Unchanged,
                        }
                    } else {
                        self.mirror_pair(
                            repo,
                            source_credential,
                            destination,
                            !self.options.skip_unchanged,
                        )
                        .await?
                    }
                }
            };

            outcomes.push(PairOutcome {
                repository: repo.name.clone(),
                destination: destination.organization.clone(),
                outcome,
            });
        }

        if self.options.skip_unchanged {
            self.record_if_complete(repo, recorded_head.as_deref(), &mut outcomes)
                .await;
        }

        for entry in &outcomes {
            progress.record(&entry.repository, &entry.destination, &entry.outcome);
        }
        Ok(outcomes)
    }

    /// Transfers one pair. `record_state` writes the sync record as soon as
    /// the push succeeds; skip mode defers it to [`record_if_complete`].
    ///
    /// [`record_if_complete`]: Self::record_if_complete
    async fn mirror_pair(
        &self,
        repo: &Repository,
        source_credential: &Credential,
        destination: &Destination,
        record_state: bool,
    ) -> Result<Outcome> {
        let report = match self
            .transfer
            .mirror_transfer(repo, source_credential, destination)
            .await
        {
            Ok(report) => report,
            Err(e) if e.is_fatal() => {
                error!(
                    repository = %repo.name,
                    destination = %destination.organization,
                    error = %e,
                    "Fatal error while mirroring; aborting run"
                );
                return Err(e);
            }
            Err(e) => {
                error!(
                    repository = %repo.name,
                    destination = %destination.organization,
                    error = %e,
                    "Failed to mirror"
                );
                return Ok(Outcome::Failed {
                    error: e.to_string(),
                });
            }
        };

        let sha = report.head_sha.clone().unwrap_or_default();
        if record_state {
            if let Err(e) = self.store.upsert(&repo.name, &sha).await {
                error!(
                    repository = %repo.name,
                    destination = %destination.organization,
                    error = %e,
                    "Mirrored but failed to record sync state"
                );
                return Ok(Outcome::Failed {
                    error: unrecorded(&e),
                });
            }
        }

        if let Err(e) = self.protections.apply_protections(repo, destination).await {
            warn!(
                repository = %repo.name,
                destination = %destination.organization,
                error = %e,
                "Branch protection hook failed"
            );
        }

        info!(
            repository = %repo.name,
            destination = %destination.organization,
            sha = %sha,
            "Mirrored"
        );
        Ok(Outcome::Mirrored {
            sha: report.head_sha,
        })
    }

    /// Writes the sync record only when every credentialed destination of
    /// `repo` now holds one revision. Any failed pair leaves the record
    /// untouched so the next run retries the whole repository.
    async fn record_if_complete(
        &self,
        repo: &Repository,
        recorded_head: Option<&str>,
        outcomes: &mut [PairOutcome],
    ) {
        let mut revisions: Vec<&str> = Vec::new();
        let mut mirrored = false;
        for entry in outcomes.iter() {
            match &entry.outcome {
                Outcome::Mirrored { sha } => {
                    mirrored = true;
                    revisions.push(sha.as_deref().unwrap_or_default());
                }
                Outcome::Skipped {
                    reason: SkipReason::Unchanged,
                } => revisions.extend(recorded_head),
                Outcome::Skipped { .. } => {}
                Outcome::Failed { .. } => {
                    debug!(repository = %repo.name, "Pair failed; sync state not recorded");
                    return;
                }
            }
        }

        if !mirrored {
            return;
        }
        let Some(sha) = revisions.first().map(|s| s.to_string()) else {
            return;
        };
        if revisions.iter().any(|r| *r != sha) {
            debug!(
                repository = %repo.name,
                "Destinations hold different revisions; sync state not recorded"
            );
            return;
        }

        if let Err(e) = self.store.upsert(&repo.name, &sha).await {
            error!(
                repository = %repo.name,
                error = %e,
                "Mirrored but failed to record sync state"
            );
            for entry in outcomes
                .iter_mut()
                .filter(|entry| entry.outcome.is_mirrored())
            {
                entry.outcome = Outcome::Failed {
                    error: unrecorded(&e),
                };
            }
        }
    }

    /// Returns the stored revision when it equals the known upstream head.
    /// Lookup errors and missing records never count as unchanged.
    async fn unchanged_head(
        &self,
        repo: &Repository,
        source_credential: &Credential,
    ) -> Option<String> {
        let record = match self.store.get(&repo.name).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                debug!(repository = %repo.name, error = %e, "State lookup failed");
                return None;
            }
        };

        match self
            .lister
            .head_revision(repo, Some(source_credential))
            .await
        {
            Ok(Some(head)) if record.matches_head(&head) => Some(head),
            Ok(_) => None,
            Err(e) => {
                debug!(repository = %repo.name, error = %e, "Upstream head lookup failed");
                None
            }
        }
    }

    /// Whether the destination copy of `repo` already points at `head`.
    async fn destination_at(
        &self,
        repo: &Repository,
        destination: &Destination,
        credential: &Credential,
        head: &str,
    ) -> bool {
        let mirrored = Repository {
            organization: destination.organization.clone(),
            ..repo.clone()
        };

        match self.lister.head_revision(&mirrored, Some(credential)).await {
            Ok(Some(current)) => current == head,
            Ok(None) => false,
            Err(e) => {
                debug!(
                    repository = %repo.name,
                    destination = %destination.organization,
                    error = %e,
                    "Destination head lookup failed"
                );
                false
            }
        }
    }

    fn log_final_stats(&self, report: &RunReport, stats: &RunStats) {
        info!(
            run_id = %report.run_id,
            repositories = report.repositories,
            destinations = report.destinations,
            mirrored = stats.mirrored,
            skipped = stats.skipped,
            failed = stats.failed,
            duration_secs = report.duration_secs(),
            "Mirror run finished"
        );
        if stats.failed > 0 {
            warn!(
                failed = stats.failed,
                success_rate = stats.success_rate(),
                "Some pairs failed; re-run to retry"
            );
        }
    }
}

fn unrecorded(e: &MirrorError) -> String {
    format!("mirrored but failed to record sync state: {}", e)
}
