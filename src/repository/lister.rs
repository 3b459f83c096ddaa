// file: src/repository/lister.rs
// description: enumerates source organization repositories through the GitHub REST api
// reference: https://docs.github.com/en/rest/repos/repos#list-organization-repositories

use crate::error::{MirrorError, Result};
use crate::models::{Credential, Repository};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info};

const DEFAULT_PAGE_SIZE: usize = 100;
const USER_AGENT: &str = concat!("org-mirror/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait RepositoryLister: Send + Sync {
    async fn list_repositories(
        &self,
        source_org: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<Repository>>;

    /// Current head of the repository's default branch, used for the
    /// opt-in unchanged check. `None` when the catalog cannot tell.
    async fn head_revision(
        &self,
        repo: &Repository,
        credential: Option<&Credential>,
    ) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    name: String,
    clone_url: String,
    owner: GitHubOwner,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubCommit {
    sha: String,
}

pub struct GitHubLister {
    client: Client,
    api_url: String,
    page_size: usize,
}

impl GitHubLister {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", credential.expose()))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
    }

    async fn fetch_page(
        &self,
        source_org: &str,
        credential: &Credential,
        page: usize,
    ) -> Result<Vec<GitHubRepo>> {
        let url = format!("{}/orgs/{}/repos", self.api_url, source_org);
        debug!(organization = source_org, page, "Requesting repository page");

        let response = self
            .authorized(self.client.get(&url), credential)
            .query(&[
                ("per_page", self.page_size.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                MirrorError::Upstream(format!("Failed to send repository list request: {}", e))
            })?;

        let response = ensure_success(response, source_org).await?;

        response.json().await.map_err(|e| {
            MirrorError::Upstream(format!("Failed to parse repository list: {}", e))
        })
    }
}

async fn ensure_success(response: Response, subject: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(MirrorError::Upstream(format!(
        "GitHub request for {} failed with status {}: {}",
        subject,
        status,
        error_text.trim()
    )))
}

#[async_trait]
impl RepositoryLister for GitHubLister {
    async fn list_repositories(
        &self,
        source_org: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<Repository>> {
        let credential = credential.ok_or_else(|| {
            MirrorError::Authentication("No source credential configured".to_string())
        })?;

        let mut repositories = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.fetch_page(source_org, credential, page).await?;
            let short_page = batch.len() < self.page_size;

            repositories.extend(batch.into_iter().map(|r| Repository {
                name: r.name,
                clone_url: r.clone_url,
                organization: r.owner.login,
                default_branch: r.default_branch,
            }));

            if short_page {
                break;
            }
            page += 1;
        }

        info!(
            organization = source_org,
            count = repositories.len(),
            "Listed source repositories"
        );
        Ok(repositories)
    }

    async fn head_revision(
        &self,
        repo: &Repository,
        credential: Option<&Credential>,
    ) -> Result<Option<String>> {
        let credential = credential.ok_or_else(|| {
            MirrorError::Authentication("No source credential configured".to_string())
        })?;

        let reference = repo.default_branch.as_deref().unwrap_or("HEAD");
        let url = format!(
            "{}/repos/{}/{}/commits/{}",
            self.api_url, repo.organization, repo.name, reference
        );

        let response = self
            .authorized(self.client.get(&url), credential)
            .send()
            .await
            .map_err(|e| MirrorError::Upstream(format!("Failed to query head commit: {}", e)))?;

        // empty repositories answer 409
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(None);
        }

        let response = ensure_success(response, &repo.name).await?;
        let commit: GitHubCommit = response
            .json()
            .await
            .map_err(|e| MirrorError::Upstream(format!("Failed to parse head commit: {}", e)))?;

        Ok(Some(commit.sha))
    }
}
