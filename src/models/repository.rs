// file: src/models/repository.rs
// description: source repositories and mirror destinations
// reference: https://docs.github.com/en/rest/repos/repos

use crate::models::Credential;
use serde::{Deserialize, Serialize};

/// Snapshot of one source repository, as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub clone_url: String,
    pub organization: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl Repository {
    pub fn new(
        name: impl Into<String>,
        clone_url: impl Into<String>,
        organization: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            clone_url: clone_url.into(),
            organization: organization.into(),
            default_branch: None,
        }
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }
}

/// A destination organization. A missing credential means every pair
/// for this destination is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub organization: String,
    pub credential: Option<Credential>,
}

impl Destination {
    pub fn new(organization: impl Into<String>, credential: Option<Credential>) -> Self {
        Self {
            organization: organization.into(),
            credential,
        }
    }
}
