// file: src/config.rs
// description: application configuration management with toml and environment support
// reference: https://docs.rs/config

use crate::error::{MirrorError, Result};
use crate::models::{Credential, Destination};
use crate::utils::{LogFormat, Validator};
use dotenvy::dotenv;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const DEFAULT_STATE_PATH: &str = ".mirror_state.sqlite";
pub const ENV_PREFIX: &str = "ORG_MIRROR";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub destinations: Vec<DestinationConfig>,
    pub state: StateConfig,
    pub transfer: TransferConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub organization: Option<String>,
    pub organization_env: Option<String>,
    pub token: Option<Credential>,
    pub token_env: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    pub organization: String,
    #[serde(default)]
    pub organization_env: Option<String>,
    #[serde(default)]
    pub token: Option<Credential>,
    #[serde(default)]
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub scratch_dir: PathBuf,
    pub git_binary: String,
    pub git_host: String,
    pub timeout_secs: u64,
    pub prune: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub parallel_workers: usize,
    pub skip_unchanged: bool,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    pub verbose: bool,
}

/// Source and destination values after environment bindings have been
/// read. Produced once per run.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub source_org: Option<String>,
    pub source_credential: Option<Credential>,
    pub destinations: Vec<Destination>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            organization: None,
            organization_env: Some("SRC_ORG".to_string()),
            token: None,
            token_env: Some("SRC_GH_TOKEN".to_string()),
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl DestinationConfig {
    fn from_env_names(organization: &str, organization_env: &str, token_env: &str) -> Self {
        Self {
            organization: organization.to_string(),
            organization_env: Some(organization_env.to_string()),
            token: None,
            token_env: Some(token_env.to_string()),
        }
    }

    fn resolve(&self, lookup: &impl Fn(&str) -> Option<String>) -> Destination {
        let organization = self
            .organization_env
            .as_deref()
            .and_then(lookup)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.organization.clone());

        let credential = resolve_credential(self.token.as_ref(), self.token_env.as_deref(), lookup);

        Destination::new(organization, credential)
    }
}

/// An explicit token wins over its environment binding. Blank values count
/// as absent on both paths.
fn resolve_credential(
    explicit: Option<&Credential>,
    token_env: Option<&str>,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Option<Credential> {
    explicit
        .and_then(|token| Credential::from_optional(Some(token.expose().to_string())))
        .or_else(|| Credential::from_optional(token_env.and_then(lookup)))
}

fn default_destinations() -> Vec<DestinationConfig> {
    vec![
        DestinationConfig::from_env_names("Strattice", "DST_STRAT_ORG", "DST_STRAT_TOKEN"),
        DestinationConfig::from_env_names("BrainstormOnline", "DST_BRAIN_ORG", "DST_BRAIN_TOKEN"),
        DestinationConfig::from_env_names("BlockDAG-Engineering", "DST_ENG_ORG", "DST_ENG_TOKEN"),
    ]
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            git_binary: "git".to_string(),
            git_host: "github.com".to_string(),
            timeout_secs: 3600,
            prune: true,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 1,
            skip_unchanged: false,
            show_progress: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| MirrorError::Configuration(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| MirrorError::Configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            source: SourceConfig::default(),
            destinations: default_destinations(),
            state: StateConfig::default(),
            transfer: TransferConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.parallel_workers == 0 {
            return Err(MirrorError::Configuration(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.transfer.timeout_secs == 0 {
            return Err(MirrorError::Configuration(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        for destination in &self.destinations {
            if destination.organization.trim().is_empty() {
                return Err(MirrorError::Configuration(
                    "destination organization must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Reads the process environment once and resolves every binding.
    pub fn resolve(&self) -> Result<ResolvedSettings> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolves bindings through `lookup`. Explicit values in the config
    /// win over environment bindings.
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<ResolvedSettings> {
        let source_org = self
            .source
            .organization
            .clone()
            .or_else(|| self.source.organization_env.as_deref().and_then(&lookup))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if let Some(org) = &source_org {
            Validator::validate_org_slug(org)?;
        }

        let source_credential = resolve_credential(
            self.source.token.as_ref(),
            self.source.token_env.as_deref(),
            &lookup,
        );

        let destinations: Vec<Destination> = self
            .destinations
            .iter()
            .map(|d| d.resolve(&lookup))
            .collect();

        for destination in &destinations {
            Validator::validate_org_slug(&destination.organization)?;
        }

        Ok(ResolvedSettings {
            source_org,
            source_credential,
            destinations,
        })
    }
}
