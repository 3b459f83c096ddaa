// file: src/repository/command.rs
// description: typed git command builder and the process boundary that runs it
// reference: https://docs.rs/tokio/latest/tokio/process

use crate::error::{MirrorError, Result};
use crate::models::Credential;
use crate::utils::redact::{REDACTED, redact_url_userinfo};
use crate::utils::Validator;
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// A remote URL with a token embedded in its userinfo. `Display` never
/// shows the token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedUrl {
    url: String,
    redacted: String,
}

impl AuthenticatedUrl {
    /// Embeds `credential` after the transport prefix of `url`.
    pub fn new(url: &str, credential: &Credential) -> Result<Self> {
        Validator::validate_url(url)?;

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| MirrorError::InvalidUrl(format!("missing scheme: {}", url)))?;

        // drop any userinfo already present in the url
        let rest = match rest.split_once('/') {
            Some((authority, path)) => match authority.rsplit_once('@') {
                Some((_, host)) => format!("{}/{}", host, path),
                None => rest.to_string(),
            },
            None => rest.rsplit_once('@').map(|(_, h)| h).unwrap_or(rest).to_string(),
        };

        Ok(Self {
            url: format!("{}://{}@{}", scheme, credential.expose(), rest),
            redacted: format!("{}://{}@{}", scheme, REDACTED, rest),
        })
    }

    pub fn expose(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for AuthenticatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

impl fmt::Debug for AuthenticatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthenticatedUrl({})", self.redacted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitVerb {
    /// `git clone --mirror <source> <target>`
    CloneMirror {
        source: AuthenticatedUrl,
        target: PathBuf,
    },
    /// `git --git-dir <git_dir> push --mirror [--prune] <destination>`
    PushMirror {
        git_dir: PathBuf,
        destination: AuthenticatedUrl,
        prune: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    pub program: String,
    pub verb: GitVerb,
}

impl GitCommand {
    pub fn clone_mirror(program: &str, source: AuthenticatedUrl, target: &Path) -> Self {
        Self {
            program: program.to_string(),
            verb: GitVerb::CloneMirror {
                source,
                target: target.to_path_buf(),
            },
        }
    }

    pub fn push_mirror(
        program: &str,
        git_dir: &Path,
        destination: AuthenticatedUrl,
        prune: bool,
    ) -> Self {
        Self {
            program: program.to_string(),
            verb: GitVerb::PushMirror {
                git_dir: git_dir.to_path_buf(),
                destination,
                prune,
            },
        }
    }

    /// The real argv, credentials included. Never log this.
    pub fn args(&self) -> Vec<OsString> {
        match &self.verb {
            GitVerb::CloneMirror { source, target } => vec![
                "clone".into(),
                "--mirror".into(),
                source.expose().into(),
                target.as_os_str().to_os_string(),
            ],
            GitVerb::PushMirror {
                git_dir,
                destination,
                prune,
            } => {
                let mut args: Vec<OsString> = vec![
                    "--git-dir".into(),
                    git_dir.as_os_str().to_os_string(),
                    "push".into(),
                    "--mirror".into(),
                ];
                if *prune {
                    args.push("--prune".into());
                }
                args.push(destination.expose().into());
                args
            }
        }
    }

    pub fn secrets(&self) -> Vec<&str> {
        let url = match &self.verb {
            GitVerb::CloneMirror { source, .. } => source,
            GitVerb::PushMirror { destination, .. } => destination,
        };
        url.expose()
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('@'))
            .map(|(secret, _)| vec![secret])
            .unwrap_or_default()
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verb {
            GitVerb::CloneMirror { source, target } => write!(
                f,
                "{} clone --mirror {} {}",
                self.program,
                source,
                target.display()
            ),
            GitVerb::PushMirror {
                git_dir,
                destination,
                prune,
            } => write!(
                f,
                "{} --git-dir {} push --mirror{} {}",
                self.program,
                git_dir.display(),
                if *prune { " --prune" } else { "" },
                destination
            ),
        }
    }
}

/// Captured result of one external git invocation. `exit_code` is `None`
/// when the process was killed by a signal or timed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn redacted(self, secrets: &[&str]) -> Self {
        Self {
            exit_code: self.exit_code,
            stdout: crate::utils::redact(&self.stdout, secrets),
            stderr: crate::utils::redact(&self.stderr, secrets),
        }
    }
}

/// Process boundary used by the transfer executor. Tests substitute a
/// fake that records commands instead of spawning git.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &GitCommand) -> Result<CommandOutput>;

    /// Commit id HEAD points at in a bare repository, `None` when HEAD is
    /// unborn.
    async fn resolve_head(&self, git_dir: &Path) -> Result<Option<String>>;
}

pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &GitCommand) -> Result<CommandOutput> {
        debug!(command = %command, "Running git");

        let child = Command::new(&command.program)
            .args(command.args())
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Ok(CommandOutput {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: format!("timed out after {}s", self.timeout.as_secs()),
                });
            }
        };

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .redacted(&command.secrets()))
    }

    async fn resolve_head(&self, git_dir: &Path) -> Result<Option<String>> {
        let git_dir = git_dir.to_path_buf();
        tokio::task::spawn_blocking(move || read_head(&git_dir))
            .await
            .map_err(|e| MirrorError::Git(format!("HEAD lookup task failed: {}", e)))?
    }
}

fn read_head(git_dir: &Path) -> Result<Option<String>> {
    let repo = gix::open(git_dir).map_err(|e| {
        MirrorError::Git(format!(
            "Failed to open {}: {}",
            git_dir.display(),
            redact_url_userinfo(&e.to_string())
        ))
    })?;

    let head = repo
        .head()
        .map_err(|e| MirrorError::Git(format!("Failed to read HEAD: {}", e)))?;

    Ok(head.id().map(|id| id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token() -> Credential {
        Credential::new("ghp_secret")
    }

    #[test]
    fn test_authenticated_url_embeds_token() {
        let url = AuthenticatedUrl::new("https://github.com/src/repo.git", &token()).unwrap();
        assert_eq!(url.expose(), "https://ghp_secret@github.com/src/repo.git");
        assert_eq!(url.to_string(), "https://***@github.com/src/repo.git");
        assert!(!format!("{:?}", url).contains("ghp_secret"));
    }

    #[test]
    fn test_authenticated_url_replaces_existing_userinfo() {
        let url = AuthenticatedUrl::new("https://old@github.com/src/repo.git", &token()).unwrap();
        assert_eq!(url.expose(), "https://ghp_secret@github.com/src/repo.git");
    }

    #[test]
    fn test_authenticated_url_rejects_ssh() {
        let err = AuthenticatedUrl::new("git@github.com:src/repo.git", &token()).unwrap_err();
        assert!(matches!(err, MirrorError::InvalidUrl(_)));
    }

    #[test]
    fn test_clone_args() {
        let source = AuthenticatedUrl::new("https://github.com/src/a.git", &token()).unwrap();
        let cmd = GitCommand::clone_mirror("git", source, Path::new("/tmp/a.git"));
        let args: Vec<String> = cmd
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "clone",
                "--mirror",
                "https://ghp_secret@github.com/src/a.git",
                "/tmp/a.git"
            ]
        );
        assert_eq!(
            cmd.to_string(),
            "git clone --mirror https://***@github.com/src/a.git /tmp/a.git"
        );
    }

    #[test]
    fn test_push_args_with_and_without_prune() {
        let dest = AuthenticatedUrl::new("https://github.com/X/a.git", &token()).unwrap();
        let cmd = GitCommand::push_mirror("git", Path::new("/tmp/a.git"), dest.clone(), true);
        let args: Vec<String> = cmd
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--git-dir",
                "/tmp/a.git",
                "push",
                "--mirror",
                "--prune",
                "https://ghp_secret@github.com/X/a.git"
            ]
        );
        assert_eq!(cmd.secrets(), vec!["ghp_secret"]);

        let no_prune = GitCommand::push_mirror("git", Path::new("/tmp/a.git"), dest, false);
        assert!(!no_prune.args().iter().any(|a| a == "--prune"));
    }

    #[test]
    fn test_output_redaction() {
        let output = CommandOutput {
            exit_code: Some(128),
            stdout: String::new(),
            stderr: "fatal: 'https://ghp_secret@github.com/X/a.git' not found".to_string(),
        }
        .redacted(&["ghp_secret"]);
        assert!(!output.success());
        assert_eq!(output.stderr, "fatal: 'https://***@github.com/X/a.git' not found");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_reports_exit_code() {
        let source = AuthenticatedUrl::new("https://github.com/src/a.git", &token()).unwrap();
        let runner = ProcessRunner::new(Duration::from_secs(10));

        let ok = runner
            .run(&GitCommand::clone_mirror("true", source.clone(), Path::new("/tmp/x")))
            .await
            .unwrap();
        assert!(ok.success());

        let failed = runner
            .run(&GitCommand::clone_mirror("false", source, Path::new("/tmp/x")))
            .await
            .unwrap();
        assert_eq!(failed.exit_code, Some(1));
    }

    #[cfg(unix)]
    fn hanging_git(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("hanging-git");
        std::fs::write(&path, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_times_out_and_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let git = hanging_git(dir.path());
        let source = AuthenticatedUrl::new("https://github.com/src/a.git", &token()).unwrap();
        let runner = ProcessRunner::new(Duration::from_secs(1));

        let started = std::time::Instant::now();
        let output = runner
            .run(&GitCommand::clone_mirror(
                &git.to_string_lossy(),
                source,
                &dir.path().join("a.git"),
            ))
            .await
            .unwrap();

        assert_eq!(output.exit_code, None);
        assert!(!output.success());
        assert_eq!(output.stderr, "timed out after 1s");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_process_runner_missing_binary_is_io_error() {
        let source = AuthenticatedUrl::new("https://github.com/src/a.git", &token()).unwrap();
        let runner = ProcessRunner::new(Duration::from_secs(10));
        let err = runner
            .run(&GitCommand::clone_mirror(
                "definitely-not-a-git-binary",
                source,
                Path::new("/tmp/x"),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, MirrorError::Io(_)));
    }

    #[tokio::test]
    async fn test_resolve_head_on_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(Duration::from_secs(10));
        let result = runner.resolve_head(&dir.path().join("nope.git")).await;
        assert!(matches!(result, Err(MirrorError::Git(_))));
    }
}
