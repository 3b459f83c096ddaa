// file: src/repository/mod.rs
// description: Repository operations module exports
// reference: Internal module structure

pub mod command;
pub mod lister;
pub mod transfer;

pub use command::{AuthenticatedUrl, CommandOutput, CommandRunner, GitCommand, GitVerb, ProcessRunner};
pub use lister::{GitHubLister, RepositoryLister};
pub use transfer::{Transfer, TransferExecutor, TransferJob, TransferReport};
