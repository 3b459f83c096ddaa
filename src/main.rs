// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use org_mirror::utils::logging::{
    LogFormat, LogSettings, format_error, format_info, format_success, format_warning,
    init_logger,
};
use org_mirror::{
    Config, GitHubLister, JsonExporter, MirrorOrchestrator, Outcome, RepositoryLister,
    RunReport, SchemaManager, StateStore,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "org-mirror")]
#[command(version)]
#[command(about = "Mirror a GitHub organization into several destination organizations", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror every source repository to every destination
    Run {
        /// Skip repositories whose upstream head matches the recorded revision
        #[arg(long)]
        skip_unchanged: bool,

        #[arg(long, value_name = "NUM")]
        parallel: Option<usize>,

        /// Write a JSON report and append outcome lines into this directory
        #[arg(long, value_name = "DIR")]
        report_dir: Option<PathBuf>,

        #[arg(long)]
        pretty: bool,

        #[arg(long)]
        no_progress: bool,

        /// Exit with status 2 when any pair failed
        #[arg(long)]
        strict: bool,
    },

    /// List the source organization's repositories
    List,

    /// Show the recorded sync state of one repository
    Status { repo: String },

    /// Check the state store schema
    Verify {
        #[arg(long)]
        create_schema: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(Some(path.as_path()))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load(None).context("Failed to load configuration")?,
    };

    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    if cli.log_file.is_some() {
        config.logging.file = cli.log_file.clone();
    }

    init_logger(&LogSettings {
        format: config.logging.format,
        verbose: cli.verbose || config.logging.verbose,
        colored: cli.color,
        file: config.logging.file.clone(),
    })?;

    match cli.command {
        Commands::Run {
            skip_unchanged,
            parallel,
            report_dir,
            pretty,
            no_progress,
            strict,
        } => {
            if skip_unchanged {
                config.pipeline.skip_unchanged = true;
            }
            if let Some(parallel) = parallel {
                config.pipeline.parallel_workers = parallel;
            }
            if no_progress || config.logging.format == LogFormat::Json {
                config.pipeline.show_progress = false;
            }
            config.validate()?;

            let report = cmd_run(&config, report_dir, pretty).await?;
            if strict && report.failed() > 0 {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::List => cmd_list(&config).await?,
        Commands::Status { repo } => cmd_status(&config, &repo).await?,
        Commands::Verify { create_schema } => cmd_verify(&config, create_schema).await?,
    }

    Ok(ExitCode::SUCCESS)
}

async fn cmd_run(config: &Config, report_dir: Option<PathBuf>, pretty: bool) -> Result<RunReport> {
    let settings = config.resolve().context("Failed to resolve environment bindings")?;

    let store = StateStore::open(&config.state.path)
        .await
        .context("Failed to open state store")?;

    let orchestrator = MirrorOrchestrator::from_config(config, store);
    let report = orchestrator
        .run(
            settings.source_org.as_deref(),
            settings.source_credential.as_ref(),
            &settings.destinations,
        )
        .await
        .context("Mirror run aborted")?;

    print_report(&report);

    if let Some(dir) = report_dir {
        let exporter = JsonExporter::new(dir)?;
        let path = exporter.write_report(&report, pretty)?;
        exporter.append_outcomes(&report)?;
        println!("{}", format_info(&format!("Report written to {}", path.display())));
    }

    orchestrator.store().close().await;
    Ok(report)
}

fn print_report(report: &RunReport) {
    println!();
    for entry in &report.entries {
        let line = format!("{:<40} → {:<24}", entry.repository, entry.destination);
        match &entry.outcome {
            Outcome::Mirrored { sha } => println!(
                "{}",
                format_success(&format!(
                    "{} mirrored {}",
                    line,
                    sha.as_deref().unwrap_or("(empty)")
                ))
            ),
            Outcome::Skipped { reason } => {
                println!("{}", format_warning(&format!("{} skipped ({:?})", line, reason)))
            }
            Outcome::Failed { error } => {
                println!("{}", format_error(&format!("{} failed: {}", line, error)))
            }
        }
    }
    println!();
    println!(
        "{}",
        format_info(&format!(
            "{} repositories × {} destinations: {} mirrored, {} skipped, {} failed in {:.1}s",
            report.repositories,
            report.destinations,
            report.mirrored(),
            report.skipped(),
            report.failed(),
            report.duration_secs()
        ))
    );
}

async fn cmd_list(config: &Config) -> Result<()> {
    let settings = config.resolve()?;
    let org = settings
        .source_org
        .as_deref()
        .context("Source organization is not configured")?;

    let lister = GitHubLister::new(config.source.api_url.clone());
    let repos = lister
        .list_repositories(org, settings.source_credential.as_ref())
        .await
        .context("Failed to list repositories")?;

    for repo in &repos {
        println!("{}\t{}", repo.name, repo.clone_url);
    }
    info!("{} repositories in {}", repos.len(), org);
    Ok(())
}

async fn cmd_status(config: &Config, repo: &str) -> Result<()> {
    let store = StateStore::open(&config.state.path)
        .await
        .context("Failed to open state store")?;

    match store.get(repo).await? {
        Some(record) => {
            println!("repository:   {}", record.repo_name);
            println!("last sha:     {}", record.last_sha);
            println!("last sync at: {}", record.last_sync_at.to_rfc3339());
        }
        None => println!("{}", format_warning(&format!("No sync recorded for {}", repo))),
    }

    println!(
        "{}",
        format_info(&format!("{} repositories tracked", store.count().await?))
    );
    store.close().await;
    Ok(())
}

async fn cmd_verify(config: &Config, create_schema: bool) -> Result<()> {
    info!("Verifying state store schema");

    let store = StateStore::connect(&config.state.path)
        .await
        .context("Failed to open state store")?;
    let schema_manager = SchemaManager::new(&store);

    if schema_manager.verify_schema().await? {
        info!("Schema verification passed");
    } else if create_schema {
        schema_manager
            .initialize()
            .await
            .context("Failed to create schema")?;
        info!("Schema created successfully");
    } else {
        warn!("Schema is missing; use --create-schema to create it");
    }

    store.close().await;
    Ok(())
}
