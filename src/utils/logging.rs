// file: src/utils/logging.rs
// description: Tracing subscriber initialization with text or json-lines output

use crate::error::{MirrorError, Result};
use colored::*;
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub format: LogFormat,
    pub verbose: bool,
    pub colored: bool,
    pub file: Option<PathBuf>,
}

pub fn init_logger(settings: &LogSettings) -> Result<()> {
    let level = if settings.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let layer = build_layer::<Registry>(settings, make_writer(settings)?);

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| MirrorError::Configuration(format!("Failed to install logger: {}", e)))
}

/// Append-mode file when `settings.file` is set, stderr otherwise.
pub fn make_writer(settings: &LogSettings) -> Result<BoxMakeWriter> {
    Ok(match &settings.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    })
}

/// Formatting layer for `settings.format`. JSON output is one object per
/// line with event fields under `fields`.
pub fn build_layer<S>(
    settings: &LogSettings,
    writer: BoxMakeWriter,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    match settings.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .compact()
            .with_ansi(settings.colored && settings.file.is_none())
            .with_writer(writer)
            .boxed(),
    }
}

pub fn format_success(msg: &str) -> String {
    format!("{} {}", "✓".green().bold(), msg.green())
}

pub fn format_error(msg: &str) -> String {
    format!("{} {}", "✗".red().bold(), msg.red())
}

pub fn format_warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg.yellow())
}

pub fn format_info(msg: &str) -> String {
    format!("{} {}", "ℹ".blue().bold(), msg)
}

/// In-memory log sink for tests.
#[cfg(test)]
pub(crate) mod capture {
    use super::*;
    use std::io::{self, Write};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub(crate) struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedOutput {
        pub(crate) fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }

        /// Parses every captured line as one JSON record.
        pub(crate) fn json_records(&self) -> Vec<serde_json::Value> {
            self.text()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    pub(crate) fn subscriber(
        format: LogFormat,
    ) -> (CapturedOutput, impl tracing::Subscriber + Send + Sync) {
        let output = CapturedOutput::default();
        let writer = {
            let output = output.clone();
            BoxMakeWriter::new(move || output.clone())
        };
        let settings = LogSettings {
            format,
            ..LogSettings::default()
        };
        let subscriber =
            tracing_subscriber::registry().with(build_layer::<Registry>(&settings, writer));
        (output, subscriber)
    }
}

#[cfg(test)]
mod tests {
    use super::capture::{CapturedOutput, subscriber};
    use super::*;
    use tracing::warn;

    fn capture(format: LogFormat, emit: impl FnOnce()) -> CapturedOutput {
        let (output, subscriber) = subscriber(format);
        tracing::subscriber::with_default(subscriber, emit);
        output
    }

    #[test]
    fn test_json_format_writes_one_object_per_line() {
        let output = capture(LogFormat::Json, || {
            warn!(
                repository = "node",
                destination = "Strattice",
                error = "Mirror push failed (exit code 1): remote rejected",
                "Failed to mirror"
            );
            warn!(
                repository = "node",
                destination = "BrainstormOnline",
                "No token provided for destination; skipping"
            );
        });

        let records = output.json_records();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first["level"], "WARN");
        assert_eq!(first["fields"]["message"], "Failed to mirror");
        assert_eq!(first["fields"]["repository"], "node");
        assert_eq!(first["fields"]["destination"], "Strattice");
        assert_eq!(
            first["fields"]["error"],
            "Mirror push failed (exit code 1): remote rejected"
        );
        assert_eq!(records[1]["fields"]["destination"], "BrainstormOnline");
    }

    #[test]
    fn test_text_format_is_not_json() {
        let text = capture(LogFormat::Text, || {
            warn!(repository = "node", "Cloning");
        })
        .text();
        assert!(text.contains("repository=\"node\"") || text.contains("repository=node"));
        assert!(serde_json::from_str::<serde_json::Value>(text.trim()).is_err());
    }
}
