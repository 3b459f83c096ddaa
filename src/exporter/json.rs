// file: src/exporter/json.rs
// description: json export of run reports and per-pair outcome lines

use crate::error::Result;
use crate::models::{PairOutcome, RunReport};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct OutcomeLine<'a> {
    run_id: Uuid,
    recorded_at: String,
    #[serde(flatten)]
    entry: &'a PairOutcome,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn report_path(&self, report: &RunReport) -> PathBuf {
        self.output_dir
            .join(format!("mirror-report-{}.json", report.run_id))
    }

    /// Writes the whole report as one JSON document.
    pub fn write_report(&self, report: &RunReport, pretty: bool) -> Result<PathBuf> {
        let path = self.report_path(report);
        let body = if pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        fs::write(&path, body)?;

        info!(path = %path.display(), entries = report.entries.len(), "Wrote run report");
        Ok(path)
    }

    /// Appends one JSON object per pair outcome to `outcomes.jsonl`.
    pub fn append_outcomes(&self, report: &RunReport) -> Result<PathBuf> {
        let path = self.output_dir.join("outcomes.jsonl");
        append_json_lines(
            &path,
            report.entries.iter().map(|entry| OutcomeLine {
                run_id: report.run_id,
                recorded_at: Utc::now().to_rfc3339(),
                entry,
            }),
        )?;
        Ok(path)
    }
}

pub fn append_json_lines<T: Serialize>(
    path: &Path,
    records: impl IntoIterator<Item = T>,
) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for record in records {
        let line = serde_json::to_string(&record)?;
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Outcome, SkipReason};
    use tempfile::tempdir;

    fn sample_report() -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: Uuid::new_v4(),
            source_organization: "src".to_string(),
            started_at: now,
            finished_at: now,
            repositories: 1,
            destinations: 2,
            entries: vec![
                PairOutcome {
                    repository: "a".into(),
                    destination: "X".into(),
                    outcome: Outcome::Mirrored {
                        sha: Some("abc".into()),
                    },
                },
                PairOutcome {
                    repository: "a".into(),
                    destination: "Y".into(),
                    outcome: Outcome::Skipped {
                        reason: SkipReason::MissingCredential,
                    },
                },
            ],
        }
    }

    #[test]
    fn test_write_report_round_trips() {
        let dir = tempdir().unwrap();
        let exporter = JsonExporter::new(dir.path().join("reports")).unwrap();
        let report = sample_report();

        let path = exporter.write_report(&report, true).unwrap();
        let parsed: RunReport =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.run_id, report.run_id);
        assert_eq!(parsed.entries, report.entries);
    }

    #[test]
    fn test_append_outcomes_writes_one_line_per_pair() {
        let dir = tempdir().unwrap();
        let exporter = JsonExporter::new(dir.path()).unwrap();
        let report = sample_report();

        exporter.append_outcomes(&report).unwrap();
        let path = exporter.append_outcomes(&report).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["repository"], "a");
        assert_eq!(lines[1]["outcome"], "skipped");
        assert_eq!(lines[1]["reason"], "missing_credential");
    }
}
