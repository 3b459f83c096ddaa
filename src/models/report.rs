// file: src/models/report.rs
// description: per-pair outcomes and the run report returned by the orchestrator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingCredential,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Mirrored { sha: Option<String> },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Mirrored { .. } => "mirrored",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Failed { .. } => "failed",
        }
    }

    pub fn is_mirrored(&self) -> bool {
        matches!(self, Outcome::Mirrored { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOutcome {
    pub repository: String,
    pub destination: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub source_organization: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub repositories: usize,
    pub destinations: usize,
    pub entries: Vec<PairOutcome>,
}

impl RunReport {
    pub fn mirrored(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_mirrored()).count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failed()).count()
    }

    pub fn outcome_for(&self, repository: &str, destination: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|e| e.repository == repository && e.destination == destination)
            .map(|e| &e.outcome)
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(entries: Vec<PairOutcome>) -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: Uuid::new_v4(),
            source_organization: "src".to_string(),
            started_at: now,
            finished_at: now,
            repositories: 1,
            destinations: entries.len(),
            entries,
        }
    }

    #[test]
    fn test_counters_and_lookup() {
        let report = report(vec![
            PairOutcome {
                repository: "a".into(),
                destination: "X".into(),
                outcome: Outcome::Mirrored { sha: Some("abc".into()) },
            },
            PairOutcome {
                repository: "a".into(),
                destination: "Y".into(),
                outcome: Outcome::Skipped {
                    reason: SkipReason::MissingCredential,
                },
            },
            PairOutcome {
                repository: "a".into(),
                destination: "Z".into(),
                outcome: Outcome::Failed { error: "boom".into() },
            },
        ]);

        assert_eq!(report.mirrored(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.outcome_for("a", "Y").unwrap().is_skipped());
        assert!(report.outcome_for("b", "X").is_none());
    }

    #[test]
    fn test_pair_outcome_serializes_flat() {
        let entry = PairOutcome {
            repository: "a".into(),
            destination: "Y".into(),
            outcome: Outcome::Skipped {
                reason: SkipReason::MissingCredential,
            },
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "repository": "a",
                "destination": "Y",
                "outcome": "skipped",
                "reason": "missing_credential"
            })
        );
    }
}
