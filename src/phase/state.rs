//! Execution records for phase runs.
//!
//! This module provides types for tracking what happened while a phase ran,
//! including individual stage outcomes and the per-phase summary.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::PhaseKind;

/// Result of executing a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Stage name
    pub stage: String,
    /// Position of the stage within its phase
    pub position: usize,
    /// Whether the stage completed successfully
    pub success: bool,
    /// Error message if the stage failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration of the stage execution
    #[serde(rename = "duration_ms", with = "duration_serde")]
    pub duration: Duration,
}

impl StageOutcome {
    /// Create a successful stage outcome.
    pub fn success(stage: &str, position: usize, duration: Duration) -> Self {
        Self {
            stage: stage.to_string(),
            position,
            success: true,
            error: None,
            duration,
        }
    }

    /// Create a failed stage outcome.
    pub fn failure(stage: &str, position: usize, error: &str, duration: Duration) -> Self {
        Self {
            stage: stage.to_string(),
            position,
            success: false,
            error: Some(error.to_string()),
            duration,
        }
    }
}

/// Summary of one phase run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase: PhaseKind,
    /// Total stages in the phase
    pub total_stages: usize,
    /// Outcomes of the stages that ran, in execution order
    #[serde(default)]
    pub stages: Vec<StageOutcome>,
    /// Total execution time of the phase
    #[serde(rename = "duration_ms", with = "duration_serde")]
    pub duration: Duration,
}

impl PhaseSummary {
    pub fn new(phase: PhaseKind, total_stages: usize) -> Self {
        Self {
            phase,
            total_stages,
            stages: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn add_outcome(&mut self, outcome: StageOutcome) {
        self.stages.push(outcome);
    }

    /// Number of stages that completed successfully.
    pub fn completed(&self) -> usize {
        self.stages.iter().filter(|s| s.success).count()
    }

    /// Number of stages that never ran because an earlier stage failed.
    pub fn skipped(&self) -> usize {
        self.total_stages - self.stages.len()
    }

    /// The failing stage, if any.
    pub fn failed_stage(&self) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| !s.success)
    }

    /// Check if every stage completed successfully.
    pub fn all_success(&self) -> bool {
        self.completed() == self.total_stages
    }

    /// Names of the stages that ran, in order.
    pub fn executed(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.stage.as_str()).collect()
    }
}

/// Tracks execution timing.
pub struct ExecutionTimer {
    start: Instant,
}

impl ExecutionTimer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Serde helpers for Duration serialization as milliseconds.
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_outcome_success() {
        let outcome = StageOutcome::success("ner", 1, Duration::from_millis(5));
        assert!(outcome.success);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_stage_outcome_failure() {
        let outcome = StageOutcome::failure("srl", 2, "no verbs", Duration::from_millis(1));
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("no verbs"));
    }

    #[test]
    fn test_phase_summary_counts() {
        let mut summary = PhaseSummary::new(PhaseKind::PreProcessing, 4);
        summary.add_outcome(StageOutcome::success("shallow-nlp", 0, Duration::ZERO));
        summary.add_outcome(StageOutcome::failure("ner", 1, "boom", Duration::ZERO));

        assert_eq!(summary.completed(), 1);
        assert_eq!(summary.skipped(), 2);
        assert!(!summary.all_success());
        assert_eq!(summary.failed_stage().unwrap().stage, "ner");
        assert_eq!(summary.executed(), vec!["shallow-nlp", "ner"]);
    }

    #[test]
    fn test_duration_serializes_as_millis() {
        let outcome = StageOutcome::success("wsd", 0, Duration::from_millis(1500));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["duration_ms"], 1500);
        let back: StageOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back.duration, Duration::from_millis(1500));
    }
}
