use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::state::RunState;
use crate::data::{InputKind, PostPipelineData};
use crate::errors::OrchestratorError;
use crate::phase::{PhaseSummary, duration_serde};

/// Pass/fail record of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub input: InputKind,
    pub success: bool,
    pub final_state: RunState,
    /// Time spent initializing stages; not part of `duration`
    #[serde(rename = "init_duration_ms", with = "duration_serde")]
    pub init_duration: Duration,
    /// Wall-clock time of phase execution
    #[serde(rename = "duration_ms", with = "duration_serde")]
    pub duration: Duration,
    pub phases: Vec<PhaseSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
}

impl RunReport {
    pub fn new(input: InputKind) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            input,
            success: false,
            final_state: RunState::Created,
            init_duration: Duration::ZERO,
            duration: Duration::ZERO,
            phases: Vec::new(),
            error: None,
            failed_stage: None,
        }
    }

    /// Record a failure and the stage responsible, if one was.
    pub fn record_error(&mut self, err: &OrchestratorError) {
        self.success = false;
        self.error = Some(err.to_string());
        self.failed_stage = err.stage_error().map(|e| e.stage().to_string());
    }

    /// Total number of stages that ran across all phases.
    pub fn stages_run(&self) -> usize {
        self.phases.iter().map(|p| p.stages.len()).sum()
    }
}

/// Result of [`Orchestrator::run`](super::Orchestrator::run): the report plus
/// the final container on success.
pub struct RunOutcome {
    pub report: RunReport,
    pub result: Result<PostPipelineData, OrchestratorError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageError;
    use crate::phase::{PhaseKind, StageOutcome};

    #[test]
    fn test_report_serializes_durations_in_ms() {
        let mut report = RunReport::new(InputKind::Text);
        report.init_duration = Duration::from_millis(12);
        report.duration = Duration::from_millis(340);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["init_duration_ms"], 12);
        assert_eq!(json["duration_ms"], 340);
        assert_eq!(json["input"], "text");
        assert_eq!(json["final_state"], "created");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_record_error_names_failed_stage() {
        let mut report = RunReport::new(InputKind::Audio);
        report.record_error(&OrchestratorError::Phase {
            phase: PhaseKind::PreProcessing,
            source: StageError::execution("transcription", "not a FLAC file"),
        });
        assert!(!report.success);
        assert_eq!(report.failed_stage.as_deref(), Some("transcription"));
        assert!(report.error.unwrap().contains("not a FLAC file"));
    }

    #[test]
    fn test_stages_run_counts_all_phases() {
        let mut report = RunReport::new(InputKind::Text);
        for phase in PhaseKind::ALL {
            let mut summary = PhaseSummary::new(phase, 2);
            summary.add_outcome(StageOutcome::success("a", 0, Duration::ZERO));
            report.phases.push(summary);
        }
        assert_eq!(report.stages_run(), 3);
    }
}
