//! Typed error hierarchy for the synthflow orchestrator.
//!
//! Four enums cover the layers of a run:
//! - `UsageError`: invalid run configuration, raised before any pipeline state exists
//! - `StageError`: a single stage failed to initialize or execute
//! - `PhaseBuildError`: a phase's stage table is inconsistent
//! - `OrchestratorError`: run-level failures, wrapping the above with phase context

use thiserror::Error;

use crate::data::{Capability, InputKind};
use crate::orchestrator::RunState;
use crate::phase::PhaseKind;

/// Errors in the run configuration supplied by the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Please choose either mode 'text' or 'file' and provide either a string or a file path")]
    NoInput,

    #[error("The 'text' and 'file' modes are mutually exclusive")]
    ConflictingInputs,

    #[error("Input text is empty")]
    EmptyText,
}

/// Errors from a single stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Stage '{stage}' is missing required data: {field}")]
    MissingData { stage: String, field: String },

    #[error("Stage '{stage}' failed: {message}")]
    Execution { stage: String, message: String },

    #[error("Stage '{stage}' failed to initialize: {message}")]
    Initialization { stage: String, message: String },

    #[error("Stage '{stage}' was executed before initialization")]
    NotInitialized { stage: String },
}

impl StageError {
    pub fn missing(stage: &str, field: &str) -> Self {
        Self::MissingData {
            stage: stage.to_string(),
            field: field.to_string(),
        }
    }

    pub fn execution(stage: &str, message: impl Into<String>) -> Self {
        Self::Execution {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    pub fn initialization(stage: &str, message: impl Into<String>) -> Self {
        Self::Initialization {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Name of the stage that raised the error.
    pub fn stage(&self) -> &str {
        match self {
            Self::MissingData { stage, .. }
            | Self::Execution { stage, .. }
            | Self::Initialization { stage, .. }
            | Self::NotInitialized { stage } => stage,
        }
    }

    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData { .. })
    }
}

/// Errors detected while assembling a phase from its stage table.
#[derive(Debug, Error)]
pub enum PhaseBuildError {
    #[error("The {phase} phase has no stages")]
    Empty { phase: PhaseKind },

    #[error("Duplicate stage '{stage}' in the {phase} phase")]
    DuplicateStage { phase: PhaseKind, stage: String },

    #[error(
        "Stage '{stage}' in the {phase} phase requires '{capability}', which no earlier stage provides"
    )]
    UnsatisfiedRequirement {
        phase: PhaseKind,
        stage: String,
        capability: Capability,
    },

    #[error("The {phase} phase does not provide '{capability}' for the next phase")]
    MissingHandOff {
        phase: PhaseKind,
        capability: Capability,
    },
}

/// Errors from the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Pipeline construction failed: {0}")]
    Construction(#[from] PhaseBuildError),

    #[error("Initialization of the {phase} phase failed: {source}")]
    Initialization {
        phase: PhaseKind,
        #[source]
        source: StageError,
    },

    #[error("The {phase} phase failed: {source}")]
    Phase {
        phase: PhaseKind,
        #[source]
        source: StageError,
    },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("Pipeline was built for {expected} input but received {actual} input")]
    InputMismatch {
        expected: InputKind,
        actual: InputKind,
    },
}

impl OrchestratorError {
    /// The stage error behind a phase failure, if any.
    pub fn stage_error(&self) -> Option<&StageError> {
        match self {
            Self::Initialization { source, .. } | Self::Phase { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_missing_data_names_stage_and_field() {
        let err = StageError::missing("coref-analyzer", "context");
        assert!(err.is_missing_data());
        assert_eq!(err.stage(), "coref-analyzer");
        let msg = err.to_string();
        assert!(msg.contains("coref-analyzer"));
        assert!(msg.contains("context"));
    }

    #[test]
    fn stage_error_execution_is_not_missing_data() {
        let err = StageError::execution("transcription", "not a FLAC file");
        assert!(!err.is_missing_data());
        assert!(err.to_string().contains("not a FLAC file"));
    }

    #[test]
    fn phase_build_error_mentions_capability() {
        let err = PhaseBuildError::UnsatisfiedRequirement {
            phase: PhaseKind::AgentAnalysis,
            stage: "coref-analyzer".into(),
            capability: Capability::Context,
        };
        let msg = err.to_string();
        assert!(msg.contains("coref-analyzer"));
        assert!(msg.contains("context"));
        assert!(msg.contains("agent-analysis"));
    }

    #[test]
    fn orchestrator_error_exposes_stage_error() {
        let err = OrchestratorError::Phase {
            phase: PhaseKind::PreProcessing,
            source: StageError::execution("ner", "boom"),
        };
        match err.stage_error() {
            Some(StageError::Execution { stage, .. }) => assert_eq!(stage, "ner"),
            other => panic!("Expected Execution, got {:?}", other),
        }
    }

    #[test]
    fn orchestrator_error_converts_from_phase_build_error() {
        let inner = PhaseBuildError::Empty {
            phase: PhaseKind::PostProcessing,
        };
        let err: OrchestratorError = inner.into();
        assert!(matches!(
            err,
            OrchestratorError::Construction(PhaseBuildError::Empty { .. })
        ));
        assert!(err.stage_error().is_none());
    }

    #[test]
    fn usage_errors_are_distinct() {
        assert_ne!(UsageError::NoInput, UsageError::ConflictingInputs);
        assert!(UsageError::NoInput.to_string().contains("'text' or 'file'"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&UsageError::EmptyText);
        assert_std_error(&StageError::NotInitialized { stage: "x".into() });
        assert_std_error(&PhaseBuildError::Empty {
            phase: PhaseKind::PreProcessing,
        });
        assert_std_error(&OrchestratorError::InputMismatch {
            expected: InputKind::Text,
            actual: InputKind::Audio,
        });
    }
}
