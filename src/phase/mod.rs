//! Phase runner: strict, fail-fast sequencing of stages over one container type.
//!
//! The same primitive drives all three phases of a run:
//!
//! 1. **Builder** - assembles the ordered stage table and validates that every
//!    declared requirement is provided by the seed or by an earlier stage
//! 2. **Runner** - initializes the stages once, then executes them in order,
//!    handing each stage's output container to the next
//! 3. **State** - per-stage outcomes and the phase summary
//!
//! ## Example
//!
//! ```no_run
//! use synthflow::data::{Capability, InputSource, PrePipelineData};
//! use synthflow::phase::{NoopObserver, PhaseBuilder, PhaseKind};
//! use synthflow::settings::Settings;
//! use synthflow::stages::StageSet;
//!
//! # fn example() -> anyhow::Result<()> {
//! let stages = StageSet::standard(&Settings::default());
//! let mut runner = PhaseBuilder::new(PhaseKind::PreProcessing)
//!     .seed([Capability::MainHypothesis])
//!     .stages(stages.pre)
//!     .build()?;
//!
//! runner.initialize()?;
//! let data = PrePipelineData::new(InputSource::Text("close the gripper".into()));
//! let data = runner.run(data, &NoopObserver)?;
//! assert!(data.graph().is_some());
//! # Ok(())
//! # }
//! ```

mod state;

pub(crate) use state::duration_serde;
pub use state::{ExecutionTimer, PhaseSummary, StageOutcome};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, error, info};

use crate::data::{Annotated, Capability};
use crate::errors::{PhaseBuildError, StageError};
use crate::stage::{Stage, StageDescriptor};

/// The three phases of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseKind {
    PreProcessing,
    AgentAnalysis,
    PostProcessing,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 3] = [
        PhaseKind::PreProcessing,
        PhaseKind::AgentAnalysis,
        PhaseKind::PostProcessing,
    ];

    /// Human-readable label for terminal output.
    pub fn label(self) -> &'static str {
        match self {
            PhaseKind::PreProcessing => "Pre-processing",
            PhaseKind::AgentAnalysis => "Agent analysis",
            PhaseKind::PostProcessing => "Post-processing",
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::PreProcessing => write!(f, "pre-processing"),
            PhaseKind::AgentAnalysis => write!(f, "agent-analysis"),
            PhaseKind::PostProcessing => write!(f, "post-processing"),
        }
    }
}

/// Hooks called by the runner as stages start and finish.
///
/// All methods default to no-ops.
pub trait StageObserver {
    fn phase_started(&self, _phase: PhaseKind, _total_stages: usize) {}

    fn stage_started(&self, _phase: PhaseKind, _stage: &str, _position: usize) {}

    fn stage_finished(&self, _phase: PhaseKind, _outcome: &StageOutcome) {}

    fn phase_finished(&self, _summary: &PhaseSummary) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// The validated stage table of one phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhasePlan {
    pub phase: PhaseKind,
    /// Capabilities available before the first stage
    pub seed: Vec<Capability>,
    pub stages: Vec<StageDescriptor>,
}

/// Builder for phase runners.
pub struct PhaseBuilder<C> {
    kind: PhaseKind,
    seed: BTreeSet<Capability>,
    stages: Vec<Box<dyn Stage<C>>>,
}

impl<C> PhaseBuilder<C> {
    pub fn new(kind: PhaseKind) -> Self {
        Self {
            kind,
            seed: BTreeSet::new(),
            stages: Vec::new(),
        }
    }

    /// Capabilities the phase's input container already carries.
    pub fn seed(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.seed.extend(capabilities);
        self
    }

    pub fn stage(mut self, stage: Box<dyn Stage<C>>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(mut self, stages: impl IntoIterator<Item = Box<dyn Stage<C>>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Build the runner.
    ///
    /// This validates the stage table:
    /// - The phase must contain at least one stage
    /// - Stage names must be unique within the phase
    /// - Every requirement must be in the seed or provided by an earlier stage
    pub fn build(self) -> Result<PhaseRunner<C>, PhaseBuildError> {
        if self.stages.is_empty() {
            return Err(PhaseBuildError::Empty { phase: self.kind });
        }

        let mut names = HashSet::new();
        let mut available = self.seed.clone();

        for stage in &self.stages {
            let descriptor = stage.descriptor();
            if !names.insert(descriptor.name) {
                return Err(PhaseBuildError::DuplicateStage {
                    phase: self.kind,
                    stage: descriptor.name.to_string(),
                });
            }
            if let Some(&missing) = descriptor
                .requires
                .iter()
                .find(|cap| !available.contains(*cap))
            {
                return Err(PhaseBuildError::UnsatisfiedRequirement {
                    phase: self.kind,
                    stage: descriptor.name.to_string(),
                    capability: missing,
                });
            }
            available.extend(descriptor.provides.iter().copied());
        }

        Ok(PhaseRunner {
            kind: self.kind,
            slots: self
                .stages
                .into_iter()
                .map(|stage| StageSlot {
                    stage,
                    initialized: false,
                })
                .collect(),
            seed: self.seed,
            capabilities: available,
            summary: None,
        })
    }
}

struct StageSlot<C> {
    stage: Box<dyn Stage<C>>,
    initialized: bool,
}

/// Runs an ordered list of stages, stopping at the first failure.
pub struct PhaseRunner<C> {
    kind: PhaseKind,
    slots: Vec<StageSlot<C>>,
    seed: BTreeSet<Capability>,
    capabilities: BTreeSet<Capability>,
    summary: Option<PhaseSummary>,
}

impl<C: Annotated> PhaseRunner<C> {
    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.stage.name()).collect()
    }

    /// Capabilities available after every stage of the phase has run.
    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    pub fn plan(&self) -> PhasePlan {
        PhasePlan {
            phase: self.kind,
            seed: self.seed.iter().copied().collect(),
            stages: self
                .slots
                .iter()
                .map(|s| s.stage.descriptor().clone())
                .collect(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.slots.iter().all(|s| s.initialized)
    }

    /// Initialize every stage that has not been initialized yet.
    pub fn initialize(&mut self) -> Result<(), StageError> {
        for slot in self.slots.iter_mut().filter(|s| !s.initialized) {
            let name = slot.stage.name();
            slot.stage.init()?;
            slot.initialized = true;
            debug!(phase = %self.kind, stage = name, "Stage initialized");
        }
        Ok(())
    }

    /// Execute the stages in order, threading the container through them.
    ///
    /// The first failing stage aborts the phase; later stages never run.
    pub fn run(&mut self, mut container: C, observer: &dyn StageObserver) -> Result<C, StageError> {
        let kind = self.kind;
        let phase_timer = ExecutionTimer::start();
        let mut summary = PhaseSummary::new(kind, self.slots.len());

        info!(phase = %kind, stages = self.slots.len(), "Starting phase");
        observer.phase_started(kind, self.slots.len());

        for (position, slot) in self.slots.iter_mut().enumerate() {
            let name = slot.stage.name();
            observer.stage_started(kind, name, position);
            let timer = ExecutionTimer::start();

            match Self::run_stage(slot, container) {
                Ok(next) => {
                    container = next;
                    let outcome = StageOutcome::success(name, position, timer.elapsed());
                    info!(
                        phase = %kind,
                        stage = name,
                        duration_ms = outcome.duration.as_millis() as u64,
                        "Stage completed"
                    );
                    observer.stage_finished(kind, &outcome);
                    summary.add_outcome(outcome);
                }
                Err(err) => {
                    let outcome =
                        StageOutcome::failure(name, position, &err.to_string(), timer.elapsed());
                    error!(phase = %kind, stage = name, error = %err, "Stage failed");
                    observer.stage_finished(kind, &outcome);
                    summary.add_outcome(outcome);
                    summary.duration = phase_timer.elapsed();
                    observer.phase_finished(&summary);
                    self.summary = Some(summary);
                    return Err(err);
                }
            }
        }

        summary.duration = phase_timer.elapsed();
        info!(
            phase = %kind,
            duration_ms = summary.duration.as_millis() as u64,
            "Phase completed"
        );
        observer.phase_finished(&summary);
        self.summary = Some(summary);
        Ok(container)
    }

    /// Summary of the most recent run, if the phase has run.
    pub fn last_summary(&self) -> Option<&PhaseSummary> {
        self.summary.as_ref()
    }

    fn run_stage(slot: &mut StageSlot<C>, container: C) -> Result<C, StageError> {
        let descriptor = slot.stage.descriptor();
        let (name, requires, provides) = (descriptor.name, descriptor.requires, descriptor.provides);

        if !slot.initialized {
            return Err(StageError::NotInitialized {
                stage: name.to_string(),
            });
        }
        if let Some(missing) = requires.iter().find(|cap| !container.has(**cap)) {
            return Err(StageError::missing(name, missing.field()));
        }

        let mut output = slot.stage.execute(container)?;
        for &capability in provides {
            output.annotate(capability);
        }
        Ok(output)
    }
}
