use std::time::Duration;
use tracing::{error, info};

use super::report::{RunOutcome, RunReport};
use super::state::{RunState, StateEntry, StateTracker};
use crate::data::{Capability, Graph, InputKind, InputSource, PostPipelineData, PrePipelineData};
use crate::errors::{OrchestratorError, PhaseBuildError, StageError};
use crate::phase::{
    ExecutionTimer, PhaseBuilder, PhaseKind, PhasePlan, PhaseRunner, PhaseSummary, StageObserver,
};
use crate::stage::Stage;
use crate::stages::StageSet;

/// Name reported when the pre-processing phase ends without a graph.
const HAND_OFF: &str = "pre-processing hand-off";

/// Drives one run through pre-processing, agent analysis and
/// post-processing.
///
/// The pre-processing path is chosen from the input at construction: text
/// input skips transcription entirely, audio input runs it first. Every
/// phase is validated when the orchestrator is built, so a stage table
/// whose requirements cannot be met never reaches `initialize`.
pub struct Orchestrator {
    input: InputKind,
    pre: PhaseRunner<PrePipelineData>,
    agents: PhaseRunner<Graph>,
    post: PhaseRunner<PostPipelineData>,
    state: StateTracker,
}

impl Orchestrator {
    pub fn new(input: &InputSource, stages: StageSet) -> Result<Self, OrchestratorError> {
        let StageSet {
            transcription,
            pre,
            agents,
            post,
        } = stages;
        let kind = input.kind();

        let (seed, pre_stages): (Capability, Vec<Box<dyn Stage<PrePipelineData>>>) = match kind {
            InputKind::Text => (Capability::MainHypothesis, pre),
            InputKind::Audio => (
                Capability::AudioInput,
                std::iter::once(transcription).chain(pre).collect(),
            ),
        };

        let pre = PhaseBuilder::new(PhaseKind::PreProcessing)
            .seed([seed])
            .stages(pre_stages)
            .build()?;
        if !pre.capabilities().contains(&Capability::Graph) {
            return Err(PhaseBuildError::MissingHandOff {
                phase: PhaseKind::PreProcessing,
                capability: Capability::Graph,
            }
            .into());
        }
        let agents = PhaseBuilder::new(PhaseKind::AgentAnalysis)
            .seed(pre.capabilities().iter().copied())
            .stages(agents)
            .build()?;
        let post = PhaseBuilder::new(PhaseKind::PostProcessing)
            .seed(agents.capabilities().iter().copied())
            .stages(post)
            .build()?;

        info!(
            input = %kind,
            pre = pre.len(),
            agents = agents.len(),
            post = post.len(),
            "Pipeline constructed"
        );

        Ok(Self {
            input: kind,
            pre,
            agents,
            post,
            state: StateTracker::new(),
        })
    }

    pub fn input_kind(&self) -> InputKind {
        self.input
    }

    pub fn state(&self) -> RunState {
        self.state.current()
    }

    pub fn history(&self) -> Vec<RunState> {
        self.state.history()
    }

    pub fn state_entries(&self) -> &[StateEntry] {
        self.state.entries()
    }

    /// The validated stage tables of the selected path.
    pub fn plan(&self) -> Vec<PhasePlan> {
        vec![self.pre.plan(), self.agents.plan(), self.post.plan()]
    }

    /// Summaries of the phases that ran, in order.
    pub fn phase_summaries(&self) -> Vec<PhaseSummary> {
        [
            self.pre.last_summary(),
            self.agents.last_summary(),
            self.post.last_summary(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }

    /// Initialize every stage of the selected path.
    ///
    /// Returns the time spent, which is reported apart from execution time.
    pub fn initialize(&mut self) -> Result<Duration, OrchestratorError> {
        let from = self.state.current();
        if !from.can_transition_to(RunState::Initialized) {
            return Err(OrchestratorError::InvalidTransition {
                from,
                to: RunState::Initialized,
            });
        }

        let timer = ExecutionTimer::start();
        let result = self
            .pre
            .initialize()
            .map_err(|source| OrchestratorError::Initialization {
                phase: PhaseKind::PreProcessing,
                source,
            })
            .and_then(|()| {
                self.agents
                    .initialize()
                    .map_err(|source| OrchestratorError::Initialization {
                        phase: PhaseKind::AgentAnalysis,
                        source,
                    })
            })
            .and_then(|()| {
                self.post
                    .initialize()
                    .map_err(|source| OrchestratorError::Initialization {
                        phase: PhaseKind::PostProcessing,
                        source,
                    })
            });

        if let Err(err) = result {
            error!(error = %err, "Initialization failed");
            self.state.fail();
            return Err(err);
        }

        let elapsed = timer.elapsed();
        self.state.transition(RunState::Initialized)?;
        info!(duration_ms = elapsed.as_millis() as u64, "Stages initialized");
        Ok(elapsed)
    }

    /// Execute the three phases in order.
    ///
    /// Requires an initialized orchestrator; any failure moves the run to
    /// `Failed` and no later stage runs.
    pub fn execute(
        &mut self,
        data: PrePipelineData,
        observer: &dyn StageObserver,
    ) -> Result<PostPipelineData, OrchestratorError> {
        let from = self.state.current();
        if from != RunState::Initialized {
            return Err(OrchestratorError::InvalidTransition {
                from,
                to: RunState::PreProcessed,
            });
        }

        match self.execute_phases(data, observer) {
            Ok(output) => Ok(output),
            Err(err) => {
                error!(error = %err, "Run failed");
                self.state.fail();
                Err(err)
            }
        }
    }

    fn execute_phases(
        &mut self,
        data: PrePipelineData,
        observer: &dyn StageObserver,
    ) -> Result<PostPipelineData, OrchestratorError> {
        let actual = data.input().kind();
        if actual != self.input {
            return Err(OrchestratorError::InputMismatch {
                expected: self.input,
                actual,
            });
        }

        let mut data = self
            .pre
            .run(data, observer)
            .map_err(phase_error(PhaseKind::PreProcessing))?;
        let graph = data
            .take_graph(HAND_OFF)
            .map_err(phase_error(PhaseKind::PreProcessing))?;
        self.state.transition(RunState::PreProcessed)?;

        let graph = self
            .agents
            .run(graph, observer)
            .map_err(phase_error(PhaseKind::AgentAnalysis))?;
        self.state.transition(RunState::Analyzed)?;

        let output = self
            .post
            .run(PostPipelineData::new(graph), observer)
            .map_err(phase_error(PhaseKind::PostProcessing))?;
        self.state.transition(RunState::PostProcessed)?;
        self.state.transition(RunState::Done)?;

        Ok(output)
    }

    /// Initialize, execute and report in one call.
    pub fn run(mut self, data: PrePipelineData, observer: &dyn StageObserver) -> RunOutcome {
        let mut report = RunReport::new(self.input);

        let result = match self.initialize() {
            Ok(init_duration) => {
                report.init_duration = init_duration;
                let timer = ExecutionTimer::start();
                let result = self.execute(data, observer);
                report.duration = timer.elapsed();
                info!(
                    duration_ms = report.duration.as_millis() as u64,
                    success = result.is_ok(),
                    "Runtime in ms"
                );
                result
            }
            Err(err) => Err(err),
        };

        report.final_state = self.state.current();
        report.phases = self.phase_summaries();
        match &result {
            Ok(_) => report.success = true,
            Err(err) => report.record_error(err),
        }

        RunOutcome { report, result }
    }
}

fn phase_error(phase: PhaseKind) -> impl Fn(StageError) -> OrchestratorError {
    move |source| OrchestratorError::Phase { phase, source }
}
