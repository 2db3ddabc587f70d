//! Library-level pipeline tests.
//!
//! The orchestrator is driven with recording stub stages that declare the
//! same data dependencies as the standard set, so ordering and fail-fast
//! behavior can be observed without the language stages.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use synthflow::data::{
    Annotated, Capability, Graph, Hypothesis, InputSource, PostPipelineData, PrePipelineData,
};
use synthflow::errors::{OrchestratorError, StageError};
use synthflow::orchestrator::{Orchestrator, RunState};
use synthflow::phase::{NoopObserver, PhaseKind};
use synthflow::settings::Settings;
use synthflow::stage::{Stage, StageDescriptor};
use synthflow::stages::StageSet;

type Log = Rc<RefCell<Vec<&'static str>>>;
type Action<C> = fn(C, &'static str) -> Result<C, StageError>;

struct Recorder<C> {
    descriptor: StageDescriptor,
    log: Log,
    action: Action<C>,
}

impl<C> Stage<C> for Recorder<C> {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, input: C) -> Result<C, StageError> {
        self.log.borrow_mut().push(self.descriptor.name);
        (self.action)(input, self.descriptor.name)
    }
}

fn pass<C>(input: C, _stage: &'static str) -> Result<C, StageError> {
    Ok(input)
}

fn stub<C: 'static>(
    log: &Log,
    name: &'static str,
    requires: &'static [Capability],
    provides: &'static [Capability],
    action: Action<C>,
) -> Box<dyn Stage<C>> {
    Box::new(Recorder {
        descriptor: StageDescriptor::new(name, requires, provides),
        log: Rc::clone(log),
        action,
    })
}

fn transcribe(
    mut data: PrePipelineData,
    _stage: &'static str,
) -> Result<PrePipelineData, StageError> {
    data.set_main_hypothesis(Hypothesis::from_text("wave"));
    Ok(data)
}

fn build_graph(
    mut data: PrePipelineData,
    _stage: &'static str,
) -> Result<PrePipelineData, StageError> {
    let mut graph = Graph::with_annotations(data.annotations().clone());
    graph.annotate(Capability::Graph);
    data.set_graph(graph);
    Ok(data)
}

fn fail_pre(_: PrePipelineData, stage: &'static str) -> Result<PrePipelineData, StageError> {
    Err(StageError::execution(stage, "stub failure"))
}

fn missing_graph_data(_: Graph, stage: &'static str) -> Result<Graph, StageError> {
    Err(StageError::missing(stage, Capability::Actions.field()))
}

fn generate(
    mut data: PostPipelineData,
    _stage: &'static str,
) -> Result<PostPipelineData, StageError> {
    data.set_code("def execute(robot):\n    pass\n".to_string());
    Ok(data)
}

/// Stub set with the standard capability chain.
fn stub_set(log: &Log) -> StageSet {
    use Capability::*;

    StageSet {
        transcription: stub(log, "transcription", &[AudioInput], &[MainHypothesis], transcribe),
        pre: vec![
            stub(log, "shallow-nlp", &[MainHypothesis], &[PosTags], pass),
            stub(log, "ner", &[PosTags], &[NamedEntities], pass),
            stub(log, "srl", &[PosTags, NamedEntities], &[SemanticRoles], pass),
            stub(
                log,
                "graph-builder",
                &[MainHypothesis, PosTags, NamedEntities, SemanticRoles],
                &[Capability::Graph],
                build_graph,
            ),
        ],
        agents: vec![
            stub(log, "wsd", &[Capability::Graph, PosTags], &[WordSenses], pass),
            stub(
                log,
                "action-recognizer",
                &[Capability::Graph, SemanticRoles, WordSenses],
                &[Actions],
                pass,
            ),
            stub(log, "teaching-detector", &[Actions], &[TeachingSequences], pass),
            stub(log, "context-analyzer", &[Actions], &[Context], pass),
            stub(log, "coref-analyzer", &[Context], &[Coreference], pass),
            stub(log, "condition-detector", &[Actions, Coreference], &[Conditions], pass),
            stub(log, "loop-detector", &[Actions, Conditions], &[Loops], pass),
            stub(log, "concurrency-detector", &[Actions, Loops], &[Concurrency], pass),
            stub(
                log,
                "method-synthesizer",
                &[Actions, TeachingSequences, Conditions, Loops, Concurrency],
                &[Methods],
                pass,
            ),
        ],
        post: vec![
            stub(log, "ast-synthesizer", &[Methods], &[SynthesizedAst], pass),
            stub(log, "ast-extractor", &[SynthesizedAst], &[ExtractedAst], pass),
            stub(
                log,
                "code-generator",
                &[SynthesizedAst, ExtractedAst],
                &[GeneratedCode],
                generate,
            ),
            stub(log, "code-injector", &[GeneratedCode], &[InjectedCode], pass),
        ],
    }
}

const AGENT_ORDER: [&str; 9] = [
    "wsd",
    "action-recognizer",
    "teaching-detector",
    "context-analyzer",
    "coref-analyzer",
    "condition-detector",
    "loop-detector",
    "concurrency-detector",
    "method-synthesizer",
];

fn run(input: InputSource, stages: StageSet) -> synthflow::orchestrator::RunOutcome {
    let orchestrator = Orchestrator::new(&input, stages).unwrap();
    orchestrator.run(PrePipelineData::new(input), &NoopObserver)
}

fn text() -> InputSource {
    InputSource::Text("Wave.".to_string())
}

#[test]
fn test_text_run_never_invokes_transcription() {
    let log = Log::default();
    let outcome = run(text(), stub_set(&log));
    assert!(outcome.is_success());
    assert!(!log.borrow().contains(&"transcription"));
    assert_eq!(log.borrow()[0], "shallow-nlp");
}

#[test]
fn test_audio_run_transcribes_once_and_first() {
    let log = Log::default();
    let outcome = run(InputSource::Audio(PathBuf::from("command.flac")), stub_set(&log));
    assert!(outcome.is_success());
    let log = log.borrow();
    assert_eq!(log[0], "transcription");
    assert_eq!(log.iter().filter(|s| **s == "transcription").count(), 1);
}

#[test]
fn test_agents_run_in_declared_order() {
    let log = Log::default();
    run(text(), stub_set(&log));
    let agents: Vec<&str> = log
        .borrow()
        .iter()
        .copied()
        .filter(|name| AGENT_ORDER.contains(name))
        .collect();
    assert_eq!(agents, AGENT_ORDER);
}

#[test]
fn test_every_stage_runs_once_on_success() {
    let log = Log::default();
    let outcome = run(text(), stub_set(&log));
    assert_eq!(log.borrow().len(), 4 + 9 + 4);
    assert_eq!(outcome.report.stages_run(), 17);
    assert_eq!(outcome.report.final_state, RunState::Done);
    let output = outcome.result.unwrap();
    assert!(output.has(Capability::InjectedCode));
    assert!(output.generated_code().is_some());
}

#[test]
fn test_pre_failure_stops_before_agents() {
    let log = Log::default();
    let mut stages = stub_set(&log);
    stages.pre[1] = stub(
        &log,
        "ner",
        &[Capability::PosTags],
        &[Capability::NamedEntities],
        fail_pre,
    );

    let outcome = run(text(), stages);
    assert!(!outcome.is_success());
    assert_eq!(*log.borrow(), vec!["shallow-nlp", "ner"]);
    assert_eq!(outcome.report.failed_stage.as_deref(), Some("ner"));
    assert_eq!(outcome.report.final_state, RunState::Failed);
    assert!(matches!(
        outcome.result,
        Err(OrchestratorError::Phase {
            phase: PhaseKind::PreProcessing,
            ..
        })
    ));
}

#[test]
fn test_agent_missing_data_stops_before_post() {
    let log = Log::default();
    let mut stages = stub_set(&log);
    stages.agents[3] = stub(
        &log,
        "context-analyzer",
        &[Capability::Actions],
        &[Capability::Context],
        missing_graph_data,
    );

    let outcome = run(text(), stages);
    let log = log.borrow();
    assert_eq!(log.last(), Some(&"context-analyzer"));
    assert!(!log.contains(&"ast-synthesizer"));
    match outcome.result {
        Err(OrchestratorError::Phase {
            phase: PhaseKind::AgentAnalysis,
            source,
        }) => assert!(source.is_missing_data()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected failure"),
    }
}

#[test]
fn test_runs_are_deterministic() {
    let input = "If the door is open, close it, otherwise wave.";
    let outputs: Vec<_> = (0..2)
        .map(|_| {
            let input = InputSource::Text(input.to_string());
            let outcome = run(input, StageSet::standard(&Settings::default()));
            outcome.result.unwrap()
        })
        .collect();
    assert_eq!(outputs[0].graph(), outputs[1].graph());
    assert_eq!(outputs[0].generated_code(), outputs[1].generated_code());
}

#[test]
fn test_missing_graph_hand_off_is_rejected_at_construction() {
    let log = Log::default();
    let mut stages = stub_set(&log);
    stages.pre.pop();
    let result = Orchestrator::new(&text(), stages);
    assert!(matches!(result, Err(OrchestratorError::Construction(_))));
    assert!(log.borrow().is_empty());
}
