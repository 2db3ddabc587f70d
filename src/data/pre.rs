//! Pre-phase container: raw input plus the linguistic annotations derived from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::capability::{Annotated, Capability};
use super::graph::Graph;
use super::hypothesis::Hypothesis;
use crate::errors::{StageError, UsageError};

/// Input modality of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Audio,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Text => write!(f, "text"),
            InputKind::Audio => write!(f, "audio"),
        }
    }
}

/// The raw input of a run: a literal utterance or a path to an audio recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Text(String),
    Audio(PathBuf),
}

impl InputSource {
    /// Build the input from the two mutually exclusive command-line values.
    pub fn from_options(text: Option<String>, file: Option<PathBuf>) -> Result<Self, UsageError> {
        match (text, file) {
            (Some(_), Some(_)) => Err(UsageError::ConflictingInputs),
            (None, None) => Err(UsageError::NoInput),
            (Some(text), None) if text.trim().is_empty() => Err(UsageError::EmptyText),
            (Some(text), None) => Ok(InputSource::Text(text)),
            (None, Some(path)) => Ok(InputSource::Audio(path)),
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            InputSource::Text(_) => InputKind::Text,
            InputSource::Audio(_) => InputKind::Audio,
        }
    }
}

/// Container shared by the pre-processing stages.
///
/// For text input the main hypothesis is parsed at creation; for audio input
/// it stays absent until transcription runs. The graph is absent until graph
/// construction.
#[derive(Debug, Clone)]
pub struct PrePipelineData {
    input: InputSource,
    main_hypothesis: Option<Hypothesis>,
    graph: Option<Graph>,
    annotations: BTreeSet<Capability>,
}

impl PrePipelineData {
    pub fn new(input: InputSource) -> Self {
        let mut data = Self {
            input,
            main_hypothesis: None,
            graph: None,
            annotations: BTreeSet::new(),
        };
        match &data.input {
            InputSource::Text(text) => {
                let hypothesis = Hypothesis::from_text(text);
                tracing::info!(hypothesis = %hypothesis, "Main hypothesis parsed from text");
                data.set_main_hypothesis(hypothesis);
            }
            InputSource::Audio(_) => {
                data.annotations.insert(Capability::AudioInput);
            }
        }
        data
    }

    pub fn input(&self) -> &InputSource {
        &self.input
    }

    pub fn input_file_path(&self) -> Option<&Path> {
        match &self.input {
            InputSource::Audio(path) => Some(path),
            InputSource::Text(_) => None,
        }
    }

    pub fn main_hypothesis(&self, stage: &str) -> Result<&Hypothesis, StageError> {
        self.main_hypothesis
            .as_ref()
            .ok_or_else(|| StageError::missing(stage, Capability::MainHypothesis.field()))
    }

    pub fn main_hypothesis_mut(&mut self, stage: &str) -> Result<&mut Hypothesis, StageError> {
        self.main_hypothesis
            .as_mut()
            .ok_or_else(|| StageError::missing(stage, Capability::MainHypothesis.field()))
    }

    /// Set (or overwrite) the main hypothesis.
    pub fn set_main_hypothesis(&mut self, hypothesis: Hypothesis) {
        self.main_hypothesis = Some(hypothesis);
        self.annotations.insert(Capability::MainHypothesis);
    }

    pub fn has_hypothesis(&self) -> bool {
        self.main_hypothesis.is_some()
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    pub fn set_graph(&mut self, graph: Graph) {
        self.graph = Some(graph);
        self.annotations.insert(Capability::Graph);
    }

    /// Move the graph out of the container for the agent phase.
    pub fn take_graph(&mut self, stage: &str) -> Result<Graph, StageError> {
        self.graph
            .take()
            .ok_or_else(|| StageError::missing(stage, Capability::Graph.field()))
    }
}

impl Annotated for PrePipelineData {
    fn annotations(&self) -> &BTreeSet<Capability> {
        &self.annotations
    }

    fn annotate(&mut self, capability: Capability) {
        self.annotations.insert(capability);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_options_text() {
        let input = InputSource::from_options(Some("close it".into()), None).unwrap();
        assert_eq!(input, InputSource::Text("close it".into()));
        assert_eq!(input.kind(), InputKind::Text);
    }

    #[test]
    fn test_from_options_audio() {
        let input = InputSource::from_options(None, Some(PathBuf::from("a.flac"))).unwrap();
        assert_eq!(input.kind(), InputKind::Audio);
    }

    #[test]
    fn test_from_options_rejects_neither_and_both() {
        assert_eq!(
            InputSource::from_options(None, None),
            Err(UsageError::NoInput)
        );
        assert_eq!(
            InputSource::from_options(Some("x".into()), Some(PathBuf::from("a.flac"))),
            Err(UsageError::ConflictingInputs)
        );
        assert_eq!(
            InputSource::from_options(Some("  ".into()), None),
            Err(UsageError::EmptyText)
        );
    }

    #[test]
    fn test_text_input_populates_hypothesis() {
        let data = PrePipelineData::new(InputSource::Text("open the door".into()));
        assert!(data.has_hypothesis());
        assert!(data.has(Capability::MainHypothesis));
        assert!(!data.has(Capability::AudioInput));
        assert_eq!(data.main_hypothesis("test").unwrap().len(), 3);
        assert!(data.input_file_path().is_none());
    }

    #[test]
    fn test_audio_input_has_no_hypothesis() {
        let data = PrePipelineData::new(InputSource::Audio(PathBuf::from("x.flac")));
        assert!(!data.has_hypothesis());
        assert!(data.has(Capability::AudioInput));
        let err = data.main_hypothesis("shallow-nlp").unwrap_err();
        assert!(err.is_missing_data());
        assert!(err.to_string().contains("main_hypothesis"));
    }

    #[test]
    fn test_take_graph_missing() {
        let mut data = PrePipelineData::new(InputSource::Text("go".into()));
        let err = data.take_graph("orchestrator").unwrap_err();
        assert!(err.to_string().contains("graph"));

        data.set_graph(Graph::new());
        assert!(data.take_graph("orchestrator").is_ok());
        assert!(data.graph().is_none());
    }
}
