//! Post-phase container: the final graph plus the artifacts generated from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::ast::{Ast, MethodSummary};
use super::capability::{Annotated, Capability};
use super::graph::Graph;
use crate::errors::StageError;

/// Outcome of merging generated code into its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    /// File the code was written to; `None` for the in-memory template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    /// Full content of the target after injection
    pub content: String,
    /// Whether an existing generated region was replaced
    pub replaced_existing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPipelineData {
    graph: Graph,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ast: Option<Ast>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    methods: Option<Vec<MethodSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    injection: Option<Injection>,
    annotations: BTreeSet<Capability>,
}

impl PostPipelineData {
    /// Wrap the analyzed graph; its annotations carry over.
    pub fn new(graph: Graph) -> Self {
        let annotations = graph.annotations().clone();
        Self {
            graph,
            ast: None,
            methods: None,
            code: None,
            injection: None,
            annotations,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn ast(&self, stage: &str) -> Result<&Ast, StageError> {
        self.ast
            .as_ref()
            .ok_or_else(|| StageError::missing(stage, Capability::SynthesizedAst.field()))
    }

    pub fn set_ast(&mut self, ast: Ast) {
        self.ast = Some(ast);
    }

    pub fn methods(&self, stage: &str) -> Result<&[MethodSummary], StageError> {
        self.methods
            .as_deref()
            .ok_or_else(|| StageError::missing(stage, Capability::ExtractedAst.field()))
    }

    pub fn set_methods(&mut self, methods: Vec<MethodSummary>) {
        self.methods = Some(methods);
    }

    pub fn code(&self, stage: &str) -> Result<&str, StageError> {
        self.code
            .as_deref()
            .ok_or_else(|| StageError::missing(stage, Capability::GeneratedCode.field()))
    }

    pub fn set_code(&mut self, code: String) {
        self.code = Some(code);
    }

    /// Generated code, if code generation has run.
    pub fn generated_code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn injection(&self) -> Option<&Injection> {
        self.injection.as_ref()
    }

    pub fn set_injection(&mut self, injection: Injection) {
        self.injection = Some(injection);
    }
}

impl Annotated for PostPipelineData {
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
    fn test_new_inherits_graph_annotations() {
        let mut graph = Graph::new();
        graph.annotate(Capability::Methods);
        let data = PostPipelineData::new(graph);
        assert!(data.has(Capability::Methods));
        assert!(!data.has(Capability::SynthesizedAst));
    }

    #[test]
    fn test_missing_artifacts_name_their_fields() {
        let data = PostPipelineData::new(Graph::new());
        assert!(data.ast("x").unwrap_err().to_string().contains("synthesized_ast"));
        assert!(data.methods("x").unwrap_err().to_string().contains("extracted_ast"));
        assert!(data.code("x").unwrap_err().to_string().contains("generated_code"));
        assert!(data.generated_code().is_none());
        assert!(data.injection().is_none());
    }

    #[test]
    fn test_serializes_without_empty_artifacts() {
        let mut data = PostPipelineData::new(Graph::new());
        data.set_code("robot.wave()\n".into());
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["code"], "robot.wave()\n");
        assert!(json.get("ast").is_none());
    }
}
