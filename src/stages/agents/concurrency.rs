use crate::data::{Capability, EdgeKind, Graph, NodeId, NodeKind};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::agents::{lower, sentence, step_actions_in_sentence};
use crate::stages::lexicon;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "concurrency-detector",
    &[Capability::Actions, Capability::Loops],
    &[Capability::Concurrency],
);

/// Groups actions marked to run at the same time.
///
/// The group is the marker's sentence; a marker in a sentence with a single
/// action (`Wave. Meanwhile nod.`) pulls in the previous sentence.
pub struct ConcurrencyDetector {
    descriptor: StageDescriptor,
}

impl Default for ConcurrencyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyDetector {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

struct Group {
    marker: String,
    position: usize,
    sentence: i64,
    branches: Vec<NodeId>,
}

fn detect(graph: &Graph) -> Vec<Group> {
    let tokens = graph.tokens();
    let words: Vec<&str> = tokens.iter().map(|t| lower(t)).collect();
    let mut groups: Vec<Group> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let Some(len) = lexicon::concurrency_marker_at(&words, i) else {
            i += 1;
            continue;
        };
        let marker = words[i..i + len].join(" ");
        let sentence_no = sentence(tokens[i]);
        let position = tokens[i].position().unwrap_or_default();
        i += len;

        if groups.iter().any(|g| g.sentence == sentence_no) {
            continue;
        }
        let mut branches = step_actions_in_sentence(graph, sentence_no);
        if branches.len() < 2 && sentence_no > 0 {
            let mut previous = step_actions_in_sentence(graph, sentence_no - 1);
            previous.append(&mut branches);
            branches = previous;
        }
        if branches.len() < 2 {
            tracing::warn!(marker = %marker, position, "Concurrency marker without two actions");
            continue;
        }
        groups.push(Group {
            marker,
            position,
            sentence: sentence_no,
            branches,
        });
    }
    groups
}

impl Stage<Graph> for ConcurrencyDetector {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut graph: Graph) -> Result<Graph, StageError> {
        graph.require(self.descriptor.name, Capability::Loops)?;

        let groups = detect(&graph);
        for group in &groups {
            let node = graph.add_node(NodeKind::Concurrency);
            graph.set_attr(node, "marker", group.marker.as_str());
            graph.set_attr(node, "position", group.position);
            graph.set_attr(node, "sentence", group.sentence);
            for &action in &group.branches {
                graph.add_edge(node, action, EdgeKind::Scope, Some("branch"));
            }
            tracing::info!(
                marker = %group.marker,
                branches = group.branches.len(),
                "Concurrent actions detected"
            );
        }

        Ok(graph)
    }
}
