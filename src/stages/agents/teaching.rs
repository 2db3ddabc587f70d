use crate::data::{Capability, EdgeKind, Graph, NodeId, NodeKind};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::agents::{lower, sentence, step_actions_in_sentence};
use crate::stages::lexicon;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "teaching-detector",
    &[Capability::Actions],
    &[Capability::TeachingSequences],
);

/// Detects taught methods of the form `to <verb phrase> means <steps>`.
///
/// The verb phrase names the new method (`to make coffee` -> `makeCoffee`);
/// the actions after `means` in the same sentence form its body.
pub struct TeachingDetector {
    descriptor: StageDescriptor,
}

impl Default for TeachingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TeachingDetector {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

struct Teaching {
    name: String,
    verb: String,
    position: usize,
    sentence: i64,
    header: Option<NodeId>,
    body: Vec<NodeId>,
}

fn detect(graph: &Graph, stage: &str) -> Result<Vec<Teaching>, StageError> {
    let tokens = graph.tokens();
    let mut found = Vec::new();

    for (means_idx, means) in tokens.iter().enumerate() {
        if lower(means) != "means" {
            continue;
        }
        let sentence_no = sentence(means);
        // The header is "to <verb> ..." opening the same sentence.
        let Some(to_idx) = (0..means_idx).find(|&i| sentence(tokens[i]) == sentence_no) else {
            continue;
        };
        if lower(tokens[to_idx]) != "to" {
            continue;
        }
        let header_word = tokens[to_idx + 1];
        if !header_word.text("pos").is_some_and(|p| p.starts_with("VB")) {
            return Err(StageError::execution(
                stage,
                format!(
                    "'to {}' before 'means' does not name an action",
                    header_word.text("word").unwrap_or_default()
                ),
            ));
        }

        let phrase: Vec<&str> = tokens[to_idx + 1..means_idx]
            .iter()
            .filter(|t| !matches!(t.text("pos"), Some("DT" | "PRP$")))
            .filter_map(|t| t.text("lemma").or_else(|| t.text("lower")))
            .collect();
        let name = lexicon::camel_case(&phrase);
        if name.is_empty() {
            continue;
        }

        let means_pos = means.position().unwrap_or_default();
        let header_pos = tokens[to_idx + 1].position();
        let header = graph
            .nodes_of(NodeKind::Action)
            .find(|a| a.position() == header_pos)
            .map(|a| a.id);
        let body: Vec<NodeId> = step_actions_in_sentence(graph, sentence_no)
            .into_iter()
            .filter(|&id| {
                graph
                    .node(id)
                    .and_then(|n| n.position())
                    .is_some_and(|p| p > means_pos)
            })
            .collect();
        if body.is_empty() {
            return Err(StageError::execution(
                stage,
                format!("taught method '{name}' has no steps"),
            ));
        }

        found.push(Teaching {
            name,
            verb: phrase.first().copied().unwrap_or_default().to_string(),
            position: tokens[to_idx].position().unwrap_or_default(),
            sentence: sentence_no,
            header,
            body,
        });
    }
    Ok(found)
}

impl Stage<Graph> for TeachingDetector {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut graph: Graph) -> Result<Graph, StageError> {
        let name = self.descriptor.name;
        let teachings = detect(&graph, name)?;

        for teaching in teachings {
            if graph
                .nodes_of(NodeKind::Teaching)
                .any(|n| n.text("name") == Some(teaching.name.as_str()))
            {
                return Err(StageError::execution(
                    name,
                    format!("method '{}' is taught twice", teaching.name),
                ));
            }
            let node = graph.add_node(NodeKind::Teaching);
            graph.set_attr(node, "name", teaching.name.as_str());
            graph.set_attr(node, "verb", teaching.verb.as_str());
            graph.set_attr(node, "position", teaching.position);
            graph.set_attr(node, "sentence", teaching.sentence);
            if let Some(header) = teaching.header {
                graph.set_attr(header, "teaching_header", true);
            }
            for action in teaching.body {
                graph.set_attr(action, "taught_in", teaching.name.as_str());
                graph.add_edge(node, action, EdgeKind::Scope, Some("step"));
            }
            tracing::info!(method = %teaching.name, "Taught method detected");
        }

        Ok(graph)
    }
}
