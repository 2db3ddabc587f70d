use crate::data::{Capability, EdgeKind, Graph, Node, NodeId, NodeKind};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::agents::lower;
use crate::stages::lexicon;
use crate::stages::pre::OBJECT;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "context-analyzer",
    &[Capability::Actions],
    &[Capability::Context],
);

/// Builds the discourse context: one `Entity` node per noun phrase, linked
/// to the tokens mentioning it.
pub struct ContextAnalyzer {
    descriptor: StageDescriptor,
}

impl Default for ContextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextAnalyzer {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

fn pos(node: &Node) -> &str {
    node.text("pos").unwrap_or_default()
}

fn in_noun_phrase(node: &Node) -> bool {
    let pos = pos(node);
    pos == "DT" || pos == "PRP$" || pos == "JJ" || pos == "CD" || pos.starts_with("NN")
}

fn is_noun(node: &Node) -> bool {
    pos(node).starts_with("NN")
}

struct Phrase {
    tokens: Vec<NodeId>,
    text: String,
    head: String,
    kind: String,
    position: usize,
}

fn noun_phrases(graph: &Graph) -> Vec<Phrase> {
    let tokens = graph.tokens();
    let words: Vec<&str> = tokens.iter().map(|t| lower(t)).collect();
    let mut phrases = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        if let Some(len) = lexicon::concurrency_marker_at(&words, i) {
            i += len;
            continue;
        }
        if !in_noun_phrase(tokens[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < tokens.len()
            && in_noun_phrase(tokens[i])
            && lexicon::concurrency_marker_at(&words, i).is_none()
        {
            i += 1;
        }
        let span = &tokens[start..i];
        // Repetition counts ("3 times") are not entities
        if span.iter().any(|t| words[t.position().unwrap_or_default()] == "times") {
            continue;
        }
        let Some(head) = span
            .iter()
            .rev()
            .find(|t| pos(t) != "NNP" && is_noun(t))
            .or_else(|| span.iter().rev().find(|t| is_noun(t)))
        else {
            continue;
        };

        let text = span
            .iter()
            .filter(|t| !matches!(pos(t), "DT" | "PRP$"))
            .filter_map(|t| t.text("word"))
            .collect::<Vec<_>>()
            .join(" ");
        phrases.push(Phrase {
            tokens: span.iter().map(|t| t.id).collect(),
            text,
            head: head
                .text("lemma")
                .or_else(|| head.text("lower"))
                .unwrap_or_default()
                .to_string(),
            kind: head.text("entity").unwrap_or(OBJECT).to_string(),
            position: span[0].position().unwrap_or_default(),
        });
    }
    phrases
}

impl Stage<Graph> for ContextAnalyzer {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut graph: Graph) -> Result<Graph, StageError> {
        let phrases = noun_phrases(&graph);
        for phrase in &phrases {
            let entity = graph.add_node(NodeKind::Entity);
            graph.set_attr(entity, "text", phrase.text.as_str());
            graph.set_attr(entity, "head", phrase.head.as_str());
            graph.set_attr(entity, "kind", phrase.kind.as_str());
            graph.set_attr(entity, "position", phrase.position);
            for &token in &phrase.tokens {
                graph.add_edge(entity, token, EdgeKind::Mention, None);
            }
        }
        tracing::debug!(entities = phrases.len(), "Context entities collected");
        Ok(graph)
    }
}
