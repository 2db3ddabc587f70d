//! Agent stages: each consumes the graph left by the previous agent and
//! hands on the enriched graph.

mod action;
mod concurrency;
mod condition;
mod context;
mod coref;
mod loops;
mod method;
mod teaching;
mod wsd;

pub use action::ActionRecognizer;
pub use concurrency::ConcurrencyDetector;
pub use condition::ConditionDetector;
pub use context::ContextAnalyzer;
pub use coref::CorefAnalyzer;
pub use loops::LoopDetector;
pub use method::MethodSynthesizer;
pub use teaching::TeachingDetector;
pub use wsd::Wsd;

use std::collections::BTreeSet;

use crate::data::{EdgeKind, Graph, Node, NodeId, NodeKind};
use crate::stages::pre::ROLE_VERB;

/// Prefix of the action attributes holding argument text per role.
pub const ARG_PREFIX: &str = "arg.";

/// Action nodes ordered by predicate position.
pub(crate) fn action_ids(graph: &Graph) -> Vec<NodeId> {
    let mut actions: Vec<&Node> = graph.nodes_of(NodeKind::Action).collect();
    actions.sort_by_key(|n| (n.position(), n.id));
    actions.into_iter().map(|n| n.id).collect()
}

pub(crate) fn lower(node: &Node) -> &str {
    node.text("lower").unwrap_or_default()
}

pub(crate) fn sentence(node: &Node) -> i64 {
    node.int("sentence").unwrap_or_default()
}

/// Whether an action may become a program step on its own.
pub(crate) fn is_step_candidate(node: &Node) -> bool {
    !node.flag("in_condition") && !node.flag("teaching_header")
}

/// Tokens filling `role` of an action, ordered by position.
pub(crate) fn role_tokens<'g>(graph: &'g Graph, action: NodeId, role: &str) -> Vec<&'g Node> {
    let mut tokens: Vec<&Node> = graph
        .edges_from(action, EdgeKind::Role)
        .filter(|e| e.label.as_deref() == Some(role))
        .filter_map(|e| graph.node(e.to))
        .collect();
    tokens.sort_by_key(|n| n.position());
    tokens
}

/// Surface text of an argument, without determiners and with resolved
/// pronouns replaced by their referents.
pub(crate) fn argument_text(graph: &Graph, action: NodeId, role: &str) -> Option<String> {
    let words: Vec<&str> = role_tokens(graph, action, role)
        .into_iter()
        .filter(|t| !matches!(t.text("pos"), Some("DT" | "PRP$")))
        .filter_map(|t| t.text("resolved").or_else(|| t.text("word")))
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

/// Recompute the `arg.<ROLE>` attributes of an action from its role edges.
pub(crate) fn refresh_arguments(graph: &mut Graph, action: NodeId) {
    let roles: BTreeSet<String> = graph
        .edges_from(action, EdgeKind::Role)
        .filter_map(|e| e.label.clone())
        .filter(|label| label != ROLE_VERB)
        .collect();
    for role in roles {
        if let Some(text) = argument_text(graph, action, &role) {
            graph.set_attr(action, &format!("{ARG_PREFIX}{role}"), text);
        }
    }
}

/// Action nodes whose predicate sits inside `start..end` token positions.
pub(crate) fn actions_between(graph: &Graph, start: usize, end: usize) -> Vec<NodeId> {
    action_ids(graph)
        .into_iter()
        .filter(|&id| {
            graph
                .node(id)
                .and_then(Node::position)
                .is_some_and(|p| p >= start && p < end)
        })
        .collect()
}

/// Action nodes in a sentence that may become program steps.
pub(crate) fn step_actions_in_sentence(graph: &Graph, sentence_no: i64) -> Vec<NodeId> {
    action_ids(graph)
        .into_iter()
        .filter(|&id| {
            graph
                .node(id)
                .is_some_and(|n| sentence(n) == sentence_no && is_step_candidate(n))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Runs the reference pre-processing chain to produce agent input.

    use crate::data::{Annotated, Graph, InputSource, PrePipelineData};
    use crate::stage::Stage;
    use crate::stages::pre::{GraphBuilder, Ner, ShallowNlp, Srl};

    pub fn graph_for(text: &str) -> Graph {
        let mut stages: Vec<Box<dyn Stage<PrePipelineData>>> = vec![
            Box::new(ShallowNlp::new()),
            Box::new(Ner::new()),
            Box::new(Srl::new()),
            Box::new(GraphBuilder::new()),
        ];
        let mut data = PrePipelineData::new(InputSource::Text(text.into()));
        for stage in &mut stages {
            stage.init().unwrap();
            data = stage.execute(data).unwrap();
            for &cap in stage.descriptor().provides {
                data.annotate(cap);
            }
        }
        data.take_graph("fixture").unwrap()
    }

    /// Run agent stages in order over a fresh graph for `text`.
    pub fn analyze(text: &str, agents: Vec<Box<dyn Stage<Graph>>>) -> Graph {
        let mut graph = graph_for(text);
        for mut agent in agents {
            agent.init().unwrap();
            graph = agent.execute(graph).unwrap();
            for &cap in agent.descriptor().provides {
                graph.annotate(cap);
            }
        }
        graph
    }

    /// Run the full agent chain over `text`, ending with method synthesis.
    pub fn analyzed(text: &str) -> Graph {
        analyze(
            text,
            vec![
                Box::new(super::Wsd::new()),
                Box::new(super::ActionRecognizer::new()),
                Box::new(super::TeachingDetector::new()),
                Box::new(super::ContextAnalyzer::new()),
                Box::new(super::CorefAnalyzer::new()),
                Box::new(super::ConditionDetector::new()),
                Box::new(super::LoopDetector::new()),
                Box::new(super::ConcurrencyDetector::new()),
                Box::new(super::MethodSynthesizer::default()),
            ],
        )
    }
}
