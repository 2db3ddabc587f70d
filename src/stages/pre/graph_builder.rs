//! Builds the semantic graph from the annotated hypothesis.

use crate::data::{
    Annotated, Capability, EdgeKind, Graph, Hypothesis, NodeId, NodeKind, PrePipelineData,
};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::lexicon;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "graph-builder",
    &[
        Capability::MainHypothesis,
        Capability::PosTags,
        Capability::NamedEntities,
        Capability::SemanticRoles,
    ],
    &[Capability::Graph],
);

/// Label of the role edge pointing at the predicate token itself.
pub const ROLE_VERB: &str = "V";

/// One `Token` node per token chained by `Next` edges, plus one `Action`
/// node per semantic frame linked to its tokens by labeled `Role` edges.
///
/// Token `i` always gets `NodeId(i)`.
pub struct GraphBuilder {
    descriptor: StageDescriptor,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

fn build(hypothesis: &Hypothesis, graph: &mut Graph) -> Vec<NodeId> {
    let mut ids = Vec::with_capacity(hypothesis.len());
    let mut sentence = 0usize;
    for token in &hypothesis.tokens {
        let id = graph.add_node(NodeKind::Token);
        graph.set_attr(id, "word", token.word.as_str());
        graph.set_attr(id, "lower", token.lower());
        graph.set_attr(id, "position", token.index);
        graph.set_attr(id, "instruction", token.instruction);
        graph.set_attr(id, "sentence", sentence);
        if let Some(pos) = &token.pos {
            graph.set_attr(id, "pos", pos.as_str());
        }
        if let Some(entity) = &token.entity {
            graph.set_attr(id, "entity", entity.as_str());
        }
        if let Some(&prev) = ids.last() {
            graph.add_edge(prev, id, EdgeKind::Next, None);
        }
        if lexicon::is_sentence_end(&token.word) {
            sentence += 1;
        }
        ids.push(id);
    }

    for (index, frame) in hypothesis.frames.iter().enumerate() {
        let Some(&predicate) = ids.get(frame.predicate) else {
            continue;
        };
        let token = &hypothesis.tokens[frame.predicate];
        let sentence = graph
            .node(predicate)
            .and_then(|n| n.int("sentence"))
            .unwrap_or_default();

        let action = graph.add_node(NodeKind::Action);
        graph.set_attr(action, "verb", frame.verb.as_str());
        graph.set_attr(action, "frame", index);
        graph.set_attr(action, "position", frame.predicate);
        graph.set_attr(action, "instruction", token.instruction);
        graph.set_attr(action, "sentence", sentence);
        graph.add_edge(action, predicate, EdgeKind::Role, Some(ROLE_VERB));

        for argument in &frame.arguments {
            for &i in &argument.tokens {
                if let Some(&target) = ids.get(i) {
                    graph.add_edge(action, target, EdgeKind::Role, Some(argument.role.as_str()));
                }
            }
        }
    }
    ids
}

impl Stage<PrePipelineData> for GraphBuilder {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut input: PrePipelineData) -> Result<PrePipelineData, StageError> {
        let name = self.descriptor.name;
        let mut graph = Graph::with_annotations(input.annotations().clone());
        let hypothesis = input.main_hypothesis(name)?;

        build(hypothesis, &mut graph);
        graph.annotate(Capability::Graph);

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edges().len(),
            actions = graph.count_of(NodeKind::Action),
            "Graph built"
        );
        input.set_graph(graph);
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{InputSource, SrlArgument, SrlFrame};

    fn data_with_frame() -> PrePipelineData {
        let mut data = PrePipelineData::new(InputSource::Text("close the gripper".into()));
        let hyp = data.main_hypothesis_mut("test").unwrap();
        for (token, pos) in hyp.tokens.iter_mut().zip(["VB", "DT", "NN"]) {
            token.pos = Some(pos.into());
        }
        hyp.tokens[2].entity = Some("OBJECT".into());
        hyp.frames.push(SrlFrame {
            predicate: 0,
            verb: "close".into(),
            arguments: vec![SrlArgument {
                role: "A1".into(),
                tokens: vec![1, 2],
            }],
        });
        for cap in [
            Capability::PosTags,
            Capability::NamedEntities,
            Capability::SemanticRoles,
        ] {
            data.annotate(cap);
        }
        data
    }

    #[test]
    fn test_builds_tokens_and_actions() {
        let mut stage = GraphBuilder::new();
        stage.init().unwrap();
        let data = stage.execute(data_with_frame()).unwrap();
        let graph = data.graph().unwrap();

        assert_eq!(graph.count_of(NodeKind::Token), 3);
        assert_eq!(graph.count_of(NodeKind::Action), 1);
        assert_eq!(graph.node(NodeId(2)).unwrap().text("entity"), Some("OBJECT"));

        let next: Vec<_> = graph
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Next)
            .collect();
        assert_eq!(next.len(), 2);

        let action = graph.nodes_of(NodeKind::Action).next().unwrap();
        assert_eq!(action.text("verb"), Some("close"));
        let roles: Vec<_> = graph
            .edges_from(action.id, EdgeKind::Role)
            .map(|e| (e.to.0, e.label.clone().unwrap()))
            .collect();
        assert_eq!(
            roles,
            vec![
                (0, "V".to_string()),
                (1, "A1".to_string()),
                (2, "A1".to_string())
            ]
        );
    }

    #[test]
    fn test_graph_inherits_annotations() {
        let mut stage = GraphBuilder::new();
        stage.init().unwrap();
        let data = stage.execute(data_with_frame()).unwrap();
        let graph = data.graph().unwrap();
        assert!(graph.has(Capability::Graph));
        assert!(graph.has(Capability::PosTags));
        assert!(graph.has(Capability::SemanticRoles));
    }

    #[test]
    fn test_sentence_numbers() {
        let mut data = PrePipelineData::new(InputSource::Text("Wave. Nod.".into()));
        data.annotate(Capability::PosTags);
        let mut stage = GraphBuilder::new();
        stage.init().unwrap();
        let data = stage.execute(data).unwrap();
        let sentences: Vec<_> = data
            .graph()
            .unwrap()
            .tokens()
            .iter()
            .map(|n| n.int("sentence").unwrap())
            .collect();
        assert_eq!(sentences, vec![0, 0, 1, 1]);
    }
}
