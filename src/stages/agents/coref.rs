use crate::data::{Capability, EdgeKind, Graph, Node, NodeId, NodeKind};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::agents::{lower, refresh_arguments};
use crate::stages::lexicon;
use crate::stages::pre::LOCATION;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "coref-analyzer",
    &[Capability::Context],
    &[Capability::Coreference],
);

/// Resolves referring pronouns to the latest preceding entity.
///
/// Objects are preferred over places, so in "put the cup on the table and
/// wash it" the pronoun resolves to the cup.
pub struct CorefAnalyzer {
    descriptor: StageDescriptor,
}

impl Default for CorefAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CorefAnalyzer {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

fn antecedent<'g>(entities: &[&'g Node], position: usize) -> Option<&'g Node> {
    let preceding = || {
        entities
            .iter()
            .rev()
            .filter(move |e| e.position().is_some_and(|p| p < position))
    };
    preceding()
        .find(|e| e.text("kind") != Some(LOCATION))
        .or_else(|| preceding().next())
        .copied()
}

impl Stage<Graph> for CorefAnalyzer {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut graph: Graph) -> Result<Graph, StageError> {
        graph.require(self.descriptor.name, Capability::Context)?;

        let mut entities: Vec<&Node> = graph.nodes_of(NodeKind::Entity).collect();
        entities.sort_by_key(|e| (e.position(), e.id));

        let mut resolutions: Vec<(NodeId, NodeId, String)> = Vec::new();
        for token in graph.tokens() {
            if token.text("pos") != Some("PRP")
                || !lexicon::contains(lexicon::REFERRING_PRONOUNS, lower(token))
            {
                continue;
            }
            let position = token.position().unwrap_or_default();
            match antecedent(&entities, position) {
                Some(entity) => resolutions.push((
                    token.id,
                    entity.id,
                    entity.text("text").unwrap_or_default().to_string(),
                )),
                None => tracing::warn!(
                    pronoun = %lower(token),
                    position,
                    "Pronoun has no antecedent"
                ),
            }
        }

        for (token, entity, text) in &resolutions {
            graph.add_edge(*token, *entity, EdgeKind::Reference, None);
            graph.set_attr(*token, "resolved", text.as_str());
            let actions: Vec<NodeId> = graph
                .edges_to(*token, EdgeKind::Role)
                .map(|e| e.from)
                .collect();
            for action in actions {
                refresh_arguments(&mut graph, action);
            }
        }
        tracing::debug!(resolved = resolutions.len(), "Pronouns resolved");

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::agents::fixtures::analyze;
    use crate::stages::agents::{ActionRecognizer, ContextAnalyzer, Wsd};

    fn resolve(text: &str) -> Graph {
        analyze(
            text,
            vec![
                Box::new(Wsd::new()),
                Box::new(ActionRecognizer::new()),
                Box::new(ContextAnalyzer::new()),
                Box::new(CorefAnalyzer::new()),
            ],
        )
    }

    #[test]
    fn test_pronoun_resolves_to_object_over_location() {
        let graph = resolve("Put the cup on the table and wash it.");
        let it = graph.tokens().into_iter().find(|t| lower(t) == "it").unwrap();
        assert_eq!(it.text("resolved"), Some("cup"));
        assert_eq!(graph.edges_from(it.id, EdgeKind::Reference).count(), 1);

        let wash = graph
            .nodes_of(NodeKind::Action)
            .find(|a| a.text("verb") == Some("wash"))
            .unwrap();
        assert_eq!(wash.text("arg.A1"), Some("cup"));
    }

    #[test]
    fn test_pronoun_without_antecedent_stays_unresolved() {
        let graph = resolve("Take it.");
        let it = graph.tokens().into_iter().find(|t| lower(t) == "it").unwrap();
        assert!(it.text("resolved").is_none());
    }

    #[test]
    fn test_requires_context() {
        let mut stage = CorefAnalyzer::new();
        stage.init().unwrap();
        let err = stage.execute(Graph::new()).unwrap_err();
        assert!(err.is_missing_data());
    }
}
