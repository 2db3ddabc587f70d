use crate::data::{Capability, Graph};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::agents::{action_ids, refresh_arguments, role_tokens};
use crate::stages::lexicon;
use crate::stages::pre::ROLE_VERB;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "action-recognizer",
    &[
        Capability::Graph,
        Capability::SemanticRoles,
        Capability::WordSenses,
    ],
    &[Capability::Actions],
);

/// Marks action nodes whose verb the robot can execute and stores the
/// argument text of each semantic role on the node.
pub struct ActionRecognizer {
    descriptor: StageDescriptor,
}

impl Default for ActionRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRecognizer {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

impl Stage<Graph> for ActionRecognizer {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut graph: Graph) -> Result<Graph, StageError> {
        let name = self.descriptor.name;
        let mut recognized = Vec::new();

        for id in action_ids(&graph) {
            let predicate = role_tokens(&graph, id, ROLE_VERB);
            let sense = match predicate.first() {
                Some(token) => token
                    .text("sense")
                    .map(str::to_string)
                    .ok_or_else(|| StageError::missing(name, Capability::WordSenses.field()))?,
                None => {
                    return Err(StageError::execution(
                        name,
                        format!("action node {} has no predicate token", id.0),
                    ));
                }
            };
            let verb = graph
                .node(id)
                .and_then(|n| n.text("verb"))
                .unwrap_or_default()
                .to_string();
            let known = lexicon::is_action_verb(&verb);

            graph.set_attr(id, "sense", sense);
            graph.set_attr(id, "recognized", known);
            refresh_arguments(&mut graph, id);
            if known {
                recognized.push(verb);
            } else {
                tracing::debug!(verb = %verb, "Verb is not a known robot action");
            }
        }

        tracing::info!(actions = ?recognized, "Actions recognized");
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeKind;
    use crate::stages::agents::Wsd;
    use crate::stages::agents::fixtures::analyze;

    fn recognize(text: &str) -> Graph {
        analyze(
            text,
            vec![Box::new(Wsd::new()), Box::new(ActionRecognizer::new())],
        )
    }

    #[test]
    fn test_recognizes_known_verbs_with_arguments() {
        let graph = recognize("Move the robot arm to position A and then close the gripper.");
        let actions: Vec<_> = graph.nodes_of(NodeKind::Action).collect();
        assert_eq!(actions.len(), 2);

        assert_eq!(actions[0].text("verb"), Some("move"));
        assert!(actions[0].flag("recognized"));
        assert_eq!(actions[0].text("arg.A1"), Some("robot arm"));
        assert_eq!(actions[0].text("arg.A2"), Some("position A"));
        assert_eq!(actions[0].text("sense"), Some("move.v.01"));

        assert_eq!(actions[1].text("verb"), Some("close"));
        assert_eq!(actions[1].text("arg.A1"), Some("gripper"));
    }

    #[test]
    fn test_unknown_verb_is_not_recognized() {
        let graph = recognize("Dance with me");
        let action = graph.nodes_of(NodeKind::Action).next().unwrap();
        assert_eq!(action.text("verb"), Some("dance"));
        assert!(!action.flag("recognized"));
    }
}
