use crate::data::{Capability, EdgeKind, Graph, Node, NodeId, NodeKind};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::agents::{
    action_ids, actions_between, is_step_candidate, lower, sentence, step_actions_in_sentence,
};
use crate::stages::lexicon;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "loop-detector",
    &[Capability::Actions, Capability::Conditions],
    &[Capability::Loops],
);

pub const KIND_COUNT: &str = "count";
pub const KIND_WHILE: &str = "while";
pub const KIND_UNTIL: &str = "until";

/// Detects repeated actions: count loops (`wave 3 times`, `knock twice`) and
/// condition loops (`stir until the milk is hot`).
pub struct LoopDetector {
    descriptor: StageDescriptor,
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopDetector {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

struct Detected {
    kind: &'static str,
    count: Option<u32>,
    condition: Option<String>,
    position: usize,
    sentence: i64,
    clause: Vec<NodeId>,
    body: Vec<NodeId>,
}

fn position_of(graph: &Graph, id: NodeId) -> usize {
    graph.node(id).and_then(Node::position).unwrap_or_default()
}

/// Step actions of the instruction containing `token`, or the closest
/// preceding one in the sentence.
fn count_scope(graph: &Graph, token: &Node) -> Vec<NodeId> {
    let instruction = token.int("instruction");
    let position = token.position().unwrap_or_default();
    let candidates: Vec<&Node> = action_ids(graph)
        .into_iter()
        .filter_map(|id| graph.node(id))
        .filter(|n| is_step_candidate(n))
        .collect();

    let same_instruction: Vec<NodeId> = candidates
        .iter()
        .filter(|n| n.int("instruction") == instruction && n.int("instruction").is_some())
        .map(|n| n.id)
        .collect();
    if !same_instruction.is_empty() {
        return same_instruction;
    }
    candidates
        .iter()
        .rev()
        .find(|n| sentence(n) == sentence(token) && n.position().is_some_and(|p| p < position))
        .map(|n| vec![n.id])
        .unwrap_or_default()
}

fn detect(graph: &Graph, stage: &str) -> Result<Vec<Detected>, StageError> {
    let tokens = graph.tokens();
    let mut found = Vec::new();

    let mut k = 0;
    while k < tokens.len() {
        let token = tokens[k];
        let word = lower(token);
        let position = token.position().unwrap_or_default();
        let sentence_no = sentence(token);

        let count = if let Some(n) = lexicon::repetition_count(word) {
            Some(n)
        } else if token.text("pos") == Some("CD")
            && tokens.get(k + 1).is_some_and(|t| lower(t) == "times")
        {
            lexicon::number_value(word)
        } else {
            None
        };

        if let Some(count) = count {
            if count == 0 {
                return Err(StageError::execution(
                    stage,
                    format!("repetition count at position {position} is zero"),
                ));
            }
            let body = count_scope(graph, token);
            if body.is_empty() {
                return Err(StageError::execution(
                    stage,
                    format!("repetition '{word}' at position {position} has no action to repeat"),
                ));
            }
            found.push(Detected {
                kind: KIND_COUNT,
                count: Some(count),
                condition: None,
                position,
                sentence: sentence_no,
                clause: Vec::new(),
                body,
            });
            k += 1;
            continue;
        }

        if lexicon::contains(lexicon::LOOP_WORDS, word) {
            let end = (k + 1..tokens.len())
                .find(|&i| {
                    sentence(tokens[i]) != sentence_no
                        || matches!(tokens[i].text("pos"), Some("," | "."))
                })
                .unwrap_or(tokens.len());
            let condition = tokens[k + 1..end]
                .iter()
                .filter_map(|t| t.text("word"))
                .collect::<Vec<_>>()
                .join(" ");
            if condition.is_empty() {
                return Err(StageError::execution(
                    stage,
                    format!("loop condition after '{word}' is empty"),
                ));
            }
            let clause_stop = tokens
                .get(end)
                .and_then(|t| t.position())
                .unwrap_or(position + (end - k));
            let clause = actions_between(graph, position + 1, clause_stop);

            let steps: Vec<NodeId> = step_actions_in_sentence(graph, sentence_no)
                .into_iter()
                .filter(|id| !clause.contains(id))
                .collect();
            let before: Vec<NodeId> = steps
                .iter()
                .copied()
                .filter(|&id| position_of(graph, id) < position)
                .collect();
            let body = if before.is_empty() {
                steps
                    .into_iter()
                    .filter(|&id| position_of(graph, id) >= clause_stop)
                    .collect()
            } else {
                before
            };
            if body.is_empty() {
                return Err(StageError::execution(
                    stage,
                    format!("loop '{word} {condition}' governs no action"),
                ));
            }

            found.push(Detected {
                kind: if word == "until" { KIND_UNTIL } else { KIND_WHILE },
                count: None,
                condition: Some(condition),
                position,
                sentence: sentence_no,
                clause,
                body,
            });
            k = end;
            continue;
        }
        k += 1;
    }
    Ok(found)
}

impl Stage<Graph> for LoopDetector {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut graph: Graph) -> Result<Graph, StageError> {
        let name = self.descriptor.name;
        graph.require(name, Capability::Conditions)?;
        let loops = detect(&graph, name)?;

        for detected in &loops {
            let node = graph.add_node(NodeKind::Loop);
            graph.set_attr(node, "kind", detected.kind);
            if let Some(count) = detected.count {
                graph.set_attr(node, "count", i64::from(count));
            }
            if let Some(condition) = &detected.condition {
                graph.set_attr(node, "condition", condition.as_str());
            }
            graph.set_attr(node, "position", detected.position);
            graph.set_attr(node, "sentence", detected.sentence);
            for &action in &detected.clause {
                graph.set_attr(action, "in_condition", true);
            }
            for &action in &detected.body {
                graph.add_edge(node, action, EdgeKind::Scope, Some("body"));
            }
            tracing::info!(kind = detected.kind, body = detected.body.len(), "Loop detected");
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::agents::fixtures::analyze;
    use crate::stages::agents::{
        ActionRecognizer, ConditionDetector, ContextAnalyzer, CorefAnalyzer, Wsd,
    };

    fn detect_in(text: &str) -> Graph {
        analyze(
            text,
            vec![
                Box::new(Wsd::new()),
                Box::new(ActionRecognizer::new()),
                Box::new(ContextAnalyzer::new()),
                Box::new(CorefAnalyzer::new()),
                Box::new(ConditionDetector::new()),
                Box::new(LoopDetector::new()),
            ],
        )
    }

    fn body(graph: &Graph, node: NodeId) -> Vec<String> {
        graph
            .edges_from(node, EdgeKind::Scope)
            .filter_map(|e| graph.node(e.to))
            .filter_map(|n| n.text("verb"))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_count_loop() {
        let graph = detect_in("Wave 3 times and nod.");
        let node = graph.nodes_of(NodeKind::Loop).next().unwrap();
        assert_eq!(node.text("kind"), Some(KIND_COUNT));
        assert_eq!(node.int("count"), Some(3));
        assert_eq!(body(&graph, node.id), vec!["wave"]);
    }

    #[test]
    fn test_repetition_adverb() {
        let graph = detect_in("Knock on the door. Then wave twice.");
        let node = graph.nodes_of(NodeKind::Loop).next().unwrap();
        assert_eq!(node.int("count"), Some(2));
        assert_eq!(body(&graph, node.id), vec!["wave"]);
    }

    #[test]
    fn test_until_loop_marks_clause() {
        let graph = detect_in("Stir the milk until it is hot.");
        let node = graph.nodes_of(NodeKind::Loop).next().unwrap();
        assert_eq!(node.text("kind"), Some(KIND_UNTIL));
        assert_eq!(node.text("condition"), Some("it is hot"));
        assert_eq!(body(&graph, node.id), vec!["stir"]);
    }

    #[test]
    fn test_while_loop_before_actions() {
        let graph = detect_in("While the light is on, wave.");
        let node = graph.nodes_of(NodeKind::Loop).next().unwrap();
        assert_eq!(node.text("kind"), Some(KIND_WHILE));
        assert_eq!(node.text("condition"), Some("the light is on"));
        assert_eq!(body(&graph, node.id), vec!["wave"]);
    }

    #[test]
    fn test_zero_count_is_rejected() {
        let graph = analyze(
            "Wave 0 times.",
            vec![
                Box::new(Wsd::new()),
                Box::new(ActionRecognizer::new()),
                Box::new(ContextAnalyzer::new()),
                Box::new(CorefAnalyzer::new()),
                Box::new(ConditionDetector::new()),
            ],
        );
        let mut stage = LoopDetector::new();
        stage.init().unwrap();
        let err = stage.execute(graph).unwrap_err();
        assert!(err.to_string().contains("zero"));
    }
}
