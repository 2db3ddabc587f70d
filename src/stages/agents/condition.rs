use crate::data::{Capability, EdgeKind, Graph, Node, NodeId, NodeKind};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::agents::{actions_between, lower, sentence, step_actions_in_sentence};
use crate::stages::lexicon;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "condition-detector",
    &[Capability::Actions, Capability::Coreference],
    &[Capability::Conditions],
);

/// Detects `if/when/whenever/unless` clauses and the actions they govern.
///
/// A leading clause (`if the door is open, close it`) governs the actions
/// after it up to `else/otherwise`; a trailing clause (`close the door if
/// it is open`) governs the actions before it. An `otherwise` opening the
/// next sentence continues the alternative branch there.
pub struct ConditionDetector {
    descriptor: StageDescriptor,
}

impl Default for ConditionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionDetector {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

struct Detected {
    keyword: String,
    text: String,
    position: usize,
    sentence: i64,
    clause: Vec<NodeId>,
    then_branch: Vec<NodeId>,
    else_branch: Vec<NodeId>,
}

fn position_of(graph: &Graph, id: NodeId) -> usize {
    graph.node(id).and_then(Node::position).unwrap_or_default()
}

/// Sentence-local token range `[start, end)` containing `index`.
fn sentence_range(tokens: &[&Node], index: usize) -> (usize, usize) {
    let s = sentence(tokens[index]);
    let start = (0..index)
        .rev()
        .take_while(|&i| sentence(tokens[i]) == s)
        .last()
        .unwrap_or(index);
    let end = (index..tokens.len())
        .take_while(|&i| sentence(tokens[i]) == s)
        .last()
        .map_or(index + 1, |i| i + 1);
    (start, end)
}

fn is_punctuation(node: &Node) -> bool {
    matches!(node.text("pos"), Some("." | "," | ":"))
}

fn detect(graph: &Graph, stage: &str) -> Result<Vec<Detected>, StageError> {
    let tokens = graph.tokens();
    let mut found = Vec::new();

    for (k, token) in tokens.iter().enumerate() {
        let keyword = lower(token);
        if !lexicon::contains(lexicon::CONDITION_WORDS, keyword) {
            continue;
        }
        let sentence_no = sentence(token);
        let (start, end) = sentence_range(&tokens, k);
        let leading = (start..k).all(|i| {
            !lexicon::is_predicate(tokens[i].text("pos"), lower(tokens[i]))
        });

        // Leading clauses close at a comma or "then", else before the first
        // executable action; trailing clauses run to a comma or the sentence end.
        let separator = (k + 1..end).find(|&i| {
            tokens[i].text("pos") == Some(",") || lower(tokens[i]) == "then"
        });
        let clause_end = match separator {
            Some(i) => i,
            None if leading => (k + 2..end)
                .find(|&i| {
                    lexicon::is_predicate(tokens[i].text("pos"), lower(tokens[i]))
                        && lexicon::is_action_verb(
                            tokens[i].text("lemma").unwrap_or_else(|| lower(tokens[i])),
                        )
                })
                .unwrap_or(end),
            None => end,
        };

        let text = tokens[k + 1..clause_end]
            .iter()
            .filter(|t| !is_punctuation(t))
            .filter_map(|t| t.text("word"))
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            return Err(StageError::execution(
                stage,
                format!("condition after '{keyword}' is empty"),
            ));
        }

        let position = token.position().unwrap_or_default();
        let clause_start = position + 1;
        let clause_stop = tokens
            .get(clause_end)
            .and_then(|t| t.position())
            .unwrap_or(position + (clause_end - k));
        let clause = actions_between(graph, clause_start, clause_stop);

        // The branch stops at an alternative or at the next condition.
        let branch_limit = (clause_end..end)
            .find(|&i| {
                lexicon::contains(lexicon::ELSE_WORDS, lower(tokens[i]))
                    || lexicon::contains(lexicon::CONDITION_WORDS, lower(tokens[i]))
            })
            .unwrap_or(end);
        let else_start = (branch_limit < end
            && lexicon::contains(lexicon::ELSE_WORDS, lower(tokens[branch_limit])))
        .then_some(branch_limit);

        let steps = step_actions_in_sentence(graph, sentence_no);
        let in_range = |lo: usize, hi: usize| -> Vec<NodeId> {
            steps
                .iter()
                .copied()
                .filter(|&id| !clause.contains(&id))
                .filter(|&id| {
                    let p = position_of(graph, id);
                    p >= lo && p < hi
                })
                .collect()
        };
        let abs = |i: usize| tokens.get(i).and_then(|t| t.position()).unwrap_or(usize::MAX);

        let then_branch = if leading {
            in_range(abs(clause_end), abs(branch_limit))
        } else {
            in_range(abs(start), position)
        };

        let mut else_branch = match else_start {
            Some(i) => {
                let stop = (i + 1..end)
                    .find(|&j| lexicon::contains(lexicon::CONDITION_WORDS, lower(tokens[j])))
                    .unwrap_or(end);
                in_range(abs(i), abs(stop))
            }
            None => Vec::new(),
        };
        if else_start.is_none()
            && let Some(next) = tokens.get(end)
            && lexicon::contains(lexicon::ELSE_WORDS, lower(next))
        {
            else_branch = step_actions_in_sentence(graph, sentence(next));
        }

        if then_branch.is_empty() {
            return Err(StageError::execution(
                stage,
                format!("condition '{text}' governs no action"),
            ));
        }

        found.push(Detected {
            keyword: keyword.to_string(),
            text,
            position,
            sentence: sentence_no,
            clause,
            then_branch,
            else_branch,
        });
    }
    Ok(found)
}

impl Stage<Graph> for ConditionDetector {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut graph: Graph) -> Result<Graph, StageError> {
        let name = self.descriptor.name;
        graph.require(name, Capability::Coreference)?;
        let conditions = detect(&graph, name)?;

        for condition in &conditions {
            let node = graph.add_node(NodeKind::Condition);
            graph.set_attr(node, "text", condition.text.as_str());
            graph.set_attr(node, "keyword", condition.keyword.as_str());
            graph.set_attr(node, "negated", condition.keyword == "unless");
            graph.set_attr(node, "position", condition.position);
            graph.set_attr(node, "sentence", condition.sentence);
            for &action in &condition.clause {
                graph.set_attr(action, "in_condition", true);
            }
            for &action in &condition.then_branch {
                graph.add_edge(node, action, EdgeKind::Scope, Some("then"));
            }
            for &action in &condition.else_branch {
                graph.add_edge(node, action, EdgeKind::Scope, Some("else"));
            }
            tracing::info!(
                condition = %condition.text,
                then = condition.then_branch.len(),
                otherwise = condition.else_branch.len(),
                "Condition detected"
            );
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::agents::fixtures::analyze;
    use crate::stages::agents::{ActionRecognizer, ContextAnalyzer, CorefAnalyzer, Wsd};

    fn detect_in(text: &str) -> Graph {
        analyze(
            text,
            vec![
                Box::new(Wsd::new()),
                Box::new(ActionRecognizer::new()),
                Box::new(ContextAnalyzer::new()),
                Box::new(CorefAnalyzer::new()),
                Box::new(ConditionDetector::new()),
            ],
        )
    }

    fn branch(graph: &Graph, condition: NodeId, label: &str) -> Vec<String> {
        graph
            .edges_from(condition, EdgeKind::Scope)
            .filter(|e| e.label.as_deref() == Some(label))
            .filter_map(|e| graph.node(e.to))
            .filter_map(|n| n.text("verb"))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_leading_condition_with_else() {
        let graph = detect_in("If the door is open, close it, otherwise wave.");
        let condition = graph.nodes_of(NodeKind::Condition).next().unwrap();
        assert_eq!(condition.text("text"), Some("the door is open"));
        assert_eq!(condition.text("keyword"), Some("if"));
        assert!(!condition.flag("negated"));
        assert_eq!(branch(&graph, condition.id, "then"), vec!["close"]);
        assert_eq!(branch(&graph, condition.id, "else"), vec!["wave"]);
    }

    #[test]
    fn test_otherwise_in_next_sentence() {
        let graph = detect_in("If the cup is full, pour the water. Otherwise fill the cup.");
        let condition = graph.nodes_of(NodeKind::Condition).next().unwrap();
        assert_eq!(branch(&graph, condition.id, "then"), vec!["pour"]);
        assert_eq!(branch(&graph, condition.id, "else"), vec!["fill"]);
    }

    #[test]
    fn test_trailing_unless_condition() {
        let graph = detect_in("Close the door unless the light is on.");
        let condition = graph.nodes_of(NodeKind::Condition).next().unwrap();
        assert!(condition.flag("negated"));
        assert_eq!(condition.text("text"), Some("the light is on"));
        assert_eq!(branch(&graph, condition.id, "then"), vec!["close"]);
    }

    #[test]
    fn test_clause_actions_are_marked() {
        let graph = detect_in("When you see the cup, grab it.");
        let see = graph
            .nodes_of(NodeKind::Action)
            .find(|a| a.text("verb") == Some("see"))
            .unwrap();
        assert!(see.flag("in_condition"));
        let condition = graph.nodes_of(NodeKind::Condition).next().unwrap();
        assert_eq!(branch(&graph, condition.id, "then"), vec!["grab"]);
    }

    #[test]
    fn test_no_condition_in_plain_sequence() {
        let graph = detect_in("Move the robot arm to position A and then close the gripper.");
        assert_eq!(graph.count_of(NodeKind::Condition), 0);
    }
}
