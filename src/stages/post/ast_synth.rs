//! Turns the method nodes of the analyzed graph into an AST.
//!
//! Each method's steps form a block. Within a block the control structures
//! found by the agents (conditions, loops, concurrency groups) are nested
//! outermost first: the structure covering most of the block wins, with
//! conditions before loops before concurrency on ties.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::data::{
    Argument, Ast, Call, Capability, EdgeKind, Graph, MethodDecl, Node, NodeId, NodeKind,
    PostPipelineData, Statement,
};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::agents::ARG_PREFIX;
use crate::stages::pre::{
    ROLE_DESTINATION, ROLE_INSTRUMENT, ROLE_LOCATION, ROLE_PATIENT, ROLE_SOURCE,
};

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "ast-synthesizer",
    &[Capability::Methods],
    &[Capability::SynthesizedAst],
);

/// Roles that become call arguments, in argument order.
pub const CALL_ROLES: [&str; 5] = [
    ROLE_PATIENT,
    ROLE_DESTINATION,
    ROLE_LOCATION,
    ROLE_SOURCE,
    ROLE_INSTRUMENT,
];

pub struct AstSynthesizer {
    descriptor: StageDescriptor,
}

impl Default for AstSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AstSynthesizer {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

/// A control structure and the actions it scopes, by edge label.
struct Structure<'g> {
    node: &'g Node,
    priority: u8,
    scope: Vec<(NodeId, String)>,
}

impl Structure<'_> {
    fn contains(&self, id: NodeId) -> bool {
        self.scope.iter().any(|(a, _)| *a == id)
    }

    fn overlap(&self, block: &[NodeId]) -> usize {
        block.iter().filter(|&&id| self.contains(id)).count()
    }

    fn labeled(&self, members: &[NodeId], label: &str) -> Vec<NodeId> {
        members
            .iter()
            .copied()
            .filter(|&id| self.scope.iter().any(|(a, l)| *a == id && l == label))
            .collect()
    }
}

struct Builder<'g> {
    graph: &'g Graph,
    stage: &'static str,
    structures: Vec<Structure<'g>>,
}

impl<'g> Builder<'g> {
    fn new(graph: &'g Graph, stage: &'static str) -> Self {
        let mut structures = Vec::new();
        for (kind, priority) in [
            (NodeKind::Condition, 0),
            (NodeKind::Loop, 1),
            (NodeKind::Concurrency, 2),
        ] {
            for node in graph.nodes_of(kind) {
                let scope = graph
                    .edges_from(node.id, EdgeKind::Scope)
                    .map(|e| (e.to, e.label.clone().unwrap_or_default()))
                    .collect();
                structures.push(Structure {
                    node,
                    priority,
                    scope,
                });
            }
        }
        Self {
            graph,
            stage,
            structures,
        }
    }

    fn method(&self, node: &Node) -> Result<MethodDecl, StageError> {
        let mut steps: Vec<(usize, NodeId)> = self
            .graph
            .edges_from(node.id, EdgeKind::Step)
            .enumerate()
            .map(|(i, e)| {
                let index = e.label.as_deref().and_then(|l| l.parse().ok()).unwrap_or(i);
                (index, e.to)
            })
            .collect();
        steps.sort_by_key(|(index, _)| *index);
        let steps: Vec<NodeId> = steps.into_iter().map(|(_, id)| id).collect();

        let mut used = BTreeSet::new();
        Ok(MethodDecl {
            name: node.text("name").unwrap_or_default().to_string(),
            main: node.flag("main"),
            body: self.block(&steps, &mut used)?,
        })
    }

    fn block(
        &self,
        steps: &[NodeId],
        used: &mut BTreeSet<NodeId>,
    ) -> Result<Vec<Statement>, StageError> {
        let mut remaining = steps.to_vec();
        let mut statements = Vec::new();

        while let Some(&first) = remaining.first() {
            let outermost = self
                .structures
                .iter()
                .filter(|s| !used.contains(&s.node.id) && s.contains(first))
                .max_by_key(|s| (s.overlap(&remaining), Reverse(s.priority), Reverse(s.node.id)));

            match outermost {
                None => {
                    statements.push(self.call(first)?);
                    remaining.remove(0);
                }
                Some(structure) => {
                    used.insert(structure.node.id);
                    let members: Vec<NodeId> = remaining
                        .iter()
                        .copied()
                        .filter(|&id| structure.contains(id))
                        .collect();
                    remaining.retain(|id| !members.contains(id));
                    statements.push(self.structure(structure, &members, used)?);
                }
            }
        }
        Ok(statements)
    }

    fn structure(
        &self,
        structure: &Structure<'_>,
        members: &[NodeId],
        used: &mut BTreeSet<NodeId>,
    ) -> Result<Statement, StageError> {
        let node = structure.node;
        let text = |key: &str| node.text(key).unwrap_or_default().to_string();
        match node.kind {
            NodeKind::Condition => Ok(Statement::If {
                condition: text("text"),
                negated: node.flag("negated"),
                then_branch: self.block(&structure.labeled(members, "then"), used)?,
                else_branch: self.block(&structure.labeled(members, "else"), used)?,
            }),
            NodeKind::Loop if node.text("kind") == Some("count") => {
                let count = node
                    .int("count")
                    .and_then(|c| u32::try_from(c).ok())
                    .filter(|&c| c > 0)
                    .ok_or_else(|| {
                        StageError::execution(self.stage, "count loop without a positive count")
                    })?;
                Ok(Statement::Repeat {
                    count,
                    body: self.block(members, used)?,
                })
            }
            NodeKind::Loop => Ok(Statement::While {
                condition: text("condition"),
                until: node.text("kind") == Some("until"),
                body: self.block(members, used)?,
            }),
            _ => {
                let mut branches = Vec::new();
                for &member in members {
                    branches.extend(self.block(&[member], used)?);
                }
                Ok(Statement::Parallel { branches })
            }
        }
    }

    fn call(&self, id: NodeId) -> Result<Statement, StageError> {
        let action = self
            .graph
            .node(id)
            .filter(|n| n.kind == NodeKind::Action)
            .ok_or_else(|| {
                StageError::execution(self.stage, format!("step {} is not an action", id.0))
            })?;

        if let Some(method) = action.text("invokes") {
            return Ok(Statement::Call(Call {
                name: method.to_string(),
                local: true,
                args: Vec::new(),
            }));
        }
        let args = CALL_ROLES
            .iter()
            .filter_map(|role| {
                action
                    .text(&format!("{ARG_PREFIX}{role}"))
                    .map(|value| Argument {
                        role: role.to_string(),
                        value: value.to_string(),
                    })
            })
            .collect();
        Ok(Statement::Call(Call {
            name: action.text("verb").unwrap_or_default().to_string(),
            local: false,
            args,
        }))
    }
}

/// Build the AST: taught methods in order of appearance, then the main method.
pub fn synthesize(graph: &Graph, stage: &'static str) -> Result<Ast, StageError> {
    let mut methods: Vec<&Node> = graph.nodes_of(NodeKind::Method).collect();
    if methods.is_empty() {
        return Err(StageError::execution(stage, "the graph has no method nodes"));
    }
    methods.sort_by_key(|m| (m.flag("main"), m.position(), m.id));

    let builder = Builder::new(graph, stage);
    let methods = methods
        .into_iter()
        .map(|m| builder.method(m))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Ast { methods })
}

impl Stage<PostPipelineData> for AstSynthesizer {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut input: PostPipelineData) -> Result<PostPipelineData, StageError> {
        let ast = synthesize(input.graph(), self.descriptor.name)?;
        tracing::debug!(methods = ast.methods.len(), "AST synthesized");
        input.set_ast(ast);
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::agents::fixtures::analyzed;

    fn ast_for(text: &str) -> Ast {
        synthesize(&analyzed(text), "ast-synthesizer").unwrap()
    }

    fn call_names(statements: &[Statement]) -> Vec<String> {
        statements
            .iter()
            .filter_map(|s| match s {
                Statement::Call(call) => Some(call.name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_sequence_becomes_calls_with_arguments() {
        let ast = ast_for("Move the robot arm to position A and then close the gripper.");
        let main = ast.main_method().unwrap();
        assert_eq!(main.name, "execute");
        assert_eq!(call_names(&main.body), vec!["move", "close"]);
        let Statement::Call(first) = &main.body[0] else {
            panic!("expected a call");
        };
        assert_eq!(
            first.args,
            vec![
                Argument {
                    role: "A1".into(),
                    value: "robot arm".into()
                },
                Argument {
                    role: "A2".into(),
                    value: "position A".into()
                },
            ]
        );
    }

    #[test]
    fn test_condition_nests_branches() {
        let ast = ast_for("If the door is open, close it, otherwise wave.");
        let main = ast.main_method().unwrap();
        assert_eq!(main.body.len(), 1);
        let Statement::If {
            condition,
            then_branch,
            else_branch,
            negated,
        } = &main.body[0]
        else {
            panic!("expected an if statement");
        };
        assert_eq!(condition, "the door is open");
        assert!(!negated);
        assert_eq!(call_names(then_branch), vec!["close"]);
        assert_eq!(call_names(else_branch), vec!["wave"]);
    }

    #[test]
    fn test_loop_inside_sequence() {
        let ast = ast_for("Open the door. Wave 3 times and nod.");
        let kinds: Vec<_> = ast.main_method().unwrap().body.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec!["call", "repeat", "call"]);
    }

    #[test]
    fn test_parallel_branches() {
        let ast = ast_for("Wave and nod at the same time.");
        let main = ast.main_method().unwrap();
        let Statement::Parallel { branches } = &main.body[0] else {
            panic!("expected parallel");
        };
        assert_eq!(call_names(branches), vec!["wave", "nod"]);
    }

    #[test]
    fn test_taught_method_precedes_main_and_is_called_locally() {
        let ast =
            ast_for("To make coffee means to grab the cup and pour the coffee. Make coffee.");
        let names: Vec<_> = ast.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["makeCoffee", "execute"]);
        let Statement::Call(call) = &ast.main_method().unwrap().body[0] else {
            panic!("expected a call");
        };
        assert!(call.local);
        assert_eq!(call.name, "makeCoffee");
    }

    #[test]
    fn test_graph_without_methods_is_rejected() {
        assert!(synthesize(&Graph::new(), "ast-synthesizer").is_err());
    }
}
