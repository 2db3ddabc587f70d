use std::collections::BTreeSet;

use crate::data::{Capability, EdgeKind, Graph, Node, NodeId, NodeKind};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::agents::{ARG_PREFIX, action_ids, is_step_candidate};
use crate::stages::lexicon;
use crate::stages::pre::ROLE_PATIENT;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "method-synthesizer",
    &[
        Capability::Actions,
        Capability::TeachingSequences,
        Capability::Conditions,
        Capability::Loops,
        Capability::Concurrency,
    ],
    &[Capability::Methods],
);

/// Default name of the method holding the top-level program.
pub const DEFAULT_METHOD_NAME: &str = "execute";

/// Groups the executable actions into methods: one per taught sequence,
/// plus the main method holding everything else.
///
/// An action whose verb phrase names a taught method (`make coffee` after
/// `to make coffee means ...`) becomes a call to that method.
pub struct MethodSynthesizer {
    descriptor: StageDescriptor,
    method_name: String,
}

impl Default for MethodSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_METHOD_NAME)
    }
}

impl MethodSynthesizer {
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            descriptor: DESCRIPTOR,
            method_name: method_name.into(),
        }
    }
}

/// Method names an action could be invoking: its verb with the patient
/// (`makeCoffee`) or the bare verb (`tidy`).
fn invocation_candidates(action: &Node) -> Vec<String> {
    let verb = action.text("verb").unwrap_or_default();
    let mut candidates = Vec::new();
    if let Some(patient) = action.text(&format!("{ARG_PREFIX}{ROLE_PATIENT}")) {
        let mut words = vec![verb.to_string()];
        words.extend(patient.split_whitespace().map(lexicon::lemma));
        candidates.push(lexicon::camel_case(&words));
    }
    candidates.push(lexicon::camel_case(&[verb]));
    candidates
}

struct Taught {
    name: String,
    position: usize,
}

impl Stage<Graph> for MethodSynthesizer {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        if !crate::settings::is_identifier(&self.method_name) {
            return Err(StageError::initialization(
                self.descriptor.name,
                format!("'{}' is not a valid method name", self.method_name),
            ));
        }
        Ok(())
    }

    fn execute(&mut self, mut graph: Graph) -> Result<Graph, StageError> {
        let name = self.descriptor.name;
        for &capability in self.descriptor.requires {
            graph.require(name, capability)?;
        }

        let actions = action_ids(&graph);
        if !actions
            .iter()
            .filter_map(|&id| graph.node(id))
            .any(|n| n.flag("recognized"))
        {
            return Err(StageError::execution(name, "no recognized action in the input"));
        }

        let mut taught: Vec<Taught> = graph
            .nodes_of(NodeKind::Teaching)
            .map(|n| Taught {
                name: n.text("name").unwrap_or_default().to_string(),
                position: n.position().unwrap_or_default(),
            })
            .collect();
        taught.sort_by_key(|t| t.position);
        let taught_names: BTreeSet<&str> = taught.iter().map(|t| t.name.as_str()).collect();
        if taught_names.contains(self.method_name.as_str()) {
            return Err(StageError::execution(
                name,
                format!(
                    "taught method '{}' collides with the main method name",
                    self.method_name
                ),
            ));
        }

        // Resolve calls to taught methods; a method never invokes itself.
        let mut invocations: Vec<(NodeId, String)> = Vec::new();
        for &id in &actions {
            let Some(action) = graph.node(id) else { continue };
            if !is_step_candidate(action) {
                continue;
            }
            let own = action.text("taught_in");
            if let Some(target) = invocation_candidates(action)
                .into_iter()
                .find(|c| taught_names.contains(c.as_str()) && own != Some(c.as_str()))
            {
                invocations.push((id, target));
            }
        }
        for (id, target) in invocations {
            tracing::debug!(method = %target, "Action invokes taught method");
            graph.set_attr(id, "invokes", target);
        }

        let mut steps_by_method: Vec<(String, bool, usize, Vec<NodeId>)> = taught
            .iter()
            .map(|t| (t.name.clone(), false, t.position, Vec::new()))
            .collect();
        let mut main_steps = Vec::new();
        for &id in &actions {
            let Some(action) = graph.node(id) else { continue };
            if !is_step_candidate(action) {
                continue;
            }
            if !action.flag("recognized") && action.text("invokes").is_none() {
                tracing::warn!(
                    verb = action.text("verb").unwrap_or_default(),
                    "Dropping action the robot cannot execute"
                );
                continue;
            }
            match action.text("taught_in") {
                Some(method) => {
                    if let Some(entry) = steps_by_method.iter_mut().find(|m| m.0 == method) {
                        entry.3.push(id);
                    }
                }
                None => main_steps.push(id),
            }
        }

        if let Some(empty) = steps_by_method.iter().find(|m| m.3.is_empty()) {
            return Err(StageError::execution(
                name,
                format!("taught method '{}' has no executable steps", empty.0),
            ));
        }
        steps_by_method.push((self.method_name.clone(), true, 0, main_steps));

        for (method, main, position, steps) in &steps_by_method {
            let node = graph.add_node(NodeKind::Method);
            graph.set_attr(node, "name", method.as_str());
            graph.set_attr(node, "main", *main);
            graph.set_attr(node, "position", *position);
            for (index, &step) in steps.iter().enumerate() {
                graph.add_edge(node, step, EdgeKind::Step, Some(index.to_string().as_str()));
            }
            tracing::info!(method = %method, steps = steps.len(), "Method synthesized");
        }

        Ok(graph)
    }
}
