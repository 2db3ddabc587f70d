//! Semantic graph threaded through the agent phase.
//!
//! Nodes and edges live in insertion-ordered vectors and node attributes in
//! `BTreeMap`s, so two runs over the same input serialize identically.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::capability::{Annotated, Capability};
use crate::errors::StageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Token,
    Action,
    Entity,
    Condition,
    Loop,
    Concurrency,
    Method,
    Teaching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Token to the following token
    Next,
    /// Action to a token filling one of its semantic roles
    Role,
    /// Entity to a token that mentions it
    Mention,
    /// Pronoun token to the entity it refers to
    Reference,
    /// Control structure or teaching sequence to an action it governs
    Scope,
    /// Method to one of its body steps
    Step,
}

/// Attribute value stored on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::List(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Node {
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(AttrValue::as_text)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.attr(key).and_then(AttrValue::as_int)
    }

    /// Boolean attribute, `false` when absent.
    pub fn flag(&self, key: &str) -> bool {
        self.attr(key).and_then(AttrValue::as_bool).unwrap_or(false)
    }

    /// Token position for token nodes, or the anchoring token position for
    /// nodes derived from tokens.
    pub fn position(&self) -> Option<usize> {
        self.int("position").map(|p| p as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    annotations: BTreeSet<Capability>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a graph that inherits the annotations of the data it was built from.
    pub fn with_annotations(annotations: BTreeSet<Capability>) -> Self {
        Self {
            annotations,
            ..Self::default()
        }
    }

    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            kind,
            attributes: BTreeMap::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Set an attribute; ignored for unknown ids.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: impl Into<AttrValue>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.attributes.insert(key.to_string(), value.into());
        }
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind, label: Option<&str>) {
        self.edges.push(Edge {
            from,
            to,
            kind,
            label: label.map(str::to_string),
        });
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn count_of(&self, kind: NodeKind) -> usize {
        self.nodes_of(kind).count()
    }

    pub fn edges_from(&self, id: NodeId, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(move |e| e.from == id && e.kind == kind)
    }

    pub fn edges_to(&self, id: NodeId, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.to == id && e.kind == kind)
    }

    /// Token nodes ordered by position.
    pub fn tokens(&self) -> Vec<&Node> {
        let mut tokens: Vec<&Node> = self.nodes_of(NodeKind::Token).collect();
        tokens.sort_by_key(|n| n.position());
        tokens
    }

    /// Token node at a given position.
    pub fn token_at(&self, position: usize) -> Option<&Node> {
        self.nodes_of(NodeKind::Token)
            .find(|n| n.position() == Some(position))
    }

    /// Check that an upstream stage contributed `capability`.
    pub fn require(&self, stage: &str, capability: Capability) -> Result<(), StageError> {
        if self.annotations.contains(&capability) {
            Ok(())
        } else {
            Err(StageError::missing(stage, capability.field()))
        }
    }
}

impl Annotated for Graph {
    fn annotations(&self) -> &BTreeSet<Capability> {
        &self.annotations
    }

    fn annotate(&mut self, capability: Capability) {
        self.annotations.insert(capability);
    }
}
