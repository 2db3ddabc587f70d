//! Intermediate representation threaded between the pipeline phases.
//!
//! - `PrePipelineData`: raw input plus linguistic annotations (pre phase)
//! - `Graph`: semantic node/edge structure (agent phase)
//! - `PostPipelineData`: final graph plus generated artifacts (post phase)

mod ast;
mod capability;
mod graph;
mod hypothesis;
mod post;
mod pre;

pub use ast::{Argument, Ast, Call, MethodDecl, MethodSummary, Statement};
pub use capability::{Annotated, Capability};
pub use graph::{AttrValue, Edge, EdgeKind, Graph, Node, NodeId, NodeKind};
pub use hypothesis::{Hypothesis, SrlArgument, SrlFrame, Token};
pub use post::{Injection, PostPipelineData};
pub use pre::{InputKind, InputSource, PrePipelineData};
