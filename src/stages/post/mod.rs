//! Post-processing stages: from the analyzed graph to injected code.

mod ast_extract;
mod ast_synth;
mod codegen;
mod inject;

pub use ast_extract::{AstExtractor, summarize};
pub use ast_synth::{AstSynthesizer, CALL_ROLES, synthesize};
pub use codegen::{CodeGenerator, DEFAULT_RECEIVER};
pub use inject::CodeInjector;
