//! Python code generation.
//!
//! Actions become method calls on a receiver object passed to every
//! generated function:
//!
//! ```text
//! def execute(robot):
//!     robot.move("robot arm", to="position A")
//!     robot.close("gripper")
//! ```

use std::fmt::Write as _;

use crate::data::{Ast, Call, Capability, MethodDecl, MethodSummary, PostPipelineData, Statement};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::lexicon::python_identifier;
use crate::stages::pre::{ROLE_DESTINATION, ROLE_INSTRUMENT, ROLE_LOCATION, ROLE_SOURCE};

use super::ast_extract::summarize;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "code-generator",
    &[Capability::SynthesizedAst, Capability::ExtractedAst],
    &[Capability::GeneratedCode],
);

const INDENT: &str = "    ";

/// Default name of the receiver object.
pub const DEFAULT_RECEIVER: &str = "robot";

pub struct CodeGenerator {
    descriptor: StageDescriptor,
    receiver: String,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_RECEIVER)
    }
}

impl CodeGenerator {
    pub fn new(receiver: impl Into<String>) -> Self {
        Self {
            descriptor: DESCRIPTOR,
            receiver: receiver.into(),
        }
    }

    pub fn generate(&self, ast: &Ast) -> String {
        let mut out = String::from("# Generated by synthflow.\n");
        let names: Vec<String> = ast
            .methods
            .iter()
            .map(|m| python_identifier(&m.name))
            .collect();
        let _ = writeln!(out, "# Methods: {}", names.join(", "));
        for method in &ast.methods {
            out.push_str("\n\n");
            self.method(&mut out, method);
        }
        out
    }

    fn method(&self, out: &mut String, method: &MethodDecl) {
        let _ = writeln!(
            out,
            "def {}({}):",
            python_identifier(&method.name),
            self.receiver
        );
        let mut branch_counter = 0;
        self.block(out, &method.body, 1, &mut branch_counter);
    }

    fn block(&self, out: &mut String, body: &[Statement], depth: usize, branches: &mut usize) {
        if body.is_empty() {
            line(out, depth, "pass");
            return;
        }
        for statement in body {
            self.statement(out, statement, depth, branches);
        }
    }

    fn statement(
        &self,
        out: &mut String,
        statement: &Statement,
        depth: usize,
        branches: &mut usize,
    ) {
        match statement {
            Statement::Call(call) => line(out, depth, &self.call(call)),
            Statement::If {
                condition,
                negated,
                then_branch,
                else_branch,
            } => {
                line(out, depth, &format!("if {}:", self.condition(condition, *negated)));
                self.block(out, then_branch, depth + 1, branches);
                if !else_branch.is_empty() {
                    line(out, depth, "else:");
                    self.block(out, else_branch, depth + 1, branches);
                }
            }
            Statement::Repeat { count, body } => {
                line(out, depth, &format!("for _ in range({count}):"));
                self.block(out, body, depth + 1, branches);
            }
            Statement::While {
                condition,
                until,
                body,
            } => {
                line(out, depth, &format!("while {}:", self.condition(condition, *until)));
                self.block(out, body, depth + 1, branches);
            }
            Statement::Parallel { branches: parallel } => {
                // Compound branches need a named function; calls fit in a lambda.
                let mut callables = Vec::with_capacity(parallel.len());
                for branch in parallel {
                    match branch {
                        Statement::Call(call) => {
                            callables.push(format!("lambda: {}", self.call(call)));
                        }
                        compound => {
                            *branches += 1;
                            let name = format!("_branch_{branches}");
                            line(out, depth, &format!("def {name}():"));
                            self.statement(out, compound, depth + 1, branches);
                            callables.push(name);
                        }
                    }
                }
                line(out, depth, &format!("{}.run_parallel(", self.receiver));
                for callable in callables {
                    line(out, depth + 1, &format!("{callable},"));
                }
                line(out, depth, ")");
            }
        }
    }

    fn call(&self, call: &Call) -> String {
        if call.local {
            return format!("{}({})", python_identifier(&call.name), self.receiver);
        }
        let args: Vec<String> = call
            .args
            .iter()
            .map(|arg| match keyword(&arg.role) {
                Some(keyword) => format!("{keyword}={}", quote(&arg.value)),
                None => quote(&arg.value),
            })
            .collect();
        format!(
            "{}.{}({})",
            self.receiver,
            python_identifier(&call.name),
            args.join(", ")
        )
    }

    fn condition(&self, text: &str, negated: bool) -> String {
        let test = format!("{}.condition({})", self.receiver, quote(text));
        if negated { format!("not {test}") } else { test }
    }
}

/// Keyword argument name of a role; the patient is positional.
fn keyword(role: &str) -> Option<&'static str> {
    match role {
        ROLE_DESTINATION => Some("to"),
        ROLE_LOCATION => Some("at"),
        ROLE_SOURCE => Some("source"),
        ROLE_INSTRUMENT => Some("using"),
        _ => None,
    }
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

/// Double-quoted Python string literal.
fn quote(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for c in value.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\t' => literal.push_str("\\t"),
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

fn check_summaries(ast: &Ast, summaries: &[MethodSummary], stage: &str) -> Result<(), StageError> {
    let expected: Vec<MethodSummary> = ast.methods.iter().map(summarize).collect();
    if expected != summaries {
        return Err(StageError::execution(
            stage,
            "extracted method summaries do not match the synthesized AST",
        ));
    }
    Ok(())
}

impl Stage<PostPipelineData> for CodeGenerator {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        if !crate::settings::is_identifier(&self.receiver) {
            return Err(StageError::initialization(
                self.descriptor.name,
                format!("'{}' is not a valid receiver name", self.receiver),
            ));
        }
        Ok(())
    }

    fn execute(&mut self, mut input: PostPipelineData) -> Result<PostPipelineData, StageError> {
        let name = self.descriptor.name;
        let ast = input.ast(name)?;
        check_summaries(ast, input.methods(name)?, name)?;

        let code = self.generate(ast);
        tracing::debug!(lines = code.lines().count(), "Code generated");
        input.set_code(code);
        Ok(input)
    }
}
