//! Abstract syntax tree synthesized from the analyzed graph.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub role: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    /// Calls a method synthesized in the same program rather than a robot action
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    Call(Call),
    If {
        condition: String,
        #[serde(default)]
        negated: bool,
        then_branch: Vec<Statement>,
        #[serde(default)]
        else_branch: Vec<Statement>,
    },
    Repeat {
        count: u32,
        body: Vec<Statement>,
    },
    While {
        condition: String,
        /// `until` loops run while the condition does not hold
        #[serde(default)]
        until: bool,
        body: Vec<Statement>,
    },
    Parallel {
        branches: Vec<Statement>,
    },
}

impl Statement {
    /// Short name of the statement kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Call(_) => "call",
            Statement::If { .. } => "if",
            Statement::Repeat { .. } => "repeat",
            Statement::While { .. } => "while",
            Statement::Parallel { .. } => "parallel",
        }
    }

    /// Visit this statement and every nested statement, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Statement)) {
        visit(self);
        match self {
            Statement::Call(_) => {}
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                for s in then_branch.iter().chain(else_branch) {
                    s.walk(visit);
                }
            }
            Statement::Repeat { body, .. } | Statement::While { body, .. } => {
                for s in body {
                    s.walk(visit);
                }
            }
            Statement::Parallel { branches } => {
                for s in branches {
                    s.walk(visit);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    /// Entry point of the program
    #[serde(default)]
    pub main: bool,
    pub body: Vec<Statement>,
}

impl MethodDecl {
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Statement)) {
        for statement in &self.body {
            statement.walk(visit);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    pub methods: Vec<MethodDecl>,
}

impl Ast {
    pub fn main_method(&self) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.main)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Structured description of one synthesized method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub name: String,
    pub main: bool,
    /// Called actions and local methods, in program order
    pub calls: Vec<String>,
    /// Kinds of control structures used, in program order
    pub control_structures: Vec<String>,
    pub statement_count: usize,
}
