use crate::data::{Ast, Capability, MethodDecl, MethodSummary, PostPipelineData, Statement};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "ast-extractor",
    &[Capability::SynthesizedAst],
    &[Capability::ExtractedAst],
);

/// Summarizes each synthesized method: what it calls and which control
/// structures it uses.
pub struct AstExtractor {
    descriptor: StageDescriptor,
}

impl Default for AstExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl AstExtractor {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

pub fn summarize(method: &MethodDecl) -> MethodSummary {
    let mut calls = Vec::new();
    let mut control_structures = Vec::new();
    let mut statement_count = 0;
    method.walk(&mut |statement| {
        statement_count += 1;
        match statement {
            Statement::Call(call) => calls.push(call.name.clone()),
            other => control_structures.push(other.kind().to_string()),
        }
    });
    MethodSummary {
        name: method.name.clone(),
        main: method.main,
        calls,
        control_structures,
        statement_count,
    }
}

fn extract(ast: &Ast, stage: &str) -> Result<Vec<MethodSummary>, StageError> {
    if ast.main_method().is_none() {
        return Err(StageError::execution(stage, "the AST has no main method"));
    }
    Ok(ast.methods.iter().map(summarize).collect())
}

impl Stage<PostPipelineData> for AstExtractor {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut input: PostPipelineData) -> Result<PostPipelineData, StageError> {
        let name = self.descriptor.name;
        let summaries = extract(input.ast(name)?, name)?;
        for summary in &summaries {
            tracing::debug!(
                method = %summary.name,
                calls = ?summary.calls,
                structures = ?summary.control_structures,
                "Method extracted"
            );
        }
        input.set_methods(summaries);
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Call, Graph};

    fn call(name: &str) -> Statement {
        Statement::Call(Call {
            name: name.into(),
            local: false,
            args: Vec::new(),
        })
    }

    fn program() -> Ast {
        Ast {
            methods: vec![MethodDecl {
                name: "execute".into(),
                main: true,
                body: vec![
                    call("open"),
                    Statement::If {
                        condition: "the door is open".into(),
                        negated: false,
                        then_branch: vec![call("close")],
                        else_branch: vec![],
                    },
                    Statement::Repeat {
                        count: 2,
                        body: vec![call("wave")],
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_summary_lists_calls_and_structures() {
        let summary = summarize(&program().methods[0]);
        assert_eq!(summary.calls, vec!["open", "close", "wave"]);
        assert_eq!(summary.control_structures, vec!["if", "repeat"]);
        assert_eq!(summary.statement_count, 5);
        assert!(summary.main);
    }

    #[test]
    fn test_execute_stores_summaries() {
        let mut data = PostPipelineData::new(Graph::new());
        data.set_ast(program());
        let mut stage = AstExtractor::new();
        stage.init().unwrap();
        let data = stage.execute(data).unwrap();
        assert_eq!(data.methods("test").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_ast_is_missing_data() {
        let mut stage = AstExtractor::new();
        let err = stage.execute(PostPipelineData::new(Graph::new())).unwrap_err();
        assert!(err.is_missing_data());
    }

    #[test]
    fn test_ast_without_main_is_rejected() {
        let mut ast = program();
        ast.methods[0].main = false;
        assert!(extract(&ast, "ast-extractor").is_err());
    }
}
