use rhai::{Dynamic, Engine, Scope, AST};
use skillbridge_core::{Error, Result};
use tracing::debug;

use crate::report;

/// Binding a statement sequence assigns to hand back its result.
pub const RESULT_BINDING: &str = "result";

/// A code fragment after the expression/statement decision.
#[derive(Debug, Clone)]
pub enum Compiled {
    Expression(AST),
    Statements(AST),
}

/// Compile `source` as a single expression, falling back to a statement
/// sequence when it does not parse as one. Only a failure of both is an error.
pub fn compile(engine: &Engine, source: &str) -> Result<Compiled> {
    match engine.compile_expression(source) {
        Ok(ast) => {
            debug!("Fragment compiled as expression");
            Ok(Compiled::Expression(ast))
        }
        Err(reason) => {
            debug!(reason = %reason, "Fragment is not an expression, compiling as statements");
            engine
                .compile(source)
                .map(Compiled::Statements)
                .map_err(|e| Error::Evaluation(report::parse_trace(source, &e)))
        }
    }
}

/// Run a compiled fragment exactly once against `scope`.
///
/// An expression yields its value. Statements yield whatever they bound to
/// `result`, or unit when they bound nothing.
pub fn execute(engine: &Engine, compiled: &Compiled, scope: &mut Scope) -> Result<Dynamic> {
    match compiled {
        Compiled::Expression(ast) => engine
            .eval_ast_with_scope::<Dynamic>(scope, ast)
            .map_err(|e| Error::Evaluation(report::eval_trace(&e))),
        Compiled::Statements(ast) => {
            engine
                .run_ast_with_scope(scope, ast)
                .map_err(|e| Error::Evaluation(report::eval_trace(&e)))?;
            Ok(scope
                .get_value::<Dynamic>(RESULT_BINDING)
                .unwrap_or(Dynamic::UNIT))
        }
    }
}

pub fn evaluate_code(engine: &Engine, source: &str) -> Result<Dynamic> {
    let compiled = compile(engine, source)?;
    let mut scope = Scope::new();
    execute(engine, &compiled, &mut scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_is_preferred() {
        let engine = Engine::new();
        assert!(matches!(compile(&engine, "2 + 2").unwrap(), Compiled::Expression(_)));
        assert_eq!(evaluate_code(&engine, "2 + 2").unwrap().as_int().unwrap(), 4);
    }

    #[test]
    fn test_statements_read_result_binding() {
        let engine = Engine::new();
        let code = "let x = 10;\nlet y = 20;\nlet result = x + y;";
        assert!(matches!(compile(&engine, code).unwrap(), Compiled::Statements(_)));
        assert_eq!(evaluate_code(&engine, code).unwrap().as_int().unwrap(), 30);
    }

    #[test]
    fn test_statements_without_result_yield_unit() {
        let engine = Engine::new();
        assert!(evaluate_code(&engine, "let x = 1; x + 1").unwrap().is_unit());
        assert!(evaluate_code(&engine, "").unwrap().is_unit());
    }

    #[test]
    fn test_statements_may_define_functions() {
        let engine = Engine::new();
        let code = "fn double(x) { x * 2 }\nlet result = double(21);";
        assert_eq!(evaluate_code(&engine, code).unwrap().as_int().unwrap(), 42);
    }

    #[test]
    fn test_syntax_error_reports_statement_parse() {
        let engine = Engine::new();
        let err = evaluate_code(&engine, "fn foo(").unwrap_err();
        assert!(matches!(err, Error::Evaluation(_)));
        assert!(err.to_string().contains("SyntaxError"));
    }

    #[test]
    fn test_runtime_error_is_fatal() {
        let engine = Engine::new();
        let err = evaluate_code(&engine, "let result = 5; let y = 1 / 0;").unwrap_err();
        assert!(err.to_string().contains("DivisionByZero"));
    }
}
