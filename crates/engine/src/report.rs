use rhai::{EvalAltResult, ParseError, Position};
use skillbridge_core::{Error, ExecutionOutcome};
use tracing::warn;

use crate::environment::Invocation;

const BACKTRACE_HEADER: &str = "Script backtrace (most recent call last):";

/// Stable marker that leads the last line of every trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Syntax,
    DivisionByZero,
    Arithmetic,
    UndefinedVariable,
    UndefinedFunction,
    TypeMismatch,
    Index,
    Thrown,
    Io,
    Parameter,
    Evaluation,
}

impl FaultKind {
    pub fn marker(self) -> &'static str {
        match self {
            FaultKind::Syntax => "SyntaxError",
            FaultKind::DivisionByZero => "DivisionByZero",
            FaultKind::Arithmetic => "ArithmeticError",
            FaultKind::UndefinedVariable => "UndefinedVariable",
            FaultKind::UndefinedFunction => "UndefinedFunction",
            FaultKind::TypeMismatch => "TypeMismatch",
            FaultKind::Index => "IndexError",
            FaultKind::Thrown => "ThrownError",
            FaultKind::Io => "IoError",
            FaultKind::Parameter => "ParameterError",
            FaultKind::Evaluation => "EvaluationError",
        }
    }

    pub fn classify(err: &EvalAltResult) -> Self {
        match err {
            EvalAltResult::ErrorParsing(..) => FaultKind::Syntax,
            EvalAltResult::ErrorArithmetic(msg, _) if msg.contains("by zero") => {
                FaultKind::DivisionByZero
            }
            EvalAltResult::ErrorArithmetic(..) => FaultKind::Arithmetic,
            EvalAltResult::ErrorVariableNotFound(..) => FaultKind::UndefinedVariable,
            EvalAltResult::ErrorFunctionNotFound(..) => FaultKind::UndefinedFunction,
            EvalAltResult::ErrorMismatchDataType(..)
            | EvalAltResult::ErrorMismatchOutputType(..) => FaultKind::TypeMismatch,
            EvalAltResult::ErrorArrayBounds(..)
            | EvalAltResult::ErrorStringBounds(..)
            | EvalAltResult::ErrorIndexingType(..) => FaultKind::Index,
            EvalAltResult::ErrorRuntime(..) => FaultKind::Thrown,
            _ => FaultKind::Evaluation,
        }
    }
}

fn position_suffix(pos: Position) -> String {
    if pos.is_none() {
        String::new()
    } else {
        format!(" ({})", pos)
    }
}

/// Render a runtime failure with one frame per function or module the error
/// travelled through, innermost last.
pub fn eval_trace(err: &EvalAltResult) -> String {
    render_eval(None, err)
}

/// Like [`eval_trace`] for a failure raised while a host-invoked script
/// function ran. Host calls are not wrapped in a function frame, so the
/// entry frame is added here.
pub fn entry_trace(entry_point: &str, err: &EvalAltResult) -> String {
    render_eval(Some(entry_point), err)
}

fn render_eval(entry_point: Option<&str>, err: &EvalAltResult) -> String {
    let mut trace = String::from(BACKTRACE_HEADER);
    trace.push('\n');

    if let Some(entry) = entry_point {
        let wrapped = matches!(err, EvalAltResult::ErrorInFunctionCall(name, ..) if name == entry);
        if !wrapped {
            trace.push_str(&format!("  in function '{}'\n", entry));
        }
    }

    let mut current = err;
    loop {
        match current {
            EvalAltResult::ErrorInFunctionCall(name, _source, inner, pos) => {
                trace.push_str(&format!("  in function '{}'{}\n", name, position_suffix(*pos)));
                current = inner.as_ref();
            }
            EvalAltResult::ErrorInModule(path, inner, pos) => {
                trace.push_str(&format!("  in module '{}'{}\n", path, position_suffix(*pos)));
                current = inner.as_ref();
            }
            _ => break,
        }
    }

    trace.push_str(&format!(
        "{}: {}{}",
        FaultKind::classify(current).marker(),
        current,
        position_suffix(current.position())
    ));
    trace
}

/// Render a compile failure, pointing at the offending source line.
pub fn parse_trace(source: &str, err: &ParseError) -> String {
    let pos = err.position();
    let mut trace = String::from(BACKTRACE_HEADER);
    trace.push('\n');

    if let Some(line_no) = pos.line() {
        if let Some(text) = source.lines().nth(line_no.saturating_sub(1)) {
            trace.push_str(&format!("  line {}:\n    {}\n", line_no, text));
            if let Some(col) = pos.position() {
                trace.push_str(&format!("    {}^\n", " ".repeat(col.saturating_sub(1))));
            }
        }
    }

    trace.push_str(&format!(
        "{}: {}{}",
        FaultKind::Syntax.marker(),
        err.err_type(),
        position_suffix(pos)
    ));
    trace
}

pub fn io_trace(path: &std::path::Path, err: &std::io::Error) -> String {
    format!(
        "{}\n{}: {}: {}",
        BACKTRACE_HEADER,
        FaultKind::Io.marker(),
        path.display(),
        err
    )
}

pub fn parameter_trace(entry_point: &str, unexpected: &[&str]) -> String {
    format!(
        "{}\n  in function '{}'\n{}: unexpected parameter(s): {}",
        BACKTRACE_HEADER,
        entry_point,
        FaultKind::Parameter.marker(),
        unexpected.join(", ")
    )
}

/// Turn a failure into the response document.
///
/// Decode, missing-reference and entry-point failures carry only the error.
/// A load failure adds the actions recorded by the skill's top-level code,
/// and an evaluation failure adds both the captured output and the actions.
pub fn failure(err: &Error, invocation: Option<&Invocation>) -> ExecutionOutcome {
    warn!(error = %err, "Request failed");

    let outcome = ExecutionOutcome::failure(err.to_string());
    match (err, invocation) {
        (Error::Evaluation(_), Some(invocation)) => outcome
            .with_output(invocation.output())
            .with_actions(invocation.actions()),
        (Error::SkillLoad(_), Some(invocation)) => outcome.with_actions(invocation.actions()),
        _ => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Engine;

    #[test]
    fn test_runtime_markers() {
        let engine = Engine::new();

        let err = engine.eval::<rhai::Dynamic>("1 / 0").unwrap_err();
        assert_eq!(FaultKind::classify(&err), FaultKind::DivisionByZero);
        assert!(eval_trace(&err).contains("DivisionByZero: "));

        let err = engine.eval::<rhai::Dynamic>("undefined_var").unwrap_err();
        assert_eq!(FaultKind::classify(&err), FaultKind::UndefinedVariable);

        let err = engine.eval::<rhai::Dynamic>("no_such_fn(1)").unwrap_err();
        assert_eq!(FaultKind::classify(&err), FaultKind::UndefinedFunction);

        let err = engine.eval::<rhai::Dynamic>(r#"throw "boom""#).unwrap_err();
        assert_eq!(FaultKind::classify(&err), FaultKind::Thrown);
        assert!(eval_trace(&err).contains("boom"));
    }

    #[test]
    fn test_trace_lists_function_frames() {
        let engine = Engine::new();
        let err = engine
            .eval::<rhai::Dynamic>(
                r#"
                fn inner(x) { x / 0 }
                fn outer(x) { inner(x) }
                outer(1)
                "#,
            )
            .unwrap_err();

        let trace = eval_trace(&err);
        assert!(trace.starts_with(BACKTRACE_HEADER));
        let outer = trace.find("in function 'outer'").unwrap();
        let inner = trace.find("in function 'inner'").unwrap();
        assert!(outer < inner);
        assert!(trace.lines().last().unwrap().starts_with("DivisionByZero: "));
    }

    #[test]
    fn test_trace_ends_with_failure_position() {
        let engine = Engine::new();
        let err = engine.run("let a = 1;\nlet b = a / 0;").unwrap_err();

        let last = eval_trace(&err).lines().last().unwrap().to_string();
        assert!(last.starts_with("DivisionByZero: "));
        assert!(last.ends_with(")"));
        assert!(last.contains("line 2, position"));
    }

    #[test]
    fn test_entry_trace_adds_entry_frame() {
        let engine = Engine::new();
        let ast = engine.compile("fn run(n) {\n    n / 0\n}").unwrap();
        let err = engine
            .call_fn::<rhai::Dynamic>(&mut rhai::Scope::new(), &ast, "run", (4_i64,))
            .unwrap_err();

        let trace = entry_trace("run", &err);
        assert_eq!(trace.matches("in function 'run'").count(), 1);
        let last = trace.lines().last().unwrap();
        assert!(last.starts_with("DivisionByZero: "));
        assert!(last.contains("line 2"));
    }

    #[test]
    fn test_parse_trace_points_at_source() {
        let engine = Engine::new();
        let source = "let x = 1;\nlet y = ;";
        let err = engine.compile(source).unwrap_err();

        let trace = parse_trace(source, &err);
        assert!(trace.contains("line 2:"));
        assert!(trace.contains("    let y = ;"));
        assert!(trace.contains('^'));
        assert!(trace.lines().last().unwrap().starts_with("SyntaxError: "));
    }

    #[test]
    fn test_failure_field_policy() {
        let invocation = Invocation::new();

        let bare = failure(&Error::MissingSkillRef, Some(&invocation));
        assert!(bare.output.is_none() && bare.actions.is_none());

        let load = failure(&Error::SkillLoad("t".into()), Some(&invocation));
        assert!(load.output.is_none());
        assert_eq!(load.actions, Some(vec![]));

        let eval = failure(&Error::Evaluation("t".into()), Some(&invocation));
        assert_eq!(eval.output.as_deref(), Some(""));
        assert_eq!(eval.actions, Some(vec![]));
        assert_eq!(eval.error.as_deref(), Some("t"));
        assert!(!eval.success);
    }
}
