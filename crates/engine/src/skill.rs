use rhai::{CallFnOptions, Dynamic, Engine, Scope, AST};
use serde_json::{Map, Value};
use skillbridge_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::convert::json_to_dynamic;
use crate::report;

/// Script function every skill must define. `call` itself is a reserved
/// keyword function in the script language.
pub const ENTRY_POINT: &str = "run";

/// A skill file compiled and initialised as an isolated unit.
pub struct SkillUnit {
    path: PathBuf,
    ast: AST,
    scope: Scope<'static>,
    params: Vec<String>,
}

impl std::fmt::Debug for SkillUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillUnit")
            .field("path", &self.path)
            .field("params", &self.params)
            .finish()
    }
}

impl SkillUnit {
    /// Read, compile and run the top-level statements of a skill file, then
    /// locate its entry point.
    pub fn load(engine: &Engine, path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::SkillLoad(report::io_trace(path, &e)))?;

        let ast = engine
            .compile(&source)
            .map_err(|e| Error::SkillLoad(report::parse_trace(&source, &e)))?;

        let mut scope = Scope::new();
        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| Error::SkillLoad(report::eval_trace(&e)))?;

        // Overloads differ by arity only; the widest one takes keyword params.
        let params = ast
            .iter_functions()
            .filter(|f| f.name == ENTRY_POINT)
            .max_by_key(|f| f.params.len())
            .map(|f| f.params.iter().map(|p| p.to_string()).collect::<Vec<_>>())
            .ok_or_else(|| Error::MissingEntryPoint(path.display().to_string()))?;

        debug!(path = %path.display(), params = ?params, "Skill loaded");
        Ok(Self {
            path: path.to_path_buf(),
            ast,
            scope,
            params,
        })
    }

    /// Declared parameter names of the entry point, in order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Invoke the entry point once, binding `params` by name.
    ///
    /// Declared parameters with no matching key receive unit. A key that
    /// names no declared parameter is rejected before anything runs.
    pub fn call(&mut self, engine: &Engine, params: &Map<String, Value>) -> Result<Dynamic> {
        let unexpected: Vec<&str> = params
            .keys()
            .filter(|k| !self.params.iter().any(|p| p == *k))
            .map(String::as_str)
            .collect();
        if !unexpected.is_empty() {
            return Err(Error::Evaluation(report::parameter_trace(
                ENTRY_POINT,
                &unexpected,
            )));
        }

        let args: Vec<Dynamic> = self
            .params
            .iter()
            .map(|name| params.get(name).map(json_to_dynamic).unwrap_or(Dynamic::UNIT))
            .collect();

        debug!(path = %self.path.display(), args = args.len(), "Invoking skill entry point");
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, ENTRY_POINT, args)
            .map_err(|e| Error::Evaluation(report::entry_trace(ENTRY_POINT, &e)))
    }
}
