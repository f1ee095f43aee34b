use rhai::{Dynamic, Engine};
use skillbridge_core::config::EngineConfig;
use skillbridge_core::{
    Error, ExecutionMode, ExecutionOutcome, ExecutionRequest, RequestPayload, Result,
};
use std::path::Path;
use tracing::{debug, info};

use crate::environment::{build_engine, Invocation};
use crate::evaluator;
use crate::report;
use crate::serializer::serialize_result;
use crate::skill::SkillUnit;

/// Turns one request document into one response document.
///
/// Holds configuration only. Every request gets its own engine and
/// `Invocation`, so a single `Bridge` can serve any number of sequential
/// requests.
#[derive(Debug, Clone, Default)]
pub struct Bridge {
    config: EngineConfig,
}

impl Bridge {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Code mode: `input` is `{"code": ..., "context": ...}`.
    pub fn handle_code(&self, input: &str) -> ExecutionOutcome {
        match RequestPayload::decode(input) {
            Ok(payload) => self.execute(&ExecutionRequest::code(payload)),
            Err(e) => report::failure(&e, None),
        }
    }

    /// Skill mode: `input` is `{"params": ..., "context": ...}`.
    ///
    /// The skill reference is checked before the input is decoded.
    pub fn handle_skill(&self, skill_path: Option<&Path>, input: &str) -> ExecutionOutcome {
        let Some(skill_path) = skill_path else {
            return report::failure(&Error::MissingSkillRef, None);
        };
        match RequestPayload::decode(input) {
            Ok(payload) => {
                self.execute(&ExecutionRequest::skill(skill_path.to_path_buf(), payload))
            }
            Err(e) => report::failure(&e, None),
        }
    }

    pub fn execute(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        let invocation = Invocation::new();
        let engine = build_engine(&self.config, &invocation, &request.context);

        match self.evaluate(&engine, request) {
            Ok(value) => {
                let output = invocation.output();
                let actions = invocation.actions();
                info!(actions = actions.len(), output_len = output.len(), "Request succeeded");
                ExecutionOutcome::success(serialize_result(&value, &output), output, actions)
            }
            Err(e) => report::failure(&e, Some(&invocation)),
        }
    }

    fn evaluate(&self, engine: &Engine, request: &ExecutionRequest) -> Result<Dynamic> {
        match &request.mode {
            ExecutionMode::Code(code) => {
                debug!(len = code.len(), "Evaluating code fragment");
                evaluator::evaluate_code(engine, code)
            }
            ExecutionMode::Skill(path) => {
                debug!(path = %path.display(), "Executing skill");
                let mut unit = SkillUnit::load(engine, path)?;
                unit.call(engine, &request.params)
            }
        }
    }
}
