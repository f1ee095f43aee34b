use skillbridge_core::{Config, ExecutionOutcome};
use skillbridge_engine::report;
use skillbridge_engine::Bridge;
use std::path::Path;
use tracing::debug;

pub fn run(bridge: &Bridge, config: &Config, skill_file: Option<&Path>) -> ExecutionOutcome {
    // Reference first; stdin is not consulted without one.
    let Some(skill_file) = skill_file else {
        return bridge.handle_skill(None, "");
    };

    let path = config.skills.resolve(skill_file);
    debug!(path = %path.display(), "Resolved skill file");

    match super::read_request() {
        Ok(input) => bridge.handle_skill(Some(path.as_path()), &input),
        Err(e) => report::failure(&e, None),
    }
}
