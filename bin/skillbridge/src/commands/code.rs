use skillbridge_core::ExecutionOutcome;
use skillbridge_engine::report;
use skillbridge_engine::Bridge;

pub fn run(bridge: &Bridge) -> ExecutionOutcome {
    match super::read_request() {
        Ok(input) => bridge.handle_code(&input),
        Err(e) => report::failure(&e, None),
    }
}
