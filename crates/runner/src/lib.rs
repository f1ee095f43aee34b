pub mod actions;
pub mod runner;

pub use actions::{process_actions, ActionSink};
pub use runner::{parse_result, BridgeRunner, RunResult};
