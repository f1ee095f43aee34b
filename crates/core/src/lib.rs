pub mod config;
pub mod error;
pub mod outcome;
pub mod paths;
pub mod request;

pub use config::Config;
pub use error::{Error, Result};
pub use outcome::{Action, ExecutionOutcome};
pub use paths::Paths;
pub use request::{ExecutionMode, ExecutionRequest, RequestPayload};
