use thiserror::Error;

/// Every failure the bridge or its host runner can produce.
///
/// The `Display` text of the request-level variants (`InvalidInput` through
/// `Evaluation`) is exactly what ends up in the response's `error` field.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No skill file specified")]
    MissingSkillRef,

    #[error("Failed to load skill: {0}")]
    SkillLoad(String),

    #[error("Skill {0} has no callable 'run' function")]
    MissingEntryPoint(String),

    #[error("{0}")]
    Evaluation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
