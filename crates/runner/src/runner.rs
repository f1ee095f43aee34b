use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use skillbridge_core::{Config, Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::actions::{process_actions, ActionSink};

const BRIDGE_BIN_NAME: &str = "skillbridge";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// What the host learns from one bridge run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub actions: Vec<Value>,
}

impl RunResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    fn raw(stdout: &str) -> Self {
        Self {
            success: true,
            result: Some(stdout.to_string()),
            output: Some(stdout.to_string()),
            ..Default::default()
        }
    }
}

/// Interpret a finished bridge process.
///
/// A non-zero exit is a failure described by stderr, then stdout, then the
/// exit code. Otherwise the last stdout line that opens a JSON object is the
/// response; stdout without one is taken verbatim as a successful result.
pub fn parse_result(stdout: &str, stderr: &str, exit_code: Option<i32>) -> RunResult {
    if exit_code != Some(0) {
        let error = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match exit_code {
                Some(code) => format!("Bridge process exited with code {}", code),
                None => "Bridge process terminated by signal".to_string(),
            });
        return RunResult::failure(error);
    }

    let stdout = stdout.trim();
    let Some(line) = stdout.lines().rev().find(|l| l.starts_with('{')) else {
        return RunResult::raw(stdout);
    };

    match serde_json::from_str::<RunResult>(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "Bridge response line is not a valid document");
            RunResult::raw(stdout)
        }
    }
}

/// Spawns the bridge binary for one request at a time.
#[derive(Debug, Clone)]
pub struct BridgeRunner {
    bin: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    skills_root: Option<PathBuf>,
    default_conversation_id: Option<String>,
}

impl BridgeRunner {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            skills_root: None,
            default_conversation_id: None,
        }
    }

    /// Arguments placed before the mode subcommand.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_skills_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.skills_root = Some(root.into());
        self
    }

    pub fn with_default_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.default_conversation_id = Some(conversation_id.into());
        self
    }

    /// Build a runner from the `runner` and `skills` sections, locating the
    /// bridge on `PATH` when no binary is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let bin = match &config.runner.bridge_bin {
            Some(bin) => bin.clone(),
            None => which::which(BRIDGE_BIN_NAME)
                .map_err(|e| Error::NotFound(format!("{} on PATH: {}", BRIDGE_BIN_NAME, e)))?,
        };

        let mut runner =
            Self::new(bin).with_timeout(Duration::from_secs(config.runner.timeout_secs));
        runner.skills_root = config.skills.root.clone();
        runner.default_conversation_id = config.runner.default_conversation_id.clone();
        Ok(runner)
    }

    pub fn is_available(&self) -> bool {
        self.bin.is_file() || which::which(&self.bin).is_ok()
    }

    pub async fn run_code(&self, code: &str, context: &Value) -> Result<RunResult> {
        let request = json!({ "code": code, "context": context });
        self.invoke(&["code".to_string()], &request).await
    }

    /// Run a skill file. A missing file is reported without spawning.
    pub async fn run_skill(
        &self,
        skill_path: &Path,
        params: &Map<String, Value>,
        context: &Value,
    ) -> Result<RunResult> {
        let full_path = match &self.skills_root {
            Some(root) if skill_path.is_relative() => root.join(skill_path),
            _ => skill_path.to_path_buf(),
        };
        if !full_path.is_file() {
            return Ok(RunResult::failure(format!(
                "Skill file not found: {}",
                full_path.display()
            )));
        }

        let request = json!({ "params": params, "context": context });
        let args = ["skill".to_string(), full_path.display().to_string()];
        self.invoke(&args, &request).await
    }

    /// Hand the actions of `result` to `sink`, using the configured default
    /// conversation for messages that name none.
    pub async fn deliver_actions(&self, result: &RunResult, sink: &dyn ActionSink) -> usize {
        process_actions(&result.actions, sink, self.default_conversation_id.as_deref()).await
    }

    async fn invoke(&self, mode_args: &[String], request: &Value) -> Result<RunResult> {
        let input = serde_json::to_string(request)?;

        let mut cmd = Command::new(&self.bin);
        cmd.args(&self.args)
            .args(mode_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            Error::Process(format!("Failed to spawn bridge '{}': {}", self.bin.display(), e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(input.as_bytes()).await {
                Ok(()) => {}
                // The bridge may exit before reading; its output still decides.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!("Bridge closed stdin early");
                }
                Err(e) => {
                    return Err(Error::Process(format!("Failed to write to bridge stdin: {}", e)))
                }
            }
            drop(stdin);
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output
                .map_err(|e| Error::Process(format!("Bridge execution failed: {}", e)))?,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Bridge run timed out, killed");
                return Err(Error::Timeout(format!(
                    "Bridge execution timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let result = parse_result(&stdout, &stderr, output.status.code());
        info!(
            success = result.success,
            actions = result.actions.len(),
            "Bridge run finished"
        );
        Ok(result)
    }
}
