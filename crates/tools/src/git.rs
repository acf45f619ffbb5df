//! Read-only git commands with a timeout and truncated output.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use codeclaw_core::action::GitCommand;
use codeclaw_core::error::ToolError;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::preview;

pub struct GitRunner {
    root: PathBuf,
    timeout: Duration,
    output_chars: usize,
    program: String,
}

impl GitRunner {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration, output_chars: usize) -> Self {
        Self {
            root: root.into(),
            timeout,
            output_chars,
            program: "git".into(),
        }
    }

    /// Use a different executable. Tests point this at a missing binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub async fn run(&self, command: GitCommand) -> Result<String, ToolError> {
        let args = command.args();
        debug!(program = %self.program, ?args, "Running git");

        let child = Command::new(&self.program)
            .args(args)
            .current_dir(&self.root)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(ToolError::ExecutionFailed {
                    tool_name: "git".into(),
                    reason: format!("'{}' executable not found", self.program),
                });
            }
            Ok(Err(e)) => {
                return Err(ToolError::ExecutionFailed {
                    tool_name: "git".into(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "git timed out");
                return Err(ToolError::Timeout {
                    tool_name: "git".into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(exit_code = code, "git command failed");
            return Err(ToolError::ExecutionFailed {
                tool_name: "git".into(),
                reason: format!("[exit code: {code}] {}", preview(stderr.trim(), self.output_chars)),
            });
        }

        let text = stdout.trim();
        if text.is_empty() {
            return Ok(format!("git {}: no output", args.first().copied().unwrap_or_default()));
        }
        Ok(preview(text, self.output_chars))
    }
}
