//! External process execution
//!
//! Every installer and package-manager call goes through [`ProcessRunner`]
//! so the orchestrators can be driven by scripted runners in tests.

use crate::error::{TlsetupError, TlsetupResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Max number of stderr lines carried into error messages
const ERROR_TAIL_LINES: usize = 50;

/// Options for a single invocation
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Data written to stdin, which is closed afterwards
    pub stdin: Option<String>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The last lines of stderr, for error reporting
    pub fn stderr_tail(&self) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
        lines[start..].join("\n")
    }
}

/// Runs external programs to completion
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` and capture its output
    ///
    /// A non-zero exit code is not an error here; only failing to start the
    /// process is.
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> TlsetupResult<ExecOutput>;
}

/// `ProcessRunner` backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> TlsetupResult<ExecOutput> {
        debug!("Executing: {} {:?}", program, args);

        let mut command = Command::new(program);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if options.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(ref cwd) = options.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &options.env {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| TlsetupError::command_failed(program, e))?;

        if let (Some(input), Some(mut stdin)) = (options.stdin.as_ref(), child.stdin.take()) {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| TlsetupError::io(format!("writing stdin of {}", program), e))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TlsetupError::command_failed(program, e))?;

        let result = ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        debug!("{} exited with {}", program, result.exit_code);
        Ok(result)
    }
}
