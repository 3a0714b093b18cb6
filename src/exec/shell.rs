// src/exec/shell.rs

//! Shell-backed command runner.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::BenchError;

use super::backend::{CommandOutput, CommandRunner, RunFuture};

/// Runs commands through the platform shell, capturing stdout and logging
/// stderr at debug level.
///
/// An optional per-command `timeout` kills the child when exceeded. Without
/// one, a hanging command hangs the calling repetition.
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner {
    timeout: Option<Duration>,
}

impl ShellCommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn run_inner(&self, action: &str, command: &str) -> crate::errors::Result<CommandOutput> {
        info!(action, cmd = %command, "running external command");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| BenchError::Execution {
            action: action.to_string(),
            source,
        })?;

        let stdout = child.stdout.take();

        // Always drain stderr so the pipe never fills up.
        if let Some(stderr) = child.stderr.take() {
            let action = action.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(action = %action, "stderr: {}", line);
                }
            });
        }

        let collect = async {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout {
                out.read_to_end(&mut buf).await?;
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, buf))
        };

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, collect).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(action, timeout = ?limit, "command exceeded its timeout; killing it");
                    if let Err(e) = child.kill().await {
                        warn!(action, error = %e, "failed to kill timed out command");
                    }
                    return Err(BenchError::CommandTimeout {
                        action: action.to_string(),
                        timeout: limit,
                    });
                }
            },
            None => collect.await,
        };

        let (status, buf) = waited.map_err(|source| BenchError::Execution {
            action: action.to_string(),
            source,
        })?;
        let elapsed = started.elapsed();

        // Killed by a signal: no exit code, report it as a generic failure.
        let exit_code = status.code().unwrap_or(-1);

        info!(
            action,
            exit_code,
            elapsed_ms = elapsed.as_millis() as u64,
            "external command finished"
        );

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&buf).into_owned(),
            elapsed,
        })
    }
}

impl CommandRunner for ShellCommandRunner {
    fn run<'a>(&'a self, action: &'a str, command: &'a str) -> RunFuture<'a> {
        Box::pin(self.run_inner(action, command))
    }
}
