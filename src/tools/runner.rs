//! Shell-free command runner
//!
//! Executes a validated argv directly:
//! - No shell, arguments go straight to the program
//! - Working directory pinned to the allowed root
//! - stdin closed, stdout/stderr fully buffered
//! - Hard wall-clock timeout, child killed and reaped on expiry

use crate::errors::{GatewayError, Result};
use crate::tools::types::{ExecutionResult, ValidatedCommand};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;

/// Run a validated command
///
/// # Errors
///
/// - `CommandTimeout` if the child is still running after `timeout_duration`
/// - `ExecutionFailed` if the child cannot be spawned or waited on
///
/// A non-zero exit code is not an error.
pub async fn run_command(
    validated: &ValidatedCommand,
    working_dir: &Path,
    timeout_duration: Duration,
) -> Result<ExecutionResult> {
    let start = Instant::now();

    let mut child = Command::new(validated.command())
        .args(validated.arguments())
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            GatewayError::ExecutionFailed(format!(
                "Failed to start '{}': {}",
                validated.command(),
                e
            ))
        })?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    // Both pipes are drained concurrently so a full stderr buffer cannot
    // stall a child that is still writing stdout
    let outcome = timeout(timeout_duration, async {
        let (stdout, stderr) = tokio::join!(read_stream(stdout_pipe), read_stream(stderr_pipe));
        let status = child.wait().await;
        (stdout, stderr, status)
    })
    .await;

    match outcome {
        Ok((Ok(stdout), Ok(stderr), Ok(status))) => Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
        }),
        Ok((stdout, stderr, status)) => {
            let _ = child.kill().await;
            let reason = stdout
                .err()
                .or(stderr.err())
                .or(status.err())
                .map(|e| e.to_string())
                .unwrap_or_default();
            Err(GatewayError::ExecutionFailed(format!(
                "Failed to collect output of '{}': {}",
                validated.command(),
                reason
            )))
        }
        Err(_) => {
            // kill() also waits, so the child is reaped before we return
            let _ = child.kill().await;
            Err(GatewayError::CommandTimeout {
                seconds: timeout_duration.as_secs(),
            })
        }
    }
}

async fn read_stream<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}
