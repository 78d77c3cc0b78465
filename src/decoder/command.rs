//! Subprocess execution for external decoder tools.
//!
//! The `CommandExecutor` trait lets the HTK decoder be tested without HTK
//! installed; tests substitute a recording implementation.

use crate::defaults::DECODER_TIMEOUT;
use crate::error::{AlignError, Result};
use std::ffi::OsString;
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// Number of trailing log lines quoted in failure messages.
const LOG_TAIL_LINES: usize = 5;

const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Trait for running one external tool to completion.
///
/// Object-safe, Send + Sync for use in concurrent contexts.
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with an explicit argument vector (never through a
    /// shell), sending stdout and stderr to `log`.
    ///
    /// Returns an error if the tool is missing, exits non-zero, or exceeds
    /// the executor's time limit.
    fn execute(&self, program: &Path, args: &[OsString], log: &Path) -> Result<()>;
}

/// Production executor using `std::process::Command`.
///
/// On unix each tool runs as the leader of its own process group so a
/// timeout kills anything it spawned as well.
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    timeout: Option<Duration>,
}

impl SystemCommandExecutor {
    /// `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::new(Some(DECODER_TIMEOUT))
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, program: &Path, args: &[OsString], log: &Path) -> Result<()> {
        let tool = tool_name(program);
        let stdout = File::create(log)?;
        let stderr = stdout.try_clone()?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        tracing::debug!(tool = %tool, args = ?args, "spawning decoder tool");
        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AlignError::DecoderToolNotFound {
                    tool: program.display().to_string(),
                }
            } else {
                AlignError::DecoderFailed {
                    tool: tool.clone(),
                    message: format!("failed to start: {e}"),
                }
            }
        })?;

        let status = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout, &tool)?,
            None => child.wait()?,
        };
        tracing::debug!(
            tool = %tool,
            status = %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "decoder tool finished"
        );

        if !status.success() {
            return Err(AlignError::DecoderFailed {
                tool,
                message: format!("{status}; log tail: {}", log_tail(log)),
            });
        }
        Ok(())
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration, tool: &str) -> Result<ExitStatus> {
    // A limit past the end of the clock cannot expire.
    let Some(deadline) = Instant::now().checked_add(timeout) else {
        return Ok(child.wait()?);
    };
    let mut poll = Duration::from_millis(5);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(tool, timeout_ms = timeout.as_millis() as u64, "killing decoder tool");
            terminate(child);
            return Err(AlignError::DecoderTimeout {
                tool: tool.to_string(),
                timeout,
            });
        }
        std::thread::sleep(poll.min(deadline - now));
        poll = (poll * 2).min(MAX_POLL_INTERVAL);
    }
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    crate::sys::kill_process_group(child.id());
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "kill after group signal");
    }
    if let Err(e) = child.wait() {
        tracing::debug!(error = %e, "reaping killed decoder tool");
    }
}

fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

/// Last few non-empty lines of a tool log, joined on one line.
fn log_tail(log: &Path) -> String {
    let Ok(bytes) = std::fs::read(log) else {
        return "<no log>".to_string();
    };
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return "<empty log>".to_string();
    }
    lines[lines.len().saturating_sub(LOG_TAIL_LINES)..].join(" | ")
}
