//! Child process execution with full output capture.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// Captured outcome of one child process run.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run a command to completion, capturing stdout and stderr.
///
/// A non-zero exit is a normal outcome; callers inspect `status`. The only
/// error is failing to start the child at all (missing binary, absent
/// working directory), which is surfaced, not swallowed. stderr is drained
/// on a helper thread while stdout is read, so neither pipe can deadlock.
/// No timeout is imposed: a hung child blocks the calling thread.
pub fn run_command(mut cmd: Command) -> Result<ProcessOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(?cmd, "spawning child process");
    let mut child = cmd
        .spawn()
        .with_context(|| format!("start {:?}", cmd.get_program()))?;

    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stderr_handle = thread::spawn(move || {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).map(|_| buf)
    });

    let mut stdout = Vec::new();
    child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?
        .read_to_end(&mut stdout)
        .context("read stdout")?;

    let status = child.wait().context("wait for child")?;
    let stderr = stderr_handle
        .join()
        .map_err(|_| anyhow!("stderr reader thread panicked"))?
        .context("read stderr")?;

    debug!(exit_code = ?status.code(), "command finished");
    Ok(ProcessOutcome {
        status,
        stdout,
        stderr,
    })
}
