use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};

use crate::constants::{DRAIN_GRACE, STDERR_TRUNCATION_MARKER, STDOUT_TRUNCATION_MARKER};
use crate::core::{
    domain::{ExecutionLimits, RunResult, Runnable},
    errors::SpawnError,
    traits::runner::Runner,
};
use crate::native::capture::{OutputStream, StreamCapture, drain, lock};

/// Runs commands as plain child processes of this one, with piped stdio, a
/// wall-clock deadline and capped output.
#[derive(Debug, Clone)]
pub struct NativeRunner {
    minimum_grace: Duration,
}

impl NativeRunner {
    pub fn new(minimum_grace: Duration) -> Self {
        Self { minimum_grace }
    }
}

/// Whichever of the three competing signals resolved first.
#[derive(Debug)]
enum Resolution {
    Exited(std::io::Result<ExitStatus>),
    DeadlineElapsed,
    OutputLimitExceeded(OutputStream),
}

#[async_trait::async_trait]
impl Runner for NativeRunner {
    #[tracing::instrument(skip_all, fields(program = %runnable.program.display()))]
    async fn run(
        &self,
        runnable: &Runnable,
        stdin: &str,
        limits: &ExecutionLimits,
    ) -> Result<RunResult, SpawnError> {
        let spawn_error = |e: std::io::Error| SpawnError {
            program: runnable.program.display().to_string(),
            msg: e.to_string(),
        };

        let mut cmd = Command::new(&runnable.program);
        cmd.args(&runnable.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let deadline = sleep_until(started + limits.time_limit.max(self.minimum_grace));
        tokio::pin!(deadline);

        let mut child = cmd.spawn().map_err(spawn_error)?;
        feed_stdin(child.stdin.take(), stdin);

        let stdout_capture = Arc::new(Mutex::new(StreamCapture::new(
            limits.output_cap_bytes,
            STDOUT_TRUNCATION_MARKER,
        )));
        let stderr_capture = Arc::new(Mutex::new(StreamCapture::new(
            limits.output_cap_bytes,
            STDERR_TRUNCATION_MARKER,
        )));

        let (overflow_tx, mut overflow_rx) = mpsc::channel(2);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain(
                stdout,
                OutputStream::Stdout,
                stdout_capture.clone(),
                overflow_tx.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain(
                stderr,
                OutputStream::Stderr,
                stderr_capture.clone(),
                overflow_tx.clone(),
            )));
        }
        drop(overflow_tx);

        // One race, one winner. A natural exit that lands after a kill is
        // reported as the kill.
        let resolution = tokio::select! {
            biased;
            status = child.wait() => Resolution::Exited(status),
            Some(stream) = overflow_rx.recv() => Resolution::OutputLimitExceeded(stream),
            _ = &mut deadline => Resolution::DeadlineElapsed,
        };

        let (status, timed_out) = match resolution {
            Resolution::Exited(status) => (status, false),
            Resolution::DeadlineElapsed => {
                tracing::debug!("Deadline elapsed, killing process");
                (kill(&mut child).await, true)
            }
            Resolution::OutputLimitExceeded(stream) => {
                tracing::debug!(?stream, "Output limit exceeded, killing process");
                (kill(&mut child).await, false)
            }
        };
        let execution_time_ms = started.elapsed().as_millis() as u64;
        let status = status.map_err(spawn_error)?;

        if timeout(DRAIN_GRACE, futures::future::join_all(readers.iter_mut()))
            .await
            .is_err()
        {
            tracing::warn!("Output streams still open after process exit, abandoning them");
            readers.iter().for_each(|reader| reader.abort());
        }

        let (stdout, stdout_truncated) = {
            let mut capture = lock(&stdout_capture);
            (capture.take(), capture.is_truncated())
        };
        let (stderr, stderr_truncated) = {
            let mut capture = lock(&stderr_capture);
            (capture.take(), capture.is_truncated())
        };

        let result = RunResult {
            stdout,
            stderr,
            exit_code: status.code(),
            signal: termination_signal(&status),
            timed_out,
            output_limit_exceeded: stdout_truncated || stderr_truncated,
            execution_time_ms,
        };

        tracing::debug!(
            exit_code = ?result.exit_code,
            signal = ?result.signal,
            timed_out = result.timed_out,
            output_limit_exceeded = result.output_limit_exceeded,
            elapsed_ms = result.execution_time_ms,
            "Process resolved"
        );

        Ok(result)
    }
}

/// Writes the whole input in the background and closes the pipe. Programs that
/// never read stdin must not block the run, so write errors are ignored.
fn feed_stdin(handle: Option<ChildStdin>, stdin: &str) {
    let Some(mut handle) = handle else {
        return;
    };
    if stdin.is_empty() {
        return;
    }

    let input = stdin.as_bytes().to_vec();
    tokio::spawn(async move {
        if let Err(e) = handle.write_all(&input).await {
            tracing::debug!("Failed to write stdin: {}", e);
        }
    });
}

async fn kill(child: &mut Child) -> std::io::Result<ExitStatus> {
    if let Err(e) = child.start_kill() {
        tracing::debug!("Failed to kill process: {}", e);
    }
    child.wait().await
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
