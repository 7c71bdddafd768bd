//! Probe execution through a shell.
//!
//! Benchmarks express probes as shell snippets (pipes, `grep`, `awk`), so
//! every command runs as `<shell> -c <command>` with output captured lossily
//! as UTF-8.

use crate::util::truncate_bytes;
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::warn;

const MAX_PROBE_OUTPUT_BYTES: usize = 1024 * 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(25);
const READER_GRACE: Duration = Duration::from_secs(1);

/// Captured output of one probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs probe commands. Errors are spawn-level failures; a command that ran
/// but complained reports it through `stderr`.
pub trait ProbeExecutor {
    fn execute(&self, command: &str) -> Result<ProbeOutput>;
}

#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: PathBuf,
    timeout: Duration,
}

impl ShellExecutor {
    pub fn new(shell: &str, timeout: Duration) -> Result<Self> {
        let shell = which::which(shell).with_context(|| format!("resolve shell {shell}"))?;
        Ok(Self { shell, timeout })
    }
}

impl ProbeExecutor for ShellExecutor {
    fn execute(&self, command: &str) -> Result<ProbeOutput> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        own_process_group(&mut cmd);
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn probe {command:?}"))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let start = Instant::now();
        let mut timed_out = false;
        loop {
            if child.try_wait().context("check probe status")?.is_some() {
                break;
            }
            if start.elapsed() > self.timeout {
                timed_out = true;
                kill_probe(&mut child);
                if let Err(err) = child.wait() {
                    warn!(command, error = %err, "failed to reap timed out probe");
                }
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        // Descendants that left the process group can hold the pipes open
        // after the shell exits; stop waiting for them at the deadline.
        let deadline = (start + self.timeout).max(Instant::now()) + READER_GRACE;
        let stdout = collect(stdout, deadline).context("collect probe stdout")?;
        let stderr = collect(stderr, deadline).context("collect probe stderr")?;

        let mut notes = Vec::new();
        if timed_out {
            notes.push(format!(
                "probe timed out after {:.1}s",
                self.timeout.as_secs_f64()
            ));
        }
        if stdout.is_none() || stderr.is_none() {
            notes.push("probe output still open after the shell exited".to_string());
        }
        let mut stderr = stderr.unwrap_or_default();
        for note in notes {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&note);
        }
        Ok(ProbeOutput {
            stdout: stdout.unwrap_or_default(),
            stderr,
        })
    }
}

/// Probes get their own process group so a timeout also reaps pipelines and
/// background children that would otherwise keep the output pipes open.
#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_probe(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let group = i32::try_from(child.id()).map(Pid::from_raw);
    match group {
        Ok(group) => {
            if let Err(err) = killpg(group, Signal::SIGKILL) {
                warn!(pid = child.id(), error = %err, "failed to kill probe process group");
                let _ = child.kill();
            }
        }
        Err(_) => {
            let _ = child.kill();
        }
    }
}

#[cfg(not(unix))]
fn kill_probe(child: &mut Child) {
    if let Err(err) = child.kill() {
        warn!(pid = child.id(), error = %err, "failed to kill probe");
    }
}

type Drain = Option<Receiver<std::io::Result<Vec<u8>>>>;

/// Read a pipe to the end on a detached thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let result = pipe.read_to_end(&mut bytes).map(|_| bytes);
            let _ = tx.send(result);
        });
        rx
    })
}

/// `Ok(None)` when the pipe is still open at `deadline`; the reader thread is
/// left behind.
fn collect(reader: Drain, deadline: Instant) -> Result<Option<String>> {
    let Some(reader) = reader else {
        return Ok(Some(String::new()));
    };
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Ok(Some(truncate_bytes(&bytes?, MAX_PROBE_OUTPUT_BYTES))),
        Err(RecvTimeoutError::Timeout) => Ok(None),
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("probe output reader panicked")),
    }
}
