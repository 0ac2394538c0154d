//! Subprocess execution with a wall-clock timeout.
//!
//! stdout is handed to a consumer while the process runs, so streaming
//! parsers see events live. stderr is drained on a scoped thread and a
//! watchdog thread polls the child, killing its whole process group once
//! the deadline passes.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::runner::CommandSpec;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Outcome of one finished subprocess.
#[derive(Clone, Debug, Default)]
pub struct Execution {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Everything the process wrote to stdout, consumed or not.
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl Execution {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Exit code for reporting; signals and timeouts map to `-1`.
    pub fn reported_exit_code(&self) -> i32 {
        match self.exit_code {
            Some(code) if !self.timed_out => code,
            _ => -1,
        }
    }
}

/// Run `spec`, feeding its stdout to `consume` as it is produced.
///
/// Whatever `consume` leaves unread is drained afterwards so the child never
/// blocks on a full pipe. Only spawning can fail; everything after that is
/// reported through [`Execution`].
pub fn execute<T>(
    spec: &CommandSpec,
    timeout: Duration,
    consume: impl FnOnce(&mut dyn BufRead) -> T,
) -> io::Result<(Execution, T)> {
    let start = Instant::now();
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Leader of its own group; see `kill_process_tree`.
        command.process_group(0);
    }
    let mut child = command.spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

    let (value, stdout, stderr, waited) = thread::scope(|scope| {
        let stderr_reader = scope.spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut buf) {
                tracing::debug!("stderr read stopped early: {e}");
            }
            String::from_utf8_lossy(&buf).into_owned()
        });
        let watchdog = scope.spawn(move || watch(child, timeout));

        let mut reader = Capture::new(stdout);
        let value = consume(&mut reader);
        reader.drain();
        let stdout = reader.into_string();

        let stderr = stderr_reader.join().unwrap_or_default();
        let waited = watchdog
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("watchdog thread panicked")));
        (value, stdout, stderr, waited)
    });

    let mut execution = Execution {
        exit_code: None,
        timed_out: false,
        stdout,
        stderr,
        elapsed: start.elapsed(),
    };
    match waited {
        Ok((status, timed_out)) => {
            execution.exit_code = status.code();
            execution.timed_out = timed_out;
        }
        Err(e) => {
            tracing::warn!(command = %spec, "lost track of child process: {e}");
        }
    }
    tracing::debug!(
        command = %spec,
        exit_code = ?execution.exit_code,
        timed_out = execution.timed_out,
        elapsed = ?execution.elapsed,
        "process finished"
    );
    Ok((execution, value))
}

/// Wait for `child`, killing it at the deadline. Returns its status and
/// whether it was killed.
fn watch(mut child: Child, timeout: Duration) -> io::Result<(ExitStatus, bool)> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if Instant::now() >= deadline {
            tracing::warn!(pid = child.id(), ?timeout, "process timed out, killing it");
            if let Err(e) = kill_process_tree(&mut child) {
                tracing::warn!("failed to kill timed-out process: {e}");
            }
            return Ok((child.wait()?, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill `child` and every process left in its group. Grandchildren holding
/// the output pipes would otherwise keep the readers blocked.
#[cfg(unix)]
fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pid = i32::try_from(child.id()).map_err(io::Error::other)?;
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(pid, "killpg failed ({e}), killing the child only");
            child.kill()
        }
    }
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Buffered reader that records every byte its consumer reads.
struct Capture<R> {
    inner: BufReader<R>,
    captured: Vec<u8>,
}

impl<R: Read> Capture<R> {
    fn new(inner: R) -> Self {
        Capture {
            inner: BufReader::new(inner),
            captured: Vec::new(),
        }
    }

    /// Read the rest of the stream into the capture.
    fn drain(&mut self) {
        if let Err(e) = io::copy(self, &mut io::sink()) {
            tracing::debug!("stdout drain stopped early: {e}");
        }
    }

    fn into_string(self) -> String {
        match String::from_utf8(self.captured) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

impl<R: Read> Read for Capture<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.captured.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

impl<R: Read> BufRead for Capture<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        let buffered = self.inner.buffer();
        let taken = amt.min(buffered.len());
        self.captured.extend_from_slice(&buffered[..taken]);
        self.inner.consume(amt);
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
