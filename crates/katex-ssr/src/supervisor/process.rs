//! A single spawned worker process and its stdio plumbing.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::config::WorkerConfig;
use crate::error::ChannelError;

/// Log target for worker process management.
pub(super) const PROCESS_TARGET: &str = "katex_ssr::supervisor::process";

/// Number of stderr lines retained for diagnostics.
const STDERR_TAIL_LINES: usize = 32;

/// Interval between exit polls while waiting for a worker to stop.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

type StderrTail = Arc<Mutex<VecDeque<String>>>;

/// A running worker with piped stdio.
///
/// Stdout is read on a dedicated thread that forwards one line at a time
/// over a channel, which lets callers bound their wait with a timeout.
/// Stderr is drained on a second thread into a bounded tail buffer.
pub(super) struct WorkerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    responses: Receiver<String>,
    stderr_tail: StderrTail,
    reaped: bool,
}

impl WorkerProcess {
    /// Spawns the worker described by `config`.
    pub(super) fn spawn(config: &WorkerConfig) -> Result<Self, ChannelError> {
        let command_display = config.command_display();
        debug!(
            target: PROCESS_TARGET,
            command = %command_display,
            args = ?config.args,
            "spawning rendering worker"
        );

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|source| spawn_error(&command_display, source))?;
        let pid = child.id();

        let stdin = child.stdin.take();
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            kill_quietly(&mut child);
            return Err(spawn_error(
                &command_display,
                io::Error::other("worker stdio was not captured"),
            ));
        };

        let (sender, responses) = mpsc::channel();
        let stderr_tail = StderrTail::default();
        let threads = start_reader(stdout, sender)
            .and_then(|()| start_stderr_drain(stderr, Arc::clone(&stderr_tail), pid));
        if let Err(source) = threads {
            kill_quietly(&mut child);
            return Err(spawn_error(&command_display, source));
        }

        debug!(target: PROCESS_TARGET, pid, "rendering worker spawned");
        Ok(Self {
            child,
            stdin,
            responses,
            stderr_tail,
            reaped: false,
        })
    }

    /// Operating system process id.
    pub(super) fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Writes one complete record and flushes it.
    pub(super) fn send(&mut self, record: &str) -> Result<(), ChannelError> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            ChannelError::io(io::Error::new(
                ErrorKind::BrokenPipe,
                "worker stdin is closed",
            ))
        })?;
        stdin
            .write_all(record.as_bytes())
            .and_then(|()| stdin.flush())
            .map_err(ChannelError::io)
    }

    /// Waits up to `timeout` for the next response line.
    pub(super) fn receive(&mut self, timeout: Duration) -> Result<String, ChannelError> {
        match self.responses.recv_timeout(timeout) {
            Ok(line) => Ok(line),
            Err(RecvTimeoutError::Timeout) => Err(ChannelError::Timeout { timeout }),
            Err(RecvTimeoutError::Disconnected) => {
                let status = self.wait_for_exit(Duration::from_millis(100));
                Err(ChannelError::WorkerExited {
                    status,
                    stderr: self.stderr_tail(),
                })
            }
        }
    }

    /// Returns `true` once the process has exited.
    pub(super) fn has_exited(&mut self) -> bool {
        if self.reaped {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: PROCESS_TARGET, pid = self.pid(), %status, "rendering worker exited");
                self.reaped = true;
                true
            }
            Ok(None) => false,
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    pid = self.pid(),
                    %error,
                    "failed to check rendering worker status"
                );
                false
            }
        }
    }

    /// Snapshot of the most recent stderr lines.
    pub(super) fn stderr_tail(&self) -> Vec<String> {
        self.stderr_tail
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Closes stdin, waits up to `grace` for a clean exit, then kills.
    pub(super) fn terminate(&mut self, grace: Duration) {
        drop(self.stdin.take());
        if self.reaped {
            return;
        }
        let status = self.wait_for_exit(grace);
        if self.reaped {
            debug!(target: PROCESS_TARGET, pid = self.pid(), %status, "rendering worker stopped");
            return;
        }
        if !grace.is_zero() {
            warn!(
                target: PROCESS_TARGET,
                pid = self.pid(),
                "rendering worker did not exit gracefully, killing"
            );
        }
        kill_quietly(&mut self.child);
        self.reaped = true;
    }

    fn wait_for_exit(&mut self, limit: Duration) -> String {
        let deadline = Instant::now() + limit;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    self.reaped = true;
                    return status.to_string();
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL_INTERVAL),
                Ok(None) => return String::from("still running"),
                Err(error) => return format!("status unavailable: {error}"),
            }
        }
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        self.terminate(Duration::ZERO);
    }
}

fn spawn_error(command: &str, source: io::Error) -> ChannelError {
    match source.kind() {
        ErrorKind::NotFound => ChannelError::WorkerUnavailable {
            command: command.to_owned(),
            reason: String::from("executable not found; install it or set `worker_command`"),
        },
        ErrorKind::PermissionDenied => ChannelError::WorkerUnavailable {
            command: command.to_owned(),
            reason: String::from("executable is not runnable"),
        },
        _ => ChannelError::Spawn {
            command: command.to_owned(),
            source: Arc::new(source),
        },
    }
}

fn kill_quietly(child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(target: PROCESS_TARGET, pid = child.id(), %error, "kill failed");
    }
    if let Err(error) = child.wait() {
        debug!(target: PROCESS_TARGET, pid = child.id(), %error, "reap failed");
    }
}

fn start_reader(stdout: ChildStdout, sender: Sender<String>) -> io::Result<()> {
    thread::Builder::new()
        .name(String::from("katex-ssr-worker-stdout"))
        .spawn(move || forward_lines(stdout, &sender))
        .map(drop)
}

fn forward_lines(stdout: ChildStdout, sender: &Sender<String>) {
    for read in BufReader::new(stdout).lines() {
        match read {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => {
                if sender.send(line).is_err() {
                    break;
                }
            }
            Err(error) => {
                debug!(target: PROCESS_TARGET, %error, "stopped reading worker output");
                break;
            }
        }
    }
}

fn start_stderr_drain(stderr: ChildStderr, tail: StderrTail, pid: u32) -> io::Result<()> {
    thread::Builder::new()
        .name(String::from("katex-ssr-worker-stderr"))
        .spawn(move || drain_stderr(stderr, &tail, pid))
        .map(drop)
}

fn drain_stderr(stderr: ChildStderr, tail: &StderrTail, pid: u32) {
    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
        debug!(target: PROCESS_TARGET, pid, line = %line, "worker stderr");
        let mut buffer = tail.lock().unwrap_or_else(PoisonError::into_inner);
        if buffer.len() == STDERR_TAIL_LINES {
            buffer.pop_front();
        }
        buffer.push_back(line);
    }
}
