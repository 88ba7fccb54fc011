//! Host-side supervision of the rendering worker.
//!
//! The worker channel carries no mandatory message identifiers, so responses
//! are paired with requests purely by order. [`ChannelSupervisor`] therefore
//! admits exactly one exchange at a time: the channel mutex is held from the
//! moment a request is written until its response has been read, and callers
//! queue on that mutex.
//!
//! Any failure that could leave an unread response in the pipe (a timeout,
//! an undecodable record, a mismatched correlation id) tears the worker down
//! instead of reusing it. The next call spawns a fresh worker and replays
//! every extension requested so far.
//!
//! A worker that was already running may die just before a call without the
//! supervisor having noticed yet. When the exchange then fails without any
//! response having been read, that failure is the detected death: the worker
//! is replaced once and the same request is sent to the replacement.

mod config;
mod process;
mod state;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use katex_ssr_protocol::{
    FormulaRequest, ProtocolError, RenderRequest, RenderResponse, decode_response, encode_request,
};
use tracing::{debug, info, warn};

pub use self::config::{WORKER_BINARY, WorkerConfig};
pub use self::state::WorkerState;
use self::process::WorkerProcess;
use crate::error::ChannelError;

/// Log target for supervisor operations.
const SUPERVISOR_TARGET: &str = "katex_ssr::supervisor";

/// Time a worker is given to exit after its stdin closes during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// A worker's answer together with the extensions that worker held.
///
/// Output depends on the loaded extensions, so results must be filed under
/// this set rather than under whatever the caller expected to be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReply {
    /// Decoded response record.
    pub response: RenderResponse,
    /// Extensions sent to the answering worker, sorted.
    pub contribs: Vec<String>,
}

impl ChannelReply {
    /// Pairs a response with the extensions its worker held.
    #[must_use]
    pub const fn new(response: RenderResponse, contribs: Vec<String>) -> Self {
        Self { response, contribs }
    }
}

/// Serialized request/response access to a rendering worker.
///
/// This is the seam the render service depends on; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
pub trait RenderChannel: Send + Sync {
    /// Sends one render request and waits for its response.
    ///
    /// The reply names the extensions the answering worker held.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] when the worker cannot be reached, breaks
    /// protocol, or does not answer in time.
    fn call(&self, formula: &FormulaRequest) -> Result<ChannelReply, ChannelError>;

    /// Makes sure every named extension has been requested from the worker.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ShutDown`] once the channel is closed.
    fn ensure_contribs(&self, names: &[String]) -> Result<(), ChannelError>;

    /// Every extension requested through this channel, in request order.
    fn active_contribs(&self) -> Vec<String>;

    /// Stops the worker. Idempotent.
    fn shutdown(&self);
}

struct Channel {
    process: Option<WorkerProcess>,
    sent: BTreeSet<String>,
    next_id: u64,
    stopped: bool,
}

/// Owns the worker process and serializes all access to it.
///
/// Dropping the supervisor kills any running worker.
pub struct ChannelSupervisor {
    config: WorkerConfig,
    channel: Mutex<Channel>,
    requested: RwLock<Vec<String>>,
    state: Mutex<WorkerState>,
    generation: AtomicU64,
    pid: AtomicU32,
}

impl ChannelSupervisor {
    /// Creates a supervisor that will load `contribs` into every worker it
    /// spawns. No process is started until [`Self::start`] or the first call.
    #[must_use]
    pub fn new(config: WorkerConfig, contribs: Vec<String>) -> Self {
        let mut requested: Vec<String> = Vec::new();
        for name in contribs {
            push_unique(&mut requested, &name);
        }
        Self {
            config,
            channel: Mutex::new(Channel {
                process: None,
                sent: BTreeSet::new(),
                next_id: 1,
                stopped: false,
            }),
            requested: RwLock::new(requested),
            state: Mutex::new(WorkerState::NotStarted),
            generation: AtomicU64::new(0),
            pid: AtomicU32::new(0),
        }
    }

    /// Spawns the worker now rather than on first use.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] when the worker cannot be spawned or
    /// configured.
    pub fn start(&self) -> Result<(), ChannelError> {
        let mut channel = self.lock_channel();
        if channel.stopped {
            return Err(ChannelError::ShutDown);
        }
        self.ensure_alive(&mut channel).map(drop)
    }

    /// Worker configuration in use.
    #[must_use]
    pub const fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// State of the current worker instance.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of workers successfully spawned so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Process id of the current worker, if one is running.
    #[must_use]
    pub fn worker_pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::Acquire) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Checks whether the current worker process is still running.
    ///
    /// Waits for any in-flight exchange to finish first.
    pub fn is_alive(&self) -> bool {
        let mut channel = self.lock_channel();
        let Some(process) = channel.process.as_mut() else {
            return false;
        };
        if process.has_exited() {
            self.set_state(WorkerState::Dead);
            return false;
        }
        true
    }

    fn lock_channel(&self) -> MutexGuard<'_, Channel> {
        // A panic mid-exchange leaves the process in an unknown state; the
        // next exchange detects that through the usual failure paths.
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn requested_snapshot(&self) -> Vec<String> {
        self.requested
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Makes sure a live worker is available, spawning one if needed.
    ///
    /// A worker found dead is replaced by exactly one spawn attempt. Returns
    /// `true` when a worker was spawned.
    fn ensure_alive(&self, channel: &mut Channel) -> Result<bool, ChannelError> {
        if let Some(process) = channel.process.as_mut() {
            if !process.has_exited() {
                return Ok(false);
            }
            warn!(
                target: SUPERVISOR_TARGET,
                pid = process.pid(),
                stderr = ?process.stderr_tail(),
                "rendering worker died between calls; respawning"
            );
            self.tear_down(channel);
        }
        self.spawn(channel).map(|()| true)
    }

    fn spawn(&self, channel: &mut Channel) -> Result<(), ChannelError> {
        self.set_state(WorkerState::Starting);
        let mut process = match WorkerProcess::spawn(&self.config) {
            Ok(process) => process,
            Err(error) => {
                self.set_state(WorkerState::Dead);
                return Err(error);
            }
        };

        let contribs = self.requested_snapshot();
        if !contribs.is_empty() {
            if let Err(error) = send_setup(&mut process, contribs.clone()) {
                self.set_state(WorkerState::Dead);
                return Err(error);
            }
        }

        let pid = process.pid();
        channel.sent = contribs.into_iter().collect();
        channel.process = Some(process);
        self.pid.store(pid, Ordering::Release);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.set_state(WorkerState::Ready);
        info!(
            target: SUPERVISOR_TARGET,
            pid,
            generation,
            contribs = ?channel.sent,
            "rendering worker ready"
        );
        Ok(())
    }

    fn tear_down(&self, channel: &mut Channel) {
        if let Some(mut process) = channel.process.take() {
            process.terminate(Duration::ZERO);
        }
        channel.sent.clear();
        self.pid.store(0, Ordering::Release);
        self.set_state(WorkerState::Dead);
    }

    fn exchange(
        &self,
        channel: &mut Channel,
        formula: &FormulaRequest,
    ) -> Result<ChannelReply, ChannelError> {
        let id = channel.next_id;
        channel.next_id += 1;
        let record = encode_request(&RenderRequest::from(formula.clone().with_id(id)))?;
        let process = channel
            .process
            .as_mut()
            .ok_or_else(|| ChannelError::WorkerExited {
                status: String::from("not running"),
                stderr: Vec::new(),
            })?;

        self.set_state(WorkerState::Busy);
        debug!(
            target: SUPERVISOR_TARGET,
            id,
            latex_len = formula.latex().len(),
            display_mode = formula.display_mode(),
            "sending render request"
        );
        process.send(&record)?;
        let line = process.receive(self.config.timeout)?;
        let response = decode_response(&line)?;
        if let Some(received) = response.id().filter(|received| *received != id) {
            return Err(ProtocolError::Desynchronised {
                expected: id,
                received,
            }
            .into());
        }
        self.set_state(WorkerState::Ready);
        Ok(ChannelReply::new(
            response,
            channel.sent.iter().cloned().collect(),
        ))
    }
}

impl RenderChannel for ChannelSupervisor {
    fn call(&self, formula: &FormulaRequest) -> Result<ChannelReply, ChannelError> {
        let mut channel = self.lock_channel();
        if channel.stopped {
            return Err(ChannelError::ShutDown);
        }
        let spawned = self.ensure_alive(&mut channel)?;
        let mut result = self.exchange(&mut channel, formula);
        if !spawned
            && let Err(lost) = &result
            && lost.is_lost_worker()
        {
            warn!(
                target: SUPERVISOR_TARGET,
                error = %lost,
                "rendering worker died before answering; respawning and resending"
            );
            self.tear_down(&mut channel);
            self.spawn(&mut channel)?;
            result = self.exchange(&mut channel, formula);
        }
        if let Err(error) = &result {
            warn!(
                target: SUPERVISOR_TARGET,
                %error,
                "tearing down rendering worker after failed exchange"
            );
            self.tear_down(&mut channel);
        }
        result
    }

    fn ensure_contribs(&self, names: &[String]) -> Result<(), ChannelError> {
        let has_new = {
            let requested = self.requested.read().unwrap_or_else(PoisonError::into_inner);
            names
                .iter()
                .any(|name| !is_blank(name) && !requested.iter().any(|seen| seen == name.trim()))
        };
        if !has_new {
            return Ok(());
        }

        let mut channel = self.lock_channel();
        if channel.stopped {
            return Err(ChannelError::ShutDown);
        }
        {
            let mut requested = self.requested.write().unwrap_or_else(PoisonError::into_inner);
            for name in names {
                push_unique(&mut requested, name);
            }
        }

        let delta: Vec<String> = self
            .requested_snapshot()
            .into_iter()
            .filter(|name| !channel.sent.contains(name))
            .collect();
        let Some(process) = channel.process.as_mut() else {
            // Replayed in full when the next worker spawns.
            return Ok(());
        };
        if delta.is_empty() || process.has_exited() {
            return Ok(());
        }
        debug!(target: SUPERVISOR_TARGET, contribs = ?delta, "loading additional extensions");
        match send_setup(process, delta.clone()) {
            Ok(()) => channel.sent.extend(delta),
            Err(error) => {
                warn!(
                    target: SUPERVISOR_TARGET,
                    %error,
                    "failed to send extension setup; worker will be respawned"
                );
                self.tear_down(&mut channel);
            }
        }
        Ok(())
    }

    fn active_contribs(&self) -> Vec<String> {
        self.requested_snapshot()
    }

    fn shutdown(&self) {
        let mut channel = self.lock_channel();
        if channel.stopped {
            return;
        }
        channel.stopped = true;
        if let Some(mut process) = channel.process.take() {
            debug!(target: SUPERVISOR_TARGET, pid = process.pid(), "shutting down rendering worker");
            process.terminate(SHUTDOWN_GRACE);
        }
        channel.sent.clear();
        self.pid.store(0, Ordering::Release);
        self.set_state(WorkerState::Stopped);
    }
}

impl fmt::Debug for ChannelSupervisor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ChannelSupervisor")
            .field("command", &self.config.command)
            .field("state", &self.state())
            .field("generation", &self.generation())
            .field("pid", &self.worker_pid())
            .finish_non_exhaustive()
    }
}

fn send_setup(process: &mut WorkerProcess, contribs: Vec<String>) -> Result<(), ChannelError> {
    let record = encode_request(&RenderRequest::setup(contribs))?;
    process.send(&record)
}

fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    let trimmed = name.trim();
    if trimmed.is_empty() || names.iter().any(|seen| seen == trimmed) {
        return;
    }
    names.push(trimmed.to_owned());
}

#[cfg(all(test, unix))]
mod tests;
