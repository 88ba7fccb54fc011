//! Helpers shared by the end-to-end tests.

#![expect(dead_code, reason = "each test crate uses a different subset")]

use std::time::Duration;

use katex_ssr::{ChannelSupervisor, RenderCache, RenderService, RenderSettings, WorkerConfig};
use katex_ssr_protocol::RenderOptions;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use serde_json::Value;

/// Path of the worker binary built alongside these tests.
pub const WORKER: &str = env!("CARGO_BIN_EXE_katex-ssr-worker");

/// Generous per-call timeout; unoptimised builds typeset slowly.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Worker configuration for the real worker binary.
pub fn worker_config() -> WorkerConfig {
    WorkerConfig::new(WORKER).with_timeout(CALL_TIMEOUT)
}

/// Service over the real worker with the given defaults.
pub fn service_with(settings: RenderSettings, cache: RenderCache) -> RenderService {
    let supervisor = ChannelSupervisor::new(worker_config(), settings.contribs.clone());
    RenderService::new(supervisor, cache, settings)
}

/// Service over the real worker with no configured options or extensions.
pub fn service() -> RenderService {
    service_with(RenderSettings::default(), RenderCache::new())
}

/// Converts a JSON object literal into render options.
pub fn options(value: Value) -> RenderOptions {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// Sends `SIGKILL` to the current worker and returns at once, before the
/// supervisor can have noticed the death.
pub fn kill_worker(service: &RenderService) {
    let raw = service.channel().worker_pid().expect("worker running");
    let pid = Pid::from_raw(i32::try_from(raw).expect("pid fits"));
    kill(pid, Signal::SIGKILL).expect("signal delivered");
}
