//! Unit tests for the channel supervisor, driven by shell stand-ins for the
//! worker so failure modes can be provoked deterministically.

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use katex_ssr_protocol::{FormulaRequest, RenderOptions};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

/// Answers every render with a fixed success and logs setup records to `$1`.
const LOGGING_WORKER: &str = r#"while IFS= read -r line; do
  case "$line" in
    *'"type":"setup"'*) printf '%s\n' "$line" >> "$1" ;;
    *) printf '%s\n' '{"status":"success","html":"<span>ok</span>"}' ;;
  esac
done"#;

/// Answers its first request, then dies on the second without answering
/// unless the marker file `$1` already exists.
const DIES_ONCE_WORKER: &str = r#"IFS= read -r line
printf '%s\n' '{"status":"success","html":"<span>first</span>"}'
if [ ! -e "$1" ]; then
  : > "$1"
  IFS= read -r line
  exit 0
fi
while IFS= read -r line; do
  printf '%s\n' '{"status":"success","html":"<span>ok</span>"}'
done"#;

/// Answers every record with an id no request will carry.
const DESYNC_WORKER: &str = r#"while IFS= read -r line; do
  printf '%s\n' '{"status":"success","html":"stale","id":999999}'
done"#;

fn formula(latex: &str) -> FormulaRequest {
    FormulaRequest::new(latex, false, RenderOptions::new())
}

fn shell(script: &str, extra: &[&str]) -> WorkerConfig {
    let mut args = vec![String::from("-c"), script.to_owned(), String::from("sh")];
    args.extend(extra.iter().map(|arg| (*arg).to_owned()));
    WorkerConfig::new("sh")
        .with_args(args)
        .with_timeout(Duration::from_secs(5))
}

#[fixture]
fn scratch() -> TempDir {
    TempDir::new().expect("temporary directory")
}

#[rstest]
fn missing_executable_is_reported_as_unavailable() {
    let supervisor = ChannelSupervisor::new(
        WorkerConfig::new("/nonexistent/katex-ssr-worker"),
        Vec::new(),
    );

    let error = supervisor.call(&formula("x")).expect_err("spawn must fail");

    assert!(matches!(error, ChannelError::WorkerUnavailable { .. }));
    assert!(error.to_string().contains("cannot locate runtime"));
    assert_eq!(supervisor.state(), WorkerState::Dead);
    assert_eq!(supervisor.generation(), 0);
}

#[rstest]
fn successful_exchange_leaves_worker_ready(scratch: TempDir) {
    let log = scratch.path().join("setup.log");
    let log_arg = log.to_string_lossy().into_owned();
    let supervisor = ChannelSupervisor::new(shell(LOGGING_WORKER, &[&log_arg]), Vec::new());

    let reply = supervisor.call(&formula("x")).expect("call succeeds");

    assert_eq!(reply.response.html(), Some("<span>ok</span>"));
    assert!(reply.contribs.is_empty());
    assert_eq!(supervisor.state(), WorkerState::Ready);
    assert_eq!(supervisor.generation(), 1);
    assert!(supervisor.worker_pid().is_some());
    assert!(!log.exists(), "no setup is sent without extensions");
}

#[rstest]
fn timeout_tears_the_worker_down() {
    let config = WorkerConfig::new("sleep")
        .with_args(["30"])
        .with_timeout(Duration::from_millis(200));
    let supervisor = ChannelSupervisor::new(config, Vec::new());

    let error = supervisor.call(&formula("x")).expect_err("sleep never answers");

    assert!(matches!(error, ChannelError::Timeout { .. }));
    assert_eq!(supervisor.state(), WorkerState::Dead);
    assert_eq!(supervisor.worker_pid(), None);
}

#[rstest]
fn undecodable_response_is_a_protocol_error() {
    let supervisor = ChannelSupervisor::new(
        WorkerConfig::new("cat").with_timeout(Duration::from_secs(5)),
        Vec::new(),
    );

    let error = supervisor.call(&formula("x")).expect_err("cat echoes a request");

    assert!(matches!(
        error,
        ChannelError::Protocol(ProtocolError::Decode { .. })
    ));
    assert_eq!(supervisor.state(), WorkerState::Dead);
}

#[rstest]
fn mismatched_correlation_id_is_detected() {
    let supervisor = ChannelSupervisor::new(shell(DESYNC_WORKER, &[]), Vec::new());

    let error = supervisor.call(&formula("x")).expect_err("ids differ");

    assert!(matches!(
        error,
        ChannelError::Protocol(ProtocolError::Desynchronised { received: 999_999, .. })
    ));
}

#[rstest]
fn worker_exit_before_answering_is_reported() {
    let supervisor = ChannelSupervisor::new(
        shell("read -r line; echo 'boom' >&2; exit 3", &[]),
        Vec::new(),
    );

    let error = supervisor.call(&formula("x")).expect_err("worker exits");

    assert!(matches!(error, ChannelError::WorkerExited { .. }));
    assert_eq!(supervisor.generation(), 1, "a fresh worker is not replaced again");
    assert_eq!(supervisor.state(), WorkerState::Dead);
}

#[rstest]
fn worker_lost_mid_exchange_is_replaced_and_the_request_resent(scratch: TempDir) {
    let marker = scratch.path().join("died");
    let marker_arg = marker.to_string_lossy().into_owned();
    let supervisor = ChannelSupervisor::new(shell(DIES_ONCE_WORKER, &[&marker_arg]), Vec::new());
    supervisor.call(&formula("a")).expect("first worker answers");
    let first_pid = supervisor.worker_pid();

    let reply = supervisor
        .call(&formula("b"))
        .expect("replacement answers the resent request");

    assert!(marker.exists(), "first worker died mid-exchange");
    assert_eq!(reply.response.html(), Some("<span>first</span>"));
    assert_eq!(supervisor.generation(), 2);
    assert_ne!(supervisor.worker_pid(), first_pid);
    assert_eq!(supervisor.state(), WorkerState::Ready);
}

fn signal_worker(supervisor: &ChannelSupervisor) {
    let raw = supervisor.worker_pid().expect("worker running");
    let pid = Pid::from_raw(i32::try_from(raw).expect("pid fits"));
    kill(pid, Signal::SIGKILL).expect("signal delivered");
}

fn kill_worker(supervisor: &ChannelSupervisor) {
    signal_worker(supervisor);
    let deadline = Instant::now() + Duration::from_secs(5);
    while supervisor.is_alive() {
        assert!(Instant::now() < deadline, "worker survived SIGKILL");
        thread::sleep(Duration::from_millis(10));
    }
}

#[rstest]
fn dead_worker_is_respawned_with_its_extensions(scratch: TempDir) {
    let log = scratch.path().join("setup.log");
    let log_arg = log.to_string_lossy().into_owned();
    let supervisor = ChannelSupervisor::new(
        shell(LOGGING_WORKER, &[&log_arg]),
        vec![String::from("braket")],
    );
    supervisor.call(&formula("a")).expect("worker answers");
    let first_pid = supervisor.worker_pid();

    kill_worker(&supervisor);
    assert_eq!(supervisor.state(), WorkerState::Dead);
    supervisor.call(&formula("x")).expect("respawned worker answers");

    assert_eq!(supervisor.generation(), 2);
    assert_ne!(supervisor.worker_pid(), first_pid);
    let setups = fs::read_to_string(&log).expect("setup log written");
    assert_eq!(setups.lines().count(), 2);
}

#[rstest]
fn worker_killed_just_before_a_call_is_replaced(scratch: TempDir) {
    let log = scratch.path().join("setup.log");
    let log_arg = log.to_string_lossy().into_owned();
    let supervisor = ChannelSupervisor::new(
        shell(LOGGING_WORKER, &[&log_arg]),
        vec![String::from("braket")],
    );
    supervisor.call(&formula("a")).expect("worker answers");

    for round in 0..5 {
        signal_worker(&supervisor);
        let reply = supervisor
            .call(&formula("x"))
            .unwrap_or_else(|error| panic!("round {round}: {error}"));
        assert_eq!(reply.contribs, vec!["braket"]);
    }

    assert_eq!(supervisor.generation(), 6);
    let setups = fs::read_to_string(&log).expect("setup log written");
    assert_eq!(setups.lines().count(), 6);
}

#[rstest]
fn extension_deltas_are_sent_once_and_replayed_on_respawn(scratch: TempDir) {
    let log = scratch.path().join("setup.log");
    let log_arg = log.to_string_lossy().into_owned();
    let supervisor = ChannelSupervisor::new(
        shell(LOGGING_WORKER, &[&log_arg]),
        vec![String::from("braket")],
    );

    supervisor.call(&formula("a")).expect("first call");
    supervisor
        .ensure_contribs(&[String::from("physics"), String::from("braket")])
        .expect("delta accepted");
    supervisor
        .ensure_contribs(&[String::from("physics")])
        .expect("repeat is a no-op");
    let reply = supervisor.call(&formula("b")).expect("second call");

    assert_eq!(reply.contribs, vec!["braket", "physics"]);
    let setups = fs::read_to_string(&log).expect("setup log written");
    let lines: Vec<_> = setups.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"{"type":"setup","contribs":["braket"]}"#,
            r#"{"type":"setup","contribs":["physics"]}"#,
        ]
    );
    assert_eq!(supervisor.active_contribs(), vec!["braket", "physics"]);
}

#[rstest]
fn extensions_requested_before_spawn_are_sent_at_spawn(scratch: TempDir) {
    let log = scratch.path().join("setup.log");
    let log_arg = log.to_string_lossy().into_owned();
    let supervisor = ChannelSupervisor::new(shell(LOGGING_WORKER, &[&log_arg]), Vec::new());

    supervisor
        .ensure_contribs(&[String::from("sets"), String::from("  ")])
        .expect("recorded");
    assert_eq!(supervisor.state(), WorkerState::NotStarted);
    supervisor.call(&formula("a")).expect("call");

    let setups = fs::read_to_string(&log).expect("setup log written");
    assert_eq!(setups.trim_end(), r#"{"type":"setup","contribs":["sets"]}"#);
}

#[rstest]
fn shutdown_is_idempotent_and_final() {
    let supervisor = ChannelSupervisor::new(
        WorkerConfig::new("cat").with_timeout(Duration::from_secs(5)),
        Vec::new(),
    );
    supervisor.start().expect("cat starts");

    supervisor.shutdown();
    supervisor.shutdown();

    assert_eq!(supervisor.state(), WorkerState::Stopped);
    assert!(!supervisor.is_alive());
    assert!(matches!(
        supervisor.call(&formula("x")),
        Err(ChannelError::ShutDown)
    ));
    assert!(matches!(
        supervisor.ensure_contribs(&[String::from("sets")]),
        Err(ChannelError::ShutDown)
    ));
}
