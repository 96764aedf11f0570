//! Worker stand-ins: `sh -c` scripts that speak the worker's stdout protocol.

use std::time::{Duration, Instant};

use mediabox_core::aggregator::ProgressSnapshot;
use mediabox_core::controller::Controller;
use mediabox_core::worker::WorkerCommand;

pub const GRACE: Duration = Duration::from_millis(100);

/// A worker that runs `script` under `/bin/sh`. Request arguments land in
/// `$1..`.
pub fn script(script: &str) -> WorkerCommand {
    WorkerCommand::new(
        "/bin/sh",
        vec!["-c".to_string(), script.to_string(), "fake-worker".to_string()],
    )
}

/// Reports a title, one progress line and a warning on stderr, then keeps
/// running.
pub fn long_running() -> WorkerCommand {
    script(
        r#"echo '{"kind":"title","text":"Clip"}'
echo '{"kind":"info","text":"download 45.2% of 10MB"}'
echo 'WARNING: throttled' >&2
exec sleep 30"#,
    )
}

/// Ignores SIGTERM and never exits on its own.
pub fn stubborn() -> WorkerCommand {
    script("trap '' TERM; while true; do sleep 0.05; done")
}

/// Reports progress and exits without a completion event.
pub fn crashing() -> WorkerCommand {
    script(
        r#"echo '{"kind":"info","text":"download 45.2% of 10MB"}'
exit 1"#,
    )
}

/// Finishes a download normally.
pub fn completing() -> WorkerCommand {
    script(
        r#"echo '{"kind":"title","text":"Done clip"}'
echo '{"kind":"progress","percent":100.0}'
echo '{"kind":"state","state":"complete"}'"#,
    )
}

pub fn controller(command: WorkerCommand) -> Controller {
    Controller::new(command, GRACE)
}

/// Poll `controller` until `pred` holds for a snapshot, or panic after 5s.
pub async fn wait_for(
    controller: &Controller,
    pred: impl Fn(&ProgressSnapshot) -> bool,
) -> ProgressSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snap = controller.progress().await;
        if pred(&snap) {
            return snap;
        }
        assert!(Instant::now() < deadline, "condition not reached: {:?}", snap);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Completes at once for sources starting with `done`, otherwise keeps
/// running. `$1` is `--source=<id>`.
pub fn by_source() -> WorkerCommand {
    script(
        r#"case "$1" in
--source=done*)
  echo '{"kind":"state","state":"complete"}'
  ;;
*)
  echo '{"kind":"title","text":"Running clip"}'
  exec sleep 30
  ;;
esac"#,
    )
}
