//! Process Termination
//!
//! Graceful-then-forceful teardown of the launched emulator and every
//! process it spawned, tolerant of processes that are already gone.

use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessStatus, Signal, System};
use tracing::{debug, warn};

use crate::handle::LaunchHandle;

/// How long each of the graceful and forceful stop attempts may take
const PROCESS_TERMINATION_TIMEOUT: Duration = Duration::from_secs(15);

/// Poll interval while waiting for a signaled process to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Stop the emulator recorded in `handle` along with its descendants.
///
/// Blocking; run it on a plain thread or under `spawn_blocking`. Taking
/// the pid out of the handle makes repeated and concurrent calls no-ops,
/// and a process that exited on its own is simply absent from the process
/// table, so nothing is ever signaled twice or at a stale pid. Failures
/// are logged and swallowed: a stuck emulator must never mask the
/// pipeline's real result.
pub fn terminate(handle: &LaunchHandle) {
    cancel_boot_wait(handle);

    let Some(pid) = handle.take_emulator() else {
        return;
    };
    let pid = Pid::from_u32(pid);

    let mut sys = System::new();
    sys.refresh_processes();
    if sys.process(pid).is_none() {
        debug!("Emulator process {} already gone", pid);
        return;
    }

    // Snapshot descendants before signaling anything; they may keep
    // forking, and the graceful path is not obliged to reap them.
    let descendants = collect_descendants(&sys, pid);

    // Graceful stop first, giving the emulator the chance to persist a
    // snapshot for warm boots in subsequent runs.
    signal(&sys, pid, Signal::Term);
    if !wait_for_exit(&mut sys, pid, PROCESS_TERMINATION_TIMEOUT) {
        warn!("Emulator {} ignored the graceful stop, killing it", pid);
        signal(&sys, pid, Signal::Kill);
        if !wait_for_exit(&mut sys, pid, PROCESS_TERMINATION_TIMEOUT) {
            warn!(
                "Emulator {} did not confirm exit within {:?}",
                pid, PROCESS_TERMINATION_TIMEOUT
            );
        }
    }

    // Whatever the stop left behind is killed unconditionally.
    sys.refresh_processes();
    for child in descendants {
        if let Some(process) = sys.process(child) {
            debug!("Killing leftover descendant {}", child);
            process.kill();
        }
    }
}

/// Cancel the in-flight readiness poll, if any. Called from the exit
/// watcher when the emulator dies before boot completes, and from
/// [`terminate`] itself.
pub fn cancel_boot_wait(handle: &LaunchHandle) {
    if let Some(pid) = handle.take_boot_waiter() {
        debug!("Cancelling readiness poll subprocess {}", pid);
        let pid = Pid::from_u32(pid);
        let mut sys = System::new();
        sys.refresh_processes();
        if let Some(process) = sys.process(pid) {
            process.kill();
        }
    }
}

/// Deliver a signal, falling back to a forceful kill on platforms that do
/// not support it
fn signal(sys: &System, pid: Pid, signal: Signal) {
    let Some(process) = sys.process(pid) else {
        return;
    };
    if process.kill_with(signal).is_none() {
        process.kill();
    }
}

/// Transitive children of `root` in the current process table
fn collect_descendants(sys: &System, root: Pid) -> Vec<Pid> {
    let mut descendants = Vec::new();
    let mut frontier = vec![root];
    while let Some(parent) = frontier.pop() {
        for (pid, process) in sys.processes() {
            if process.parent() == Some(parent) {
                descendants.push(*pid);
                frontier.push(*pid);
            }
        }
    }
    descendants
}

/// Poll until the process leaves the table (or turns zombie, when nobody
/// is left to reap it) or the timeout lapses
fn wait_for_exit(sys: &mut System, pid: Pid, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if !sys.refresh_process(pid) {
            return true;
        }
        if let Some(process) = sys.process(pid) {
            if process.status() == ProcessStatus::Zombie {
                return true;
            }
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(EXIT_POLL_INTERVAL);
    }
}
