use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, error};

/// Starts `program` detached from this process and returns without waiting.
///
/// Returns whether a child was spawned. A missing binary is logged and
/// nothing is started.
pub fn spawn_detached(program: &str, args: &[String]) -> bool {
    if !Path::new(program).exists() {
        error!(program, "Binary '{program}' doesn't exist");
        return false;
    }

    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
    // SAFETY: setsid is async-signal-safe and touches no state of the parent.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid().map(drop).map_err(std::io::Error::from)
        });
    }

    match command.spawn() {
        Ok(mut child) => {
            let pid = child.id();
            debug!(program, pid, "Spawned");
            let reaper = thread::Builder::new()
                .name(format!("reap-{pid}"))
                .spawn(move || child.wait().map(drop));
            if let Err(err) = reaper {
                error!(?err, pid, "Failed to start reaper thread");
            }
            true
        }
        Err(err) => {
            error!(program, ?err, "Failed to launch");
            false
        }
    }
}
