use crate::process::ProcessState;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use signal_hook::consts::{SIGCHLD, SIGHUP, SIGINT, SIGPIPE, SIGTERM};
use std::io;

/// Signals that end the accept loop
pub const TERMINATION_SIGNALS: [i32; 3] = [SIGINT, SIGHUP, SIGTERM];

/// Install the service signal handlers.
///
/// SIGINT, SIGHUP and SIGTERM clear the activation flag of `state`. SIGPIPE
/// is swallowed. SIGCHLD reaps finished children, but only when the
/// process still has the default disposition for it. Returns whether the
/// SIGCHLD handler was installed.
pub fn install(state: &ProcessState) -> io::Result<bool> {
    for sig in TERMINATION_SIGNALS {
        let state = state.clone();
        // Only an atomic store happens inside the handler
        unsafe {
            signal_hook::low_level::register(sig, move || state.deactivate())?;
        }
    }

    unsafe {
        signal_hook::low_level::register(SIGPIPE, || {})?;
    }

    if !child_disposition_is_default() {
        return Ok(false);
    }

    // waitpid is async-signal-safe and reap_children does not allocate
    unsafe {
        signal_hook::low_level::register(SIGCHLD, || {
            reap_children();
        })?;
    }
    Ok(true)
}

/// True when nobody has installed or ignored a SIGCHLD handler yet
pub fn child_disposition_is_default() -> bool {
    let mut current: libc::sigaction = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::sigaction(SIGCHLD, std::ptr::null(), &mut current) };
    rc == 0 && current.sa_sigaction == libc::SIG_DFL
}

/// Reap every terminated child without blocking. Returns how many were reaped.
///
/// Retries when interrupted; stops once no terminated child is left or
/// `waitpid` fails for any other reason (usually ECHILD).
pub fn reap_children() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(_) => reaped += 1,
            Err(Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
    reaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_signals() {
        assert!(TERMINATION_SIGNALS.contains(&SIGINT));
        assert!(TERMINATION_SIGNALS.contains(&SIGHUP));
        assert!(TERMINATION_SIGNALS.contains(&SIGTERM));
        assert!(!TERMINATION_SIGNALS.contains(&SIGCHLD));
    }
}
