//! Turning a parsed configuration into a running service process
//!
//! `activate` consumes the `username` and `daemonize` options, installs the
//! signal handlers and raises the activation flag. Failures to change user
//! or to detach are logged and the process carries on as it was.

use crate::error::LifecycleError;
use crate::options::connector::ROOT_USER;
use crate::options::OptionSchema;
use crate::process::ProcessState;
use crate::signal;
use nix::unistd::{setuid, User};

/// Apply the lifecycle options in `schema` and mark `state` active.
pub fn activate(schema: &mut OptionSchema, state: &ProcessState) {
    if schema.contains("username") {
        let username = schema.get_string("username");
        if let Err(e) = set_user(&username) {
            tracing::error!("Error: {}", e);
        }
        schema.remove_option("username");
    }

    if schema.contains("daemonize") && schema.get_bool("daemonize") {
        let keep_output = schema.contains("logfile") && !schema.get_string("logfile").is_empty();
        if let Err(e) = daemonize(keep_output) {
            tracing::error!("{}", e);
        }
        schema.remove_option("daemonize");
    }

    match signal::install(state) {
        Ok(reaping) => tracing::debug!(reaping, "signal handlers installed"),
        Err(e) => tracing::error!(error = %e, "failed to install signal handlers"),
    }

    state.activate();
}

/// Switch the process to `username`. `root` means keep the current user.
pub fn set_user(username: &str) -> Result<(), LifecycleError> {
    if username == ROOT_USER {
        return Ok(());
    }

    let user = match User::from_name(username) {
        Ok(Some(user)) => user,
        Ok(None) | Err(_) => return Err(LifecycleError::UnknownUser(username.to_string())),
    };

    setuid(user.uid).map_err(|source| LifecycleError::SetUid {
        user: username.to_string(),
        source,
    })?;

    tracing::info!("Change user to {}", username);
    Ok(())
}

/// Detach from the controlling terminal, keeping the working directory.
///
/// Standard streams go to /dev/null unless `keep_output` is set.
#[cfg(not(target_vendor = "apple"))]
pub fn daemonize(keep_output: bool) -> Result<(), LifecycleError> {
    tracing::info!("Going into background mode...");
    nix::unistd::daemon(true, keep_output).map_err(LifecycleError::Daemonize)
}

/// Detach from the controlling terminal, keeping the working directory.
#[cfg(target_vendor = "apple")]
pub fn daemonize(_keep_output: bool) -> Result<(), LifecycleError> {
    Err(LifecycleError::Daemonize(nix::Error::ENOSYS))
}
