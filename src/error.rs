//! Error types for svcboot
//!
//! Option lookups and listener setup report through these; handlers and the
//! binaries use `anyhow` on top of them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status used when code asks for an option that was never registered
pub const EXIT_UNKNOWN_OPTION: i32 = 37;

/// Exit status after `--help` or `--version`
pub const EXIT_HELP: i32 = 1;

/// Errors from the option schema
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The name was never passed to `add_option`
    #[error("a non-existent option '{0}' was accessed")]
    UnknownOption(String),

    /// A JSON option declaration could not be decoded
    #[error("invalid option declaration for '{name}': {reason}")]
    InvalidDeclaration { name: String, reason: String },
}

/// Errors while opening a listening socket
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("failed to bind unix socket {}: {source}", path.display())]
    BindUnix {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {interface}:{port}: {source}")]
    BindTcp {
        interface: String,
        port: i64,
        #[source]
        source: io::Error,
    },

    #[error("invalid listen port {0}")]
    InvalidPort(i64),

    #[error("no listener configured (neither 'socket' nor 'listen_port'/'listen_interface')")]
    NotConfigured,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from privilege dropping and daemonization. Logged, never fatal.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not setuid {0}: no such user")]
    UnknownUser(String),

    #[error("could not setuid {user}: {source}")]
    SetUid {
        user: String,
        #[source]
        source: nix::Error,
    },

    #[error("failed to daemonize: {0}")]
    Daemonize(#[source] nix::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_option_message() {
        let err = ConfigError::UnknownOption("nope".to_string());
        assert_eq!(err.to_string(), "a non-existent option 'nope' was accessed");
    }

    #[test]
    fn test_bind_tcp_message() {
        let err = SocketError::BindTcp {
            interface: "127.0.0.1".to_string(),
            port: 80,
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("127.0.0.1:80"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_ne!(EXIT_UNKNOWN_OPTION, EXIT_HELP);
    }
}
