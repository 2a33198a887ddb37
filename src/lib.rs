// Library interface for svcboot
// Option parsing, process lifecycle and socket dispatch for small network services

pub mod codec;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod options;
pub mod paths;
pub mod process;
pub mod server;
pub mod signal;

pub use error::{ConfigError, LifecycleError, SocketError};
pub use options::{OptionSchema, OptionSpec, OptionValue, ParseOutcome};
pub use process::ProcessState;
pub use server::{ServeMode, ServerSocket};
