//! Socket service: listeners plus threaded or forked connection dispatch

pub mod dispatch;
pub mod socket;

pub use dispatch::{
    fork_server, resolve_listener, serve, serve_forked, serve_threaded, thread_server, ServeMode,
    ACCEPT_BACKOFF,
};
pub use crate::paths::tmp_folder;
pub use socket::{ClientConnection, Connection, Listener, ServerSocket};
