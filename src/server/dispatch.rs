//! Accept loop and the two connection dispatch models
//!
//! One thread runs the accept loop per listener. Each accepted connection is
//! moved to exactly one handler: a detached thread (`thread_server`) or a
//! forked child process (`fork_server`). The loop ends once the activation
//! flag drops or the listener stops being connected, and closes the
//! listener on the way out.

use super::socket::{ClientConnection, Connection, Listener, ServerSocket};
use crate::error::SocketError;
use crate::lifecycle;
use crate::options::OptionSchema;
use crate::paths::tmp_folder;
use crate::process::ProcessState;
use nix::unistd::{fork, ForkResult};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause between accept attempts when nothing is pending
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Pause after a failed accept
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Which dispatch model `serve` uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// One detached thread per connection
    Threaded,
    /// One child process per connection
    Forked,
}

impl ServeMode {
    fn label(self) -> &'static str {
        match self {
            ServeMode::Threaded => "threaded",
            ServeMode::Forked => "forked",
        }
    }
}

/// Run the accept loop, passing every accepted connection to `dispatch`.
///
/// `dispatch` also gets the listener so a forked child can release it.
fn accept_loop<L, F>(listener: &mut L, state: &ProcessState, mut dispatch: F)
where
    L: Listener,
    F: FnMut(&mut L, L::Conn),
{
    while state.is_active() && listener.is_connected() {
        match listener.accept() {
            Ok(Some(conn)) => dispatch(listener, conn),
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                thread::sleep(ACCEPT_ERROR_BACKOFF);
            }
        }
    }
    listener.close();
}

/// Owns a connection for the duration of one handler call and closes it
/// exactly once when dropped, even if the handler panics.
struct ConnectionJob<C: Connection> {
    conn: Option<C>,
}

impl<C: Connection> ConnectionJob<C> {
    fn new(conn: C) -> Self {
        Self { conn: Some(conn) }
    }

    fn run<H>(mut self, handler: &H) -> i32
    where
        H: Fn(&mut C) -> anyhow::Result<i32>,
    {
        match self.conn.as_mut() {
            Some(conn) => exit_code(handler(conn)),
            None => 0,
        }
    }
}

impl<C: Connection> Drop for ConnectionJob<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close();
        }
    }
}

fn exit_code(result: anyhow::Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("handler failed: {:#}", e);
            1
        }
    }
}

/// Serve `listener` with one detached thread per connection. Returns 0.
///
/// Each worker calls `handler` and then closes its connection. Workers are
/// never joined; the return code of `handler` is only logged.
pub fn thread_server<L, H>(mut listener: L, state: &ProcessState, handler: H) -> i32
where
    L: Listener,
    H: Fn(&mut L::Conn) -> anyhow::Result<i32> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let mut spawned: u64 = 0;

    accept_loop(&mut listener, state, |_, conn| {
        spawned += 1;
        let handler = Arc::clone(&handler);
        let job = ConnectionJob::new(conn);

        let result = thread::Builder::new()
            .name(format!("conn-{}", spawned))
            .spawn(move || {
                tracing::trace!("connection thread started");
                let code = job.run(&*handler);
                tracing::trace!(code, "connection thread ended");
            });

        // A failed spawn drops the closure and with it the job, which closes the connection
        match result {
            Ok(_) => tracing::debug!(worker = spawned, "spawned new thread for connection"),
            Err(e) => tracing::error!(error = %e, "failed to spawn connection thread"),
        }
    });

    0
}

/// Serve `listener` with one forked child process per connection.
///
/// The child releases the listener, runs `handler`, closes the connection
/// and exits with the handler's return code (1 if it failed). The parent
/// releases its copy of the connection and keeps accepting. Returns 0 in
/// the parent once the loop ends; never returns in a child.
pub fn fork_server<L, H>(mut listener: L, state: &ProcessState, mut handler: H) -> i32
where
    L: Listener,
    H: FnMut(&mut L::Conn) -> anyhow::Result<i32>,
{
    accept_loop(&mut listener, state, |listener, mut conn| {
        // The child only touches its own connection before exiting
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                listener.release();
                let code = exit_code(handler(&mut conn));
                conn.close();
                std::process::exit(code);
            }
            Ok(ForkResult::Parent { child }) => {
                tracing::debug!(pid = child.as_raw(), "forked new process for connection");
                conn.release();
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fork connection handler");
                conn.close();
            }
        }
    });

    0
}

/// Open the listener described by `schema`.
///
/// A `socket` option names a Unix socket inside [`tmp_folder`]. Otherwise
/// `listen_port` and `listen_interface` together select a TCP listener.
pub fn resolve_listener(schema: &mut OptionSchema) -> Result<ServerSocket, SocketError> {
    if schema.contains("socket") {
        let name = schema.get_string("socket");
        return ServerSocket::bind_unix(tmp_folder().join(name));
    }

    if schema.contains("listen_port") && schema.contains("listen_interface") {
        let port = schema.get_integer("listen_port");
        let interface = schema.get_string("listen_interface");
        return ServerSocket::bind_tcp(port, &interface);
    }

    Err(SocketError::NotConfigured)
}

/// Open the configured listener, activate the process and serve it in `mode`.
///
/// Returns 1 without activating when no listener could be opened.
pub fn serve<H>(schema: &mut OptionSchema, state: &ProcessState, mode: ServeMode, handler: H) -> i32
where
    H: Fn(&mut ClientConnection) -> anyhow::Result<i32> + Send + Sync + 'static,
{
    let listener = match resolve_listener(schema) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failure to open socket");
            return 1;
        }
    };

    let cmd = schema.get_string("cmd");
    tracing::info!("Activating {} server: {}", mode.label(), cmd);
    lifecycle::activate(schema, state);

    match mode {
        ServeMode::Threaded => thread_server(listener, state, handler),
        ServeMode::Forked => fork_server(listener, state, handler),
    }
}

/// [`serve`] with one thread per connection
pub fn serve_threaded<H>(schema: &mut OptionSchema, state: &ProcessState, handler: H) -> i32
where
    H: Fn(&mut ClientConnection) -> anyhow::Result<i32> + Send + Sync + 'static,
{
    serve(schema, state, ServeMode::Threaded, handler)
}

/// [`serve`] with one child process per connection
pub fn serve_forked<H>(schema: &mut OptionSchema, state: &ProcessState, handler: H) -> i32
where
    H: Fn(&mut ClientConnection) -> anyhow::Result<i32> + Send + Sync + 'static,
{
    serve(schema, state, ServeMode::Forked, handler)
}
