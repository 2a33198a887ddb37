// Exit status of forked connection handlers, and an inactive fork server

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use svcboot::server::{fork_server, ClientConnection, Connection, Listener, ServerSocket};
use svcboot::ProcessState;

/// Replies with its pid, then returns whatever the request asks for
fn verdict(conn: &mut ClientConnection) -> anyhow::Result<i32> {
    let mut request = String::new();
    conn.read_to_string(&mut request)?;
    conn.write_all(std::process::id().to_string().as_bytes())?;
    conn.flush()?;

    match request.as_str() {
        "fail" => anyhow::bail!("asked to fail"),
        code => Ok(code.parse()?),
    }
}

fn request(addr: SocketAddr, body: &str) -> Pid {
    let mut client = TcpStream::connect(addr).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    client.write_all(body.as_bytes()).unwrap();
    client.shutdown(Shutdown::Write).unwrap();

    let mut reply = String::new();
    client.read_to_string(&mut reply).unwrap();
    Pid::from_raw(reply.parse().unwrap())
}

#[test]
fn test_child_exit_status_follows_handler() {
    let listener = ServerSocket::bind_tcp(0, "127.0.0.1").unwrap();
    let addr = listener.tcp_addr().unwrap();

    let state = ProcessState::new();
    state.activate();
    let server_state = state.clone();
    let server = thread::spawn(move || fork_server(listener, &server_state, verdict));

    let ok_child = request(addr, "42");
    assert_eq!(waitpid(ok_child, None).unwrap(), WaitStatus::Exited(ok_child, 42));

    let zero_child = request(addr, "0");
    assert_eq!(waitpid(zero_child, None).unwrap(), WaitStatus::Exited(zero_child, 0));

    let failed_child = request(addr, "fail");
    assert_eq!(
        waitpid(failed_child, None).unwrap(),
        WaitStatus::Exited(failed_child, 1)
    );

    state.deactivate();
    assert_eq!(server.join().unwrap(), 0);
}

struct NeverConn;

impl Connection for NeverConn {
    fn close(self) {}
    fn release(self) {}
}

#[derive(Default)]
struct InertListener {
    accepts: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl Listener for InertListener {
    type Conn = NeverConn;

    fn accept(&mut self) -> io::Result<Option<NeverConn>> {
        self.accepts.fetch_add(1, Ordering::SeqCst);
        Ok(Some(NeverConn))
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.released.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_inactive_fork_server_accepts_nothing() {
    let listener = InertListener::default();
    let accepts = Arc::clone(&listener.accepts);
    let closed = Arc::clone(&listener.closed);
    let released = Arc::clone(&listener.released);

    let state = ProcessState::new();
    let code = fork_server(listener, &state, |_: &mut NeverConn| Ok(0));

    assert_eq!(code, 0);
    assert_eq!(accepts.load(Ordering::SeqCst), 0);
    assert!(closed.load(Ordering::SeqCst));
    assert!(!released.load(Ordering::SeqCst));
}
