// Process-per-connection dispatch

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::Duration;
use svcboot::server::{fork_server, ClientConnection, ServerSocket};
use svcboot::signal::reap_children;
use svcboot::ProcessState;

fn shout(conn: &mut ClientConnection) -> anyhow::Result<i32> {
    let mut data = Vec::new();
    conn.read_to_end(&mut data)?;
    conn.write_all(&data.to_ascii_uppercase())?;
    conn.write_all(format!(" from {}", std::process::id()).as_bytes())?;
    Ok(0)
}

#[test]
fn test_forked_children_handle_connections() {
    let listener = ServerSocket::bind_tcp(0, "127.0.0.1").unwrap();
    let addr = listener.tcp_addr().unwrap();

    let state = ProcessState::new();
    state.activate();
    let server_state = state.clone();
    let server = thread::spawn(move || fork_server(listener, &server_state, shout));

    let parent = std::process::id();
    for _ in 0..2 {
        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(b"quiet").unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut reply = String::new();
        client.read_to_string(&mut reply).unwrap();
        assert!(reply.starts_with("QUIET from "));

        let pid: u32 = reply["QUIET from ".len()..].parse().unwrap();
        assert_ne!(pid, parent);
    }

    state.deactivate();
    assert_eq!(server.join().unwrap(), 0);

    let mut reaped = 0;
    for _ in 0..50 {
        reaped += reap_children();
        if reaped == 2 {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(reaped, 2);
}
