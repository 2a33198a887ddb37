//! Listening endpoints and accepted connections
//!
//! The dispatcher only needs four things from a listener: accept without
//! blocking forever, tell whether it is still usable, close it, and release
//! it without tearing anything down (a forked child does this so the
//! parent keeps serving). Connections likewise can be closed (shutdown
//! then close) or merely released (close our descriptor only).

use crate::error::SocketError;
use std::fs;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

/// An accepted connection handed to exactly one handler
pub trait Connection: Send + 'static {
    /// Shut the connection down and close it
    fn close(self);

    /// Close only our descriptor; other holders of the socket are unaffected
    fn release(self);
}

/// A listening endpoint
pub trait Listener {
    type Conn: Connection;

    /// Accept one pending connection. `Ok(None)` when nothing is pending.
    fn accept(&mut self) -> io::Result<Option<Self::Conn>>;

    /// False once closed or released
    fn is_connected(&self) -> bool;

    /// Stop listening and remove any filesystem entry
    fn close(&mut self);

    /// Drop the endpoint without removing anything the parent still serves
    fn release(&mut self);
}

enum Endpoint {
    Unix(UnixListener, PathBuf),
    Tcp(TcpListener),
}

/// A bound Unix-domain or TCP listener
pub struct ServerSocket {
    endpoint: Option<Endpoint>,
}

impl ServerSocket {
    /// Listen on a Unix socket at `path`, replacing a stale socket file
    pub fn bind_unix(path: impl AsRef<Path>) -> Result<Self, SocketError> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            fs::remove_file(&path).map_err(|source| SocketError::BindUnix {
                path: path.clone(),
                source,
            })?;
        }

        let listener = UnixListener::bind(&path).map_err(|source| SocketError::BindUnix {
            path: path.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;

        tracing::debug!(path = %path.display(), "unix listener bound");
        Ok(Self {
            endpoint: Some(Endpoint::Unix(listener, path)),
        })
    }

    /// Listen on `interface:port`. Port 0 picks a free port.
    pub fn bind_tcp(port: i64, interface: &str) -> Result<Self, SocketError> {
        let port_u16 = u16::try_from(port).map_err(|_| SocketError::InvalidPort(port))?;

        let listener =
            TcpListener::bind((interface, port_u16)).map_err(|source| SocketError::BindTcp {
                interface: interface.to_string(),
                port,
                source,
            })?;
        listener.set_nonblocking(true)?;

        tracing::debug!(interface, port, "tcp listener bound");
        Ok(Self {
            endpoint: Some(Endpoint::Tcp(listener)),
        })
    }

    /// Bound TCP address, if this is a TCP listener
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        match &self.endpoint {
            Some(Endpoint::Tcp(listener)) => listener.local_addr().ok(),
            _ => None,
        }
    }

    /// Socket file path, if this is a Unix listener
    pub fn unix_path(&self) -> Option<&Path> {
        match &self.endpoint {
            Some(Endpoint::Unix(_, path)) => Some(path),
            _ => None,
        }
    }
}

impl Listener for ServerSocket {
    type Conn = ClientConnection;

    fn accept(&mut self) -> io::Result<Option<ClientConnection>> {
        let result = match &self.endpoint {
            None => return Ok(None),
            Some(Endpoint::Unix(listener, _)) => listener
                .accept()
                .map(|(stream, _)| ClientConnection::Unix(stream)),
            Some(Endpoint::Tcp(listener)) => listener
                .accept()
                .map(|(stream, _)| ClientConnection::Tcp(stream)),
        };

        match result {
            Ok(conn) => {
                conn.set_nonblocking(false)?;
                Ok(Some(conn))
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn is_connected(&self) -> bool {
        self.endpoint.is_some()
    }

    fn close(&mut self) {
        if let Some(Endpoint::Unix(listener, path)) = self.endpoint.take() {
            drop(listener);
            let _ = fs::remove_file(&path);
        }
    }

    fn release(&mut self) {
        self.endpoint = None;
    }
}

/// A connection accepted from a [`ServerSocket`]
#[derive(Debug)]
pub enum ClientConnection {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl ClientConnection {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            ClientConnection::Unix(s) => s.set_nonblocking(nonblocking),
            ClientConnection::Tcp(s) => s.set_nonblocking(nonblocking),
        }
    }

    /// Remote address for TCP connections
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match self {
            ClientConnection::Unix(_) => None,
            ClientConnection::Tcp(s) => s.peer_addr().ok(),
        }
    }
}

impl AsRawFd for ClientConnection {
    fn as_raw_fd(&self) -> RawFd {
        match self {
            ClientConnection::Unix(s) => s.as_raw_fd(),
            ClientConnection::Tcp(s) => s.as_raw_fd(),
        }
    }
}

impl Read for ClientConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ClientConnection::Unix(s) => s.read(buf),
            ClientConnection::Tcp(s) => s.read(buf),
        }
    }
}

impl Write for ClientConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ClientConnection::Unix(s) => s.write(buf),
            ClientConnection::Tcp(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ClientConnection::Unix(s) => s.flush(),
            ClientConnection::Tcp(s) => s.flush(),
        }
    }
}

impl Connection for ClientConnection {
    fn close(self) {
        let _ = match &self {
            ClientConnection::Unix(s) => s.shutdown(Shutdown::Both),
            ClientConnection::Tcp(s) => s.shutdown(Shutdown::Both),
        };
    }

    fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn accept_within(listener: &mut ServerSocket, timeout: Duration) -> Option<ClientConnection> {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if let Some(conn) = listener.accept().unwrap() {
                return Some(conn);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_tcp_accept_and_close() {
        let mut listener = ServerSocket::bind_tcp(0, "127.0.0.1").unwrap();
        assert!(listener.is_connected());
        assert!(listener.accept().unwrap().is_none());

        let addr = listener.tcp_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();

        let mut conn = accept_within(&mut listener, Duration::from_secs(2)).unwrap();
        conn.write_all(b"hi").unwrap();
        conn.close();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hi");

        listener.close();
        assert!(!listener.is_connected());
        assert!(listener.accept().unwrap().is_none());
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(
            ServerSocket::bind_tcp(70000, "127.0.0.1"),
            Err(SocketError::InvalidPort(70000))
        ));
    }

    #[test]
    fn test_unix_close_removes_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.sock");

        let mut listener = ServerSocket::bind_unix(&path).unwrap();
        assert!(path.exists());
        assert_eq!(listener.unix_path(), Some(path.as_path()));

        let _client = UnixStream::connect(&path).unwrap();
        assert!(accept_within(&mut listener, Duration::from_secs(2)).is_some());

        listener.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_unix_release_keeps_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.sock");

        let mut listener = ServerSocket::bind_unix(&path).unwrap();
        listener.release();
        assert!(!listener.is_connected());
        assert!(path.exists());
    }

    #[test]
    fn test_unix_bind_replaces_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.sock");
        fs::write(&path, b"").unwrap();

        let listener = ServerSocket::bind_unix(&path).unwrap();
        assert!(listener.is_connected());
    }
}
