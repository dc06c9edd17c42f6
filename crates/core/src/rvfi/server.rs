//! TCP listener for co-simulation clients.
//!
//! Exactly one client is served: the listener accepts a single connection and is
//! closed before the first command is read.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};

use tracing::{debug, info};

use crate::common::error::{ConfigError, SimError};
use crate::engine::RvfiEngine;
use crate::rvfi::session::Session;
use crate::sim::Simulator;

/// A bound, not yet connected, co-simulation endpoint.
#[derive(Debug)]
pub struct RvfiServer {
    listener: TcpListener,
}

impl RvfiServer {
    /// Binds `127.0.0.1:port`; port 0 picks a free port.
    ///
    /// # Errors
    ///
    /// The I/O error from `bind`, typically an address already in use.
    pub fn bind(port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))?;
        Ok(Self { listener })
    }

    /// Port the listener is bound to.
    ///
    /// # Errors
    ///
    /// The I/O error from querying the local address.
    pub fn port(&self) -> io::Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Waits for the client and closes the listener.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NonBlockingSocket`] if the accepted socket is non-blocking,
    /// or the I/O error from `accept`.
    pub fn accept(self) -> Result<TcpStream, SimError> {
        let (stream, peer) = self.listener.accept()?;
        drop(self.listener);
        let nonblocking = is_nonblocking(&stream)?;
        debug!(target: "rvfi", "socket from {peer}: nonblocking={nonblocking}");
        if nonblocking {
            return Err(ConfigError::NonBlockingSocket.into());
        }
        info!(target: "rvfi", "Connected");
        Ok(stream)
    }
}

/// Serves trace sessions on `stream` until the client disconnects.
///
/// # Errors
///
/// The first protocol or engine failure, which ends the connection.
pub fn serve<E: RvfiEngine>(stream: &TcpStream, sim: &mut Simulator<E>) -> Result<(), SimError> {
    let mut session = Session::new(stream, stream);
    let result = session.serve(sim);
    info!(target: "rvfi", "served {} trace session(s)", session.sessions());
    result
}

#[cfg(unix)]
fn is_nonblocking(stream: &TcpStream) -> io::Result<bool> {
    use std::os::fd::AsRawFd;

    // SAFETY: F_GETFL only reads the flags of a descriptor `stream` keeps open.
    let flags = unsafe { libc::fcntl(stream.as_raw_fd(), libc::F_GETFL) };
    if flags == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(flags & libc::O_NONBLOCK != 0)
}

#[cfg(not(unix))]
fn is_nonblocking(_stream: &TcpStream) -> io::Result<bool> {
    Ok(false)
}
