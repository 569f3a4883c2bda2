use crate::dispatch;
use crate::dispatch::poller::platform;
use crate::dispatch::poller::platform::RawFd;
use crate::error::DispatchError;

use std::io;
use std::mem;
use std::net::{Ipv4Addr, Shutdown, SocketAddr, ToSocketAddrs};
use std::sync::{Arc, Mutex};

/// A read callback, invoked by the dispatch worker with freshly read
/// bytes. State travels inside the closure.
pub(crate) type ReadCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// A blocking TCP socket.
///
/// `Socket` is a cloneable handle over shared connection state: the raw
/// descriptor, a connected flag, the last observed OS error and the
/// optionally registered read callback. Clones refer to the same
/// connection; the read-dispatch registry holds such a clone while a
/// callback is registered.
///
/// All I/O calls block. For push-style delivery, register a callback
/// with [`set_read_callback`](Self::set_read_callback) instead of
/// calling [`read`](Self::read) in a loop.
#[derive(Clone)]
pub struct Socket {
    shared: Arc<Mutex<SocketState>>,
}

struct SocketState {
    /// The underlying descriptor; `INVALID_FD` once closed.
    fd: RawFd,

    /// True from successful connect/listen/accept until close, or until
    /// the dispatch worker observes the peer going away.
    connected: bool,

    /// Last observed raw OS error code. Informational, never cleared.
    last_error: i32,

    /// Registered read callback, present iff the socket is subscribed
    /// for dispatch.
    callback: Option<ReadCallback>,
}

impl Socket {
    pub(crate) fn from_fd(fd: RawFd, connected: bool) -> Self {
        Self {
            shared: Arc::new(Mutex::new(SocketState {
                fd,
                connected,
                last_error: 0,
                callback: None,
            })),
        }
    }

    /// Establishes a TCP connection to `host:port`.
    ///
    /// `host` may be an IP address or a name; names are resolved and
    /// every candidate address is tried in order until one connects.
    pub fn connect(host: &str, port: u16) -> io::Result<Self> {
        let mut last_error = None;

        for addr in (host, port).to_socket_addrs()? {
            let fd = match platform::sys_socket(&addr) {
                Ok(fd) => fd,
                Err(error) => {
                    last_error = Some(error);
                    continue;
                }
            };

            match platform::sys_connect(fd, &addr) {
                Ok(()) => return Ok(Self::from_fd(fd, true)),
                Err(error) => {
                    platform::sys_close(fd);
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "host resolved to no addresses")
        }))
    }

    /// Creates a listening socket on all IPv4 interfaces.
    ///
    /// Port `0` asks the OS for an ephemeral port; use
    /// [`local_addr`](Self::local_addr) to discover it.
    pub fn listen(port: u16) -> io::Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let fd = platform::sys_socket(&addr)?;

        let configured = platform::sys_set_reuseaddr(fd)
            .and_then(|()| platform::sys_bind(fd, &addr))
            .and_then(|()| platform::sys_listen(fd));

        if let Err(error) = configured {
            platform::sys_close(fd);
            return Err(error);
        }

        Ok(Self::from_fd(fd, true))
    }

    /// Accepts an incoming connection, blocking until one arrives.
    ///
    /// Returns the connected socket and the peer address.
    pub fn accept(&self) -> io::Result<(Socket, SocketAddr)> {
        let fd = self.require_fd()?;

        match platform::sys_accept(fd) {
            Ok((client, addr)) => Ok((Self::from_fd(client, true), addr)),
            Err(error) => {
                self.record_error(&error);
                Err(error)
            }
        }
    }

    /// Reads up to `buffer.len()` bytes, blocking until data arrives.
    ///
    /// `Ok(0)` means the peer has shut down its half of the connection.
    pub fn read(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let fd = self.require_fd()?;

        let received = platform::sys_read(fd, buffer);
        if received < 0 {
            let error = io::Error::last_os_error();
            self.record_error(&error);
            return Err(error);
        }

        Ok(received as usize)
    }

    /// Writes the entire buffer to the socket.
    ///
    /// # Errors
    ///
    /// Returns `WriteZero` if the OS reports progress of zero before the
    /// buffer is fully sent.
    pub fn write(&self, buffer: &[u8]) -> io::Result<()> {
        let fd = self.require_fd()?;

        let mut remaining = buffer;
        while !remaining.is_empty() {
            let sent = platform::sys_write(fd, remaining);

            match sent {
                1.. => remaining = &remaining[sent as usize..],
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "write returned zero bytes",
                    ));
                }
                _ => {
                    let error = io::Error::last_os_error();
                    self.record_error(&error);
                    return Err(error);
                }
            }
        }

        Ok(())
    }

    /// Disconnects and closes the socket.
    ///
    /// Any registered read callback is unregistered first, so a closed
    /// socket is never left subscribed for dispatch. Idempotent; every
    /// clone of this handle observes the closed state.
    pub fn close(&self) {
        dispatch::unregister(self);

        let fd = {
            let mut state = self.shared.lock().unwrap();
            state.connected = false;
            mem::replace(&mut state.fd, platform::INVALID_FD)
        };

        if fd != platform::INVALID_FD {
            let _ = platform::sys_shutdown(fd, Shutdown::Both);
            platform::sys_close(fd);
        }
    }

    /// Registers `callback` to be invoked whenever data arrives.
    ///
    /// Starts the dispatch engine if it is not already running. The
    /// callback runs on the shared dispatch thread; the slice it
    /// receives is only valid for the duration of the invocation.
    /// Re-registering replaces the previous callback without duplicating
    /// the subscription.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidArgument`] if the socket is closed.
    pub fn set_read_callback<F>(&self, callback: F) -> Result<(), DispatchError>
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        dispatch::register(self, Arc::new(callback))
    }

    /// Unregisters the read callback, if any.
    ///
    /// Stops future deliveries only; an invocation already in flight on
    /// the dispatch thread completes.
    pub fn clear_read_callback(&self) {
        dispatch::unregister(self);
    }

    /// Whether the connection is believed to be up.
    ///
    /// Cleared by [`close`](Self::close), and by the dispatch worker
    /// when a read observes an orderly peer shutdown or a hard error.
    pub fn is_connected(&self) -> bool {
        self.shared.lock().unwrap().connected
    }

    /// The last raw OS error observed on this socket, if any.
    pub fn last_error(&self) -> Option<i32> {
        let code = self.shared.lock().unwrap().last_error;
        (code != 0).then_some(code)
    }

    /// Returns the local address of the socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        platform::sys_sockname(self.require_fd()?)
    }

    /// Returns the address of the connected peer.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        platform::sys_peername(self.require_fd()?)
    }

    /// Two handles are the same socket iff they share state.
    pub(crate) fn is_same(&self, other: &Socket) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// The raw descriptor, or `INVALID_FD` once closed.
    pub(crate) fn raw_fd(&self) -> RawFd {
        self.shared.lock().unwrap().fd
    }

    pub(crate) fn install_callback(&self, callback: ReadCallback) {
        self.shared.lock().unwrap().callback = Some(callback);
    }

    pub(crate) fn take_callback(&self) -> Option<ReadCallback> {
        self.shared.lock().unwrap().callback.take()
    }

    pub(crate) fn read_callback(&self) -> Option<ReadCallback> {
        self.shared.lock().unwrap().callback.clone()
    }

    pub(crate) fn mark_disconnected(&self) {
        self.shared.lock().unwrap().connected = false;
    }

    fn record_error(&self, error: &io::Error) {
        if let Some(code) = error.raw_os_error() {
            self.shared.lock().unwrap().last_error = code;
        }
    }

    fn require_fd(&self) -> io::Result<RawFd> {
        let fd = self.shared.lock().unwrap().fd;
        if fd == platform::INVALID_FD {
            Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "socket is closed",
            ))
        } else {
            Ok(fd)
        }
    }
}

impl Drop for Socket {
    /// Drops the handle.
    ///
    /// The descriptor is closed when the last handle to the shared state
    /// is dropped without an explicit [`close`](Self::close).
    fn drop(&mut self) {
        if Arc::strong_count(&self.shared) == 1 {
            let state = self.shared.lock().unwrap();
            if state.fd != platform::INVALID_FD {
                platform::sys_close(state.fd);
            }
        }
    }
}
