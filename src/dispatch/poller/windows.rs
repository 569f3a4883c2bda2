//! Windows platform abstraction layer.
//!
//! This module provides the Windows implementation of the low-level
//! socket primitives required by Nexilis. It mirrors the Unix platform
//! layer and exposes identical function names and semantics.
//!
//! Winsock is initialised once per process before the first socket is
//! created.

use std::io;
use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::sync::Once;

use windows_sys::Win32::Networking::WinSock::{
    AF_INET, AF_INET6, INVALID_SOCKET, SD_BOTH, SD_RECEIVE, SD_SEND, SO_REUSEADDR, SOCK_STREAM,
    SOCKADDR, SOCKADDR_IN, SOCKADDR_IN6, SOCKADDR_STORAGE, SOCKET, SOCKET_ERROR, SOL_SOCKET,
    SOMAXCONN, WSADATA, WSAStartup, accept, bind, closesocket, connect, getpeername, getsockname,
    listen, recv, send, setsockopt, shutdown, socket,
};

/// Raw socket descriptor type on Windows.
pub(crate) type RawFd = std::os::windows::io::RawSocket;

/// Marker stored in a socket handle once its descriptor is closed.
pub(crate) const INVALID_FD: RawFd = u64::MAX;

/// Creates a MAKEWORD value for the Winsock version.
#[inline]
const fn makeword(low: u8, high: u8) -> u16 {
    ((high as u16) << 8) | (low as u16)
}

/// Winsock initialization guard.
static WINSOCK_INIT: Once = Once::new();

/// Initialize Winsock if not already initialized.
pub(crate) fn ensure_winsock() {
    WINSOCK_INIT.call_once(|| unsafe {
        let mut data: WSADATA = mem::zeroed();
        let rc = WSAStartup(makeword(2, 2), &mut data as *mut _);
        assert_eq!(rc, 0, "WSAStartup failed: {}", rc);
    });
}

/// Reads from a socket into the given buffer.
///
/// Returns the number of bytes received, or `-1` on error.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> isize {
    unsafe {
        let rc = recv(fd as SOCKET, buffer.as_mut_ptr(), buffer.len() as i32, 0);
        if rc == SOCKET_ERROR { -1 } else { rc as isize }
    }
}

/// Sends the buffer over a socket.
///
/// Returns the number of bytes sent, or `-1` on error.
pub(crate) fn sys_write(fd: RawFd, buffer: &[u8]) -> isize {
    unsafe {
        let rc = send(fd as SOCKET, buffer.as_ptr(), buffer.len() as i32, 0);
        if rc == SOCKET_ERROR { -1 } else { rc as isize }
    }
}

/// Closes a socket descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe {
        let _ = closesocket(fd as SOCKET);
    }
}

/// Creates a blocking stream socket in the address family of `addr`.
pub(crate) fn sys_socket(addr: &SocketAddr) -> io::Result<RawFd> {
    ensure_winsock();

    let domain = match addr {
        SocketAddr::V4(_) => AF_INET,
        SocketAddr::V6(_) => AF_INET6,
    };

    unsafe {
        let fd = socket(domain as i32, SOCK_STREAM, 0);
        if fd == INVALID_SOCKET {
            return Err(io::Error::last_os_error());
        }
        Ok(fd as RawFd)
    }
}

/// Binds a socket to an address.
pub(crate) fn sys_bind(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);

    unsafe {
        if bind(fd as SOCKET, &storage as *const _ as *const SOCKADDR, len) != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

/// Marks a socket as a listening socket.
pub(crate) fn sys_listen(fd: RawFd) -> io::Result<()> {
    unsafe {
        if listen(fd as SOCKET, SOMAXCONN as i32) != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

/// Accepts a new incoming connection, blocking until one arrives.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<(RawFd, SocketAddr)> {
    unsafe {
        let mut storage: SOCKADDR_STORAGE = mem::zeroed();
        let mut len = mem::size_of::<SOCKADDR_STORAGE>() as i32;

        let client = accept(
            fd as SOCKET,
            &mut storage as *mut _ as *mut SOCKADDR,
            &mut len,
        );
        if client == INVALID_SOCKET {
            return Err(io::Error::last_os_error());
        }

        let addr = sockaddr_storage_to_socketaddr(&storage)?;

        Ok((client as RawFd, addr))
    }
}

/// Returns the local address of a socket.
pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    unsafe {
        let mut storage: SOCKADDR_STORAGE = mem::zeroed();
        let mut len = mem::size_of::<SOCKADDR_STORAGE>() as i32;

        if getsockname(
            fd as SOCKET,
            &mut storage as *mut _ as *mut SOCKADDR,
            &mut len,
        ) != 0
        {
            Err(io::Error::last_os_error())
        } else {
            sockaddr_storage_to_socketaddr(&storage)
        }
    }
}

/// Returns the remote address of a connected socket.
pub(crate) fn sys_peername(fd: RawFd) -> io::Result<SocketAddr> {
    unsafe {
        let mut storage: SOCKADDR_STORAGE = mem::zeroed();
        let mut len = mem::size_of::<SOCKADDR_STORAGE>() as i32;

        if getpeername(
            fd as SOCKET,
            &mut storage as *mut _ as *mut SOCKADDR,
            &mut len,
        ) != 0
        {
            Err(io::Error::last_os_error())
        } else {
            sockaddr_storage_to_socketaddr(&storage)
        }
    }
}

/// Initiates a blocking connection.
pub(crate) fn sys_connect(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);

    unsafe {
        if connect(fd as SOCKET, &storage as *const _ as *const SOCKADDR, len) != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

/// Shuts down a socket.
pub(crate) fn sys_shutdown(fd: RawFd, how: Shutdown) -> io::Result<()> {
    let how = match how {
        Shutdown::Read => SD_RECEIVE,
        Shutdown::Write => SD_SEND,
        Shutdown::Both => SD_BOTH,
    };

    unsafe {
        if shutdown(fd as SOCKET, how) != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

/// Enables `SO_REUSEADDR` on a socket.
pub(crate) fn sys_set_reuseaddr(fd: RawFd) -> io::Result<()> {
    unsafe {
        let yes: i32 = 1;
        if setsockopt(
            fd as SOCKET,
            SOL_SOCKET,
            SO_REUSEADDR,
            &yes as *const _ as *const u8,
            mem::size_of::<i32>() as i32,
        ) != 0
        {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

/// Converts a `SOCKADDR_STORAGE` to a Rust `SocketAddr`.
pub(crate) fn sockaddr_storage_to_socketaddr(storage: &SOCKADDR_STORAGE) -> io::Result<SocketAddr> {
    unsafe {
        match storage.ss_family {
            AF_INET => {
                let sin = &*(storage as *const _ as *const SOCKADDR_IN);
                let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.S_un.S_addr));
                let port = u16::from_be(sin.sin_port);

                Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
            }

            AF_INET6 => {
                let sin6 = &*(storage as *const _ as *const SOCKADDR_IN6);
                let ip = Ipv6Addr::from(sin6.sin6_addr.u.Byte);
                let port = u16::from_be(sin6.sin6_port);

                Ok(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, 0)))
            }

            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "unsupported address family",
            )),
        }
    }
}

/// Converts a `SocketAddr` to a `SOCKADDR_STORAGE`.
pub(crate) fn socketaddr_to_storage(addr: &SocketAddr) -> (SOCKADDR_STORAGE, i32) {
    let mut storage: SOCKADDR_STORAGE = unsafe { mem::zeroed() };

    match addr {
        SocketAddr::V4(v4) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut SOCKADDR_IN) };
            sa.sin_family = AF_INET;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.S_un.S_addr = u32::from(*v4.ip()).to_be();

            (storage, mem::size_of::<SOCKADDR_IN>() as i32)
        }

        SocketAddr::V6(v6) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut SOCKADDR_IN6) };
            sa.sin6_family = AF_INET6;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.u.Byte = v6.ip().octets();
            sa.Anonymous.sin6_scope_id = v6.scope_id();

            (storage, mem::size_of::<SOCKADDR_IN6>() as i32)
        }
    }
}
