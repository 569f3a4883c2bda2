//! Windows `WSAPoll`-based readiness backend.
//!
//! Mirrors the Unix `poll(2)` backend over Winsock: one call per cycle,
//! level-triggered, bounded by the batch the engine hands in. Winsock is
//! initialised once per process before the first query.

use super::BATCH_CAPACITY;
use super::platform::{RawFd, ensure_winsock};

use std::io;
use std::time::Duration;

use windows_sys::Win32::Networking::WinSock::{
    POLLERR, POLLHUP, POLLIN, SOCKET, SOCKET_ERROR, WSAPOLLFD, WSAPoll,
};

pub(crate) struct WsaPollSelector {
    /// Reusable buffer handed to `WSAPoll`.
    fds: Vec<WSAPOLLFD>,
}

impl WsaPollSelector {
    pub(crate) fn new() -> Self {
        ensure_winsock();

        Self {
            fds: Vec::with_capacity(BATCH_CAPACITY),
        }
    }

    /// Queries readability for `batch` and appends the readable
    /// descriptors to `readable`.
    ///
    /// Blocks until at least one socket is ready or the timeout expires.
    pub(crate) fn readable(
        &mut self,
        batch: &[RawFd],
        timeout: Duration,
        readable: &mut Vec<RawFd>,
    ) -> io::Result<()> {
        readable.clear();
        self.fds.clear();

        for &fd in batch {
            self.fds.push(WSAPOLLFD {
                fd: fd as SOCKET,
                events: POLLIN,
                revents: 0,
            });
        }

        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

        let rc = unsafe { WSAPoll(self.fds.as_mut_ptr(), self.fds.len() as u32, timeout_ms) };

        if rc == SOCKET_ERROR {
            return Err(io::Error::last_os_error());
        }

        if rc == 0 {
            return Ok(());
        }

        for pfd in &self.fds {
            if pfd.revents as i32 & (POLLIN | POLLERR | POLLHUP) as i32 != 0 {
                readable.push(pfd.fd as RawFd);
            }
        }

        Ok(())
    }
}
