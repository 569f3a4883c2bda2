//! Unix `poll(2)`-based readiness backend.
//!
//! One query builds a `pollfd` array from the batch, blocks for at most
//! the given timeout and reports the descriptors that are readable. The
//! `pollfd` buffer is reused across cycles.

use super::BATCH_CAPACITY;
use super::platform::RawFd;

use libc::{POLLERR, POLLHUP, POLLIN, nfds_t, poll, pollfd};
use std::io;
use std::time::Duration;

pub(crate) struct PollSelector {
    /// Reusable buffer handed to `poll(2)`.
    fds: Vec<pollfd>,
}

impl PollSelector {
    pub(crate) fn new() -> Self {
        Self {
            fds: Vec::with_capacity(BATCH_CAPACITY),
        }
    }

    /// Queries readability for `batch` and appends the readable
    /// descriptors to `readable`.
    ///
    /// Blocks until at least one descriptor is ready or the timeout
    /// expires. An interrupted call (`EINTR`) is reported as "nothing
    /// readable" rather than an error.
    pub(crate) fn readable(
        &mut self,
        batch: &[RawFd],
        timeout: Duration,
        readable: &mut Vec<RawFd>,
    ) -> io::Result<()> {
        readable.clear();
        self.fds.clear();

        for &fd in batch {
            self.fds.push(pollfd {
                fd,
                events: POLLIN,
                revents: 0,
            });
        }

        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

        let rc = unsafe { poll(self.fds.as_mut_ptr(), self.fds.len() as nfds_t, timeout_ms) };

        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        if rc == 0 {
            return Ok(());
        }

        // POLLERR/POLLHUP count as readable so a broken or half-closed
        // peer is noticed through the read path instead of lingering.
        for pfd in &self.fds {
            if pfd.revents & (POLLIN | POLLERR | POLLHUP) != 0 {
                readable.push(pfd.fd);
            }
        }

        Ok(())
    }
}
