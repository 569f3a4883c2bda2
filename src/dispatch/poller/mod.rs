//! Platform-specific readiness-query abstraction.
//!
//! The dispatch worker needs exactly one primitive from the operating
//! system: "given a batch of descriptors and a timeout, which of them are
//! readable right now?". This module provides that primitive behind a
//! single [`Selector`] type so the batching algorithm in the engine is
//! written once.
//!
//! The concrete implementation is selected at compile time:
//! - `poll(2)` on Unix targets,
//! - `WSAPoll` on Windows.
//!
//! The platform syscall layer (socket creation, connect, accept, read,
//! write, address conversions) lives next to the backends and is
//! re-exported as [`platform`].

#[cfg(unix)]
mod posix;

#[cfg(windows)]
mod wsapoll;

#[cfg(unix)]
pub(crate) type Selector = posix::PollSelector;

#[cfg(windows)]
pub(crate) type Selector = wsapoll::WsaPollSelector;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;

#[cfg(windows)]
pub(crate) mod windows;

#[cfg(windows)]
pub(crate) use windows as platform;

/// Upper bound on the number of descriptors examined by one readiness
/// query.
///
/// Registration sets larger than this are covered across successive
/// cycles by the registry's resumable cursor.
pub(crate) const BATCH_CAPACITY: usize = 1024;
