use std::io;

use thiserror::Error;

/// Errors reported by the read-dispatch engine.
///
/// Transient I/O failures inside the poller loop are absorbed and never
/// surface through this type; only synchronous registration problems do.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A registration argument was unusable, e.g. the socket was already
    /// closed.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Starting the engine failed at the OS level (worker thread creation).
    #[error(transparent)]
    Io(#[from] io::Error),
}
