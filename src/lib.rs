//! # Nexilis
//!
//! **Nexilis** is a compact TCP networking layer for the **Nebula** ecosystem:
//! blocking socket primitives plus a background read-dispatch engine.
//!
//! Unlike a full async runtime, Nexilis keeps the threading model minimal.
//! Application code talks to sockets with ordinary blocking calls; when it
//! wants push-style delivery instead, it registers a read callback and a
//! single shared poller thread multiplexes readiness across every registered
//! socket and invokes the callbacks with freshly read bytes.
//!
//! Nexilis offers:
//!
//! - **Blocking TCP primitives** — connect (with name resolution), listen,
//!   accept, read, write, close
//! - **A read-dispatch engine** — one background poller for any number of
//!   sockets, started lazily on first registration
//! - **Bounded readiness batches** — large registration sets are queried in
//!   fixed-size slices with a resumable cursor, so every socket is reached
//!   within a bounded number of cycles
//! - **Deterministic shutdown** — [`shutdown_all`] stops the poller and
//!   returns once it has exited, and the engine restarts cleanly afterwards
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nexilis::Socket;
//!
//! fn main() -> std::io::Result<()> {
//!     let socket = Socket::connect("127.0.0.1", 4000)?;
//!
//!     socket.set_read_callback(|data| {
//!         println!("received {} bytes", data.len());
//!     }).expect("register callback");
//!
//!     socket.write(b"hello")?;
//!
//!     // ... later
//!     socket.close();
//!     nexilis::shutdown_all();
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`net`] — Blocking TCP socket primitives

mod dispatch;
mod error;

pub mod net;

pub use dispatch::shutdown_all;
pub use error::DispatchError;
pub use net::Socket;
