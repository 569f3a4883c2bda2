//! Read-dispatch engine.
//!
//! This module implements the asynchronous half of the crate:
//! - the registration set of sockets subscribed for read notifications,
//! - the platform readiness-query backends,
//! - the single background worker that batches readiness queries and
//!   delivers freshly read bytes to callbacks.
//!
//! Application code reaches it through [`Socket::set_read_callback`],
//! [`Socket::clear_read_callback`] and [`shutdown_all`]; nothing else is
//! public.
//!
//! [`Socket::set_read_callback`]: crate::net::Socket::set_read_callback
//! [`Socket::clear_read_callback`]: crate::net::Socket::clear_read_callback

mod engine;
mod registry;

pub(crate) mod poller;

pub use engine::shutdown_all;

pub(crate) use engine::{register, unregister};
