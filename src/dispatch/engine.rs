//! Dispatch engine core and lifecycle.
//!
//! The engine owns the two pieces of process-wide state behind read
//! dispatch: the registration set and the single worker thread that
//! drains it. It is started lazily by the first callback registration and
//! torn down by [`shutdown_all`]; after a shutdown, the next registration
//! starts a fresh engine.
//!
//! The worker repeats one cycle: collect up to a batch worth of
//! registered descriptors (resuming where the previous batch stopped),
//! ask the platform which of them are readable, read from those and hand
//! the bytes to the registered callbacks. Transient failures are absorbed
//! so that no cycle is ever fatal.

use super::poller::{BATCH_CAPACITY, Selector, platform};
use super::registry::Registry;
use crate::error::DispatchError;
use crate::net::{ReadCallback, Socket};

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

/// Size of the scratch buffer a readable socket is drained into before
/// its callback runs. Callbacks never see more than this many bytes per
/// invocation.
const READ_BUFFER_SIZE: usize = 1024;

/// Upper bound on one blocking readiness query; also the latency with
/// which the worker observes a shutdown request.
const POLL_TIMEOUT: Duration = Duration::from_millis(25);

/// Pause between cycles so an idle engine does not busy-spin.
const CYCLE_SLEEP: Duration = Duration::from_millis(25);

/// The running engine, if any. Guards lazy start and shutdown; exactly
/// one registry and one worker exist at a time.
static ENGINE: Mutex<Option<Engine>> = Mutex::new(None);

struct Engine {
    registry: Arc<Registry>,
    running: Arc<AtomicBool>,
    worker: thread::JoinHandle<()>,
}

impl Engine {
    /// Spawns the worker thread and returns the running engine.
    fn start() -> io::Result<Self> {
        let registry = Arc::new(Registry::new());
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let registry = Arc::clone(&registry);
            let running = Arc::clone(&running);

            thread::Builder::new()
                .name("nexilis-dispatch".into())
                .spawn(move || run_worker(&registry, &running))?
        };

        debug!("dispatch engine started");

        Ok(Self {
            registry,
            running,
            worker,
        })
    }
}

/// Installs `callback` on `socket` and subscribes it for read dispatch.
///
/// Starts the engine if it is not currently running. Re-registering an
/// already subscribed socket replaces its callback without duplicating
/// the registry entry.
pub(crate) fn register(socket: &Socket, callback: ReadCallback) -> Result<(), DispatchError> {
    if socket.raw_fd() == platform::INVALID_FD {
        return Err(DispatchError::InvalidArgument("socket is closed"));
    }

    let mut slot = ENGINE.lock().unwrap();
    let engine = match slot.take() {
        Some(engine) => engine,
        None => Engine::start()?,
    };

    socket.install_callback(callback);
    engine.registry.add(socket);

    *slot = Some(engine);

    Ok(())
}

/// Clears the callback of `socket` and unsubscribes it, if it was
/// subscribed. No-op otherwise.
///
/// Only future deliveries are stopped; an invocation already in flight
/// on the worker completes.
pub(crate) fn unregister(socket: &Socket) {
    let slot = ENGINE.lock().unwrap();

    if socket.take_callback().is_none() {
        return;
    }

    if let Some(engine) = slot.as_ref() {
        engine.registry.remove(socket);
    }
}

/// Stops the dispatch engine.
///
/// Signals the worker, waits for it to exit (bounded by one poll timeout
/// plus one cycle sleep) and releases the registration set, clearing the
/// callback of every socket that was still subscribed. Idempotent; a
/// subsequent registration restarts the engine from a clean state.
pub fn shutdown_all() {
    let engine = ENGINE.lock().unwrap().take();
    let Some(engine) = engine else {
        return;
    };

    engine.running.store(false, Ordering::Release);

    // A callback may itself request shutdown; in that case the worker
    // cannot be joined from its own thread and exits on the next flag
    // check instead.
    if thread::current().id() != engine.worker.thread().id() {
        let _ = engine.worker.join();
    }

    for socket in engine.registry.take_all() {
        socket.take_callback();
    }

    debug!("dispatch engine stopped");
}

/// The worker loop: batch, query, deliver, sleep, repeat.
fn run_worker(registry: &Registry, running: &AtomicBool) {
    let mut selector = Selector::new();
    let mut fds: Vec<platform::RawFd> = Vec::with_capacity(BATCH_CAPACITY);
    let mut batch: HashMap<platform::RawFd, Socket> = HashMap::with_capacity(BATCH_CAPACITY);
    let mut readable: Vec<platform::RawFd> = Vec::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    while running.load(Ordering::Acquire) {
        fds.clear();
        batch.clear();

        // Collect up to one batch worth of descriptors, resuming where
        // the previous cycle stopped, and keep the descriptor-to-socket
        // mapping from the same traversal.
        registry.begin_pass();
        while fds.len() < BATCH_CAPACITY {
            let Some(socket) = registry.next() else {
                break;
            };

            let fd = socket.raw_fd();
            if fd == platform::INVALID_FD {
                continue;
            }

            if batch.insert(fd, socket).is_none() {
                fds.push(fd);
            }
        }
        registry.end_pass();

        if !fds.is_empty() {
            match selector.readable(&fds, POLL_TIMEOUT, &mut readable) {
                Ok(()) => {
                    for fd in readable.drain(..) {
                        if let Some(socket) = batch.get(&fd) {
                            deliver(socket, &mut buffer);
                        }
                    }
                }
                Err(error) => {
                    // Treated as "nothing readable this cycle".
                    trace!(%error, "readiness query failed");
                }
            }
        }

        thread::sleep(CYCLE_SLEEP);
    }

    trace!("dispatch worker exited");
}

/// Reads once from a readable socket and invokes its callback.
///
/// The callback only ever fires with a non-zero byte count: a zero-byte
/// read marks the peer as gone (observable through
/// [`Socket::is_connected`]) and produces no delivery, and read errors
/// are absorbed the same way.
fn deliver(socket: &Socket, buffer: &mut [u8]) {
    let Some(callback) = socket.read_callback() else {
        return;
    };

    match socket.read(buffer) {
        Ok(0) => socket.mark_disconnected(),
        Ok(count) => callback(&buffer[..count]),
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => {}
        Err(error) => {
            trace!(%error, "read failed during dispatch");
            socket.mark_disconnected();
        }
    }
}
