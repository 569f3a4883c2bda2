//! Registration set for read-dispatched sockets.
//!
//! The registry is an insertion-ordered collection of the sockets
//! currently subscribed for read notifications, shared between the
//! application threads (add/remove) and the dispatch worker (iteration).
//!
//! Iteration is *resumable*: a single cursor survives across passes, so
//! when the set is larger than one readiness batch, successive batches
//! walk successive slices of the set instead of always re-querying the
//! head. The cursor wraps at the tail.
//!
//! Every operation takes the internal lock for its own duration only; a
//! long pass never starves concurrent registration or removal from other
//! threads.

use crate::net::Socket;

use std::sync::Mutex;

pub(crate) struct Registry {
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    /// Registered sockets, in insertion order.
    entries: Vec<Socket>,

    /// Index of the next entry a pass will yield. Persists across passes.
    cursor: usize,

    /// Entries left to yield in the currently open pass.
    pass_remaining: usize,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                entries: Vec::new(),
                cursor: 0,
                pass_remaining: 0,
            }),
        }
    }

    /// Appends `socket` at the tail unless it is already present.
    ///
    /// Returns `false` if the socket was already registered.
    pub(crate) fn add(&self, socket: &Socket) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if inner.entries.iter().any(|entry| entry.is_same(socket)) {
            return false;
        }

        inner.entries.push(socket.clone());
        true
    }

    /// Removes the entry matching `socket` by identity, if present.
    ///
    /// The cursor is adjusted so that an in-progress pass neither skips an
    /// unrelated entry nor revisits a removed one.
    pub(crate) fn remove(&self, socket: &Socket) -> bool {
        let mut inner = self.inner.lock().unwrap();

        let Some(index) = inner
            .entries
            .iter()
            .position(|entry| entry.is_same(socket))
        else {
            return false;
        };

        // Shrink the open pass only if the removed entry had not been
        // yielded yet; entries not yet visited sit in the window of
        // `pass_remaining` slots starting at the cursor.
        let len = inner.entries.len();
        let offset = (index + len - inner.cursor) % len;
        if offset < inner.pass_remaining {
            inner.pass_remaining -= 1;
        }

        inner.entries.remove(index);

        if index < inner.cursor {
            inner.cursor -= 1;
        }
        if inner.cursor >= inner.entries.len() {
            inner.cursor = 0;
        }

        true
    }

    /// Opens a pass over the set.
    ///
    /// A pass yields each entry at most once, starting where the previous
    /// pass stopped. Only one pass is ever open at a time (the dispatch
    /// worker is the sole iterator).
    pub(crate) fn begin_pass(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.pass_remaining = inner.entries.len();
    }

    /// Yields the next socket of the open pass, or `None` once the pass
    /// has covered the whole set.
    pub(crate) fn next(&self) -> Option<Socket> {
        let mut inner = self.inner.lock().unwrap();

        if inner.pass_remaining == 0 || inner.entries.is_empty() {
            return None;
        }

        if inner.cursor >= inner.entries.len() {
            inner.cursor = 0;
        }

        let socket = inner.entries[inner.cursor].clone();
        inner.cursor = (inner.cursor + 1) % inner.entries.len();
        inner.pass_remaining -= 1;

        Some(socket)
    }

    /// Closes the pass early, releasing its remaining budget.
    pub(crate) fn end_pass(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.pass_remaining = 0;
    }

    /// Empties the registry and returns the sockets it held.
    pub(crate) fn take_all(&self) -> Vec<Socket> {
        let mut inner = self.inner.lock().unwrap();
        inner.cursor = 0;
        inner.pass_remaining = 0;

        std::mem::take(&mut inner.entries)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::poller::platform::INVALID_FD;

    fn detached() -> Socket {
        Socket::from_fd(INVALID_FD, false)
    }

    /// Drains one pass, bounded by `limit` entries per batch.
    fn batch(registry: &Registry, limit: usize) -> Vec<Socket> {
        let mut out = Vec::new();
        registry.begin_pass();
        while out.len() < limit {
            match registry.next() {
                Some(socket) => out.push(socket),
                None => break,
            }
        }
        registry.end_pass();
        out
    }

    #[test]
    fn add_is_idempotent() {
        let registry = Registry::new();
        let socket = detached();

        assert!(registry.add(&socket));
        assert!(!registry.add(&socket));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clones_share_identity() {
        let registry = Registry::new();
        let socket = detached();
        let alias = socket.clone();

        assert!(registry.add(&socket));
        assert!(!registry.add(&alias));
        assert!(registry.remove(&alias));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let registry = Registry::new();
        let socket = detached();

        assert!(!registry.remove(&socket));
    }

    #[test]
    fn pass_yields_in_insertion_order() {
        let registry = Registry::new();
        let sockets: Vec<Socket> = (0..3).map(|_| detached()).collect();
        for socket in &sockets {
            registry.add(socket);
        }

        let yielded = batch(&registry, usize::MAX);
        assert_eq!(yielded.len(), 3);
        for (expected, got) in sockets.iter().zip(&yielded) {
            assert!(expected.is_same(got));
        }
    }

    #[test]
    fn pass_visits_each_entry_once() {
        let registry = Registry::new();
        for _ in 0..4 {
            registry.add(&detached());
        }

        registry.begin_pass();
        let mut count = 0;
        while registry.next().is_some() {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn cursor_resumes_across_bounded_batches() {
        let registry = Registry::new();
        let sockets: Vec<Socket> = (0..5).map(|_| detached()).collect();
        for socket in &sockets {
            registry.add(socket);
        }

        // Batches of two: 0-1, 2-3, then 4 wrapping into 0.
        let first = batch(&registry, 2);
        let second = batch(&registry, 2);
        let third = batch(&registry, 2);

        assert!(first[0].is_same(&sockets[0]) && first[1].is_same(&sockets[1]));
        assert!(second[0].is_same(&sockets[2]) && second[1].is_same(&sockets[3]));
        assert!(third[0].is_same(&sockets[4]) && third[1].is_same(&sockets[0]));
    }

    #[test]
    fn every_entry_lands_in_a_batch_within_bounded_cycles() {
        let registry = Registry::new();
        let sockets: Vec<Socket> = (0..10).map(|_| detached()).collect();
        for socket in &sockets {
            registry.add(socket);
        }

        // With batches of 4 over 10 entries, three cycles must reach all.
        let mut seen = vec![false; sockets.len()];
        for _ in 0..3 {
            for yielded in batch(&registry, 4) {
                let index = sockets.iter().position(|s| s.is_same(&yielded)).unwrap();
                seen[index] = true;
            }
        }
        assert!(seen.iter().all(|&hit| hit));
    }

    #[test]
    fn removing_before_cursor_does_not_skip() {
        let registry = Registry::new();
        let sockets: Vec<Socket> = (0..3).map(|_| detached()).collect();
        for socket in &sockets {
            registry.add(socket);
        }

        registry.begin_pass();
        let first = registry.next().unwrap();
        assert!(first.is_same(&sockets[0]));

        registry.remove(&sockets[0]);

        let second = registry.next().unwrap();
        let third = registry.next();
        assert!(second.is_same(&sockets[1]));
        assert!(third.unwrap().is_same(&sockets[2]));
        assert!(registry.next().is_none());
    }

    #[test]
    fn removing_entry_under_cursor_advances_to_next() {
        let registry = Registry::new();
        let sockets: Vec<Socket> = (0..3).map(|_| detached()).collect();
        for socket in &sockets {
            registry.add(socket);
        }

        registry.begin_pass();
        let first = registry.next().unwrap();
        assert!(first.is_same(&sockets[0]));

        // The cursor now points at entry 1; removing it must neither
        // crash nor skip entry 2.
        registry.remove(&sockets[1]);

        let second = registry.next();
        assert!(second.unwrap().is_same(&sockets[2]));
        assert!(registry.next().is_none());
    }

    #[test]
    fn removing_last_entry_wraps_cursor() {
        let registry = Registry::new();
        let sockets: Vec<Socket> = (0..2).map(|_| detached()).collect();
        for socket in &sockets {
            registry.add(socket);
        }

        registry.begin_pass();
        registry.next();
        registry.remove(&sockets[1]);

        registry.begin_pass();
        let yielded = registry.next().unwrap();
        assert!(yielded.is_same(&sockets[0]));
    }

    #[test]
    fn append_during_pass_is_tolerated() {
        let registry = Registry::new();
        let sockets: Vec<Socket> = (0..2).map(|_| detached()).collect();
        for socket in &sockets {
            registry.add(socket);
        }

        registry.begin_pass();
        registry.next();

        let late = detached();
        registry.add(&late);

        // The open pass stays bounded by the size it started with.
        let mut rest = 0;
        while registry.next().is_some() {
            rest += 1;
        }
        assert_eq!(rest, 1);

        // The appended entry is reachable on the following pass.
        let mut found = false;
        registry.begin_pass();
        while let Some(socket) = registry.next() {
            found |= socket.is_same(&late);
        }
        assert!(found);
    }

    #[test]
    fn take_all_resets_the_registry() {
        let registry = Registry::new();
        for _ in 0..3 {
            registry.add(&detached());
        }

        assert_eq!(registry.take_all().len(), 3);
        assert_eq!(registry.len(), 0);
        registry.begin_pass();
        assert!(registry.next().is_none());
    }
}
