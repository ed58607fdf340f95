/// # Board
///
/// A board is the atomic broadcast channel of the protocol. Every shareholder
/// reads the same append-only log of envelopes in the same order.
use crate::primitives::{AvssResult, Envelope};
use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// Trait which must be implemented by the broadcast channel. This trait
/// assumes an authenticated channel which delivers entries in the same total
/// order to every reader.
pub trait BroadcastChannel: Send + Sync {
    /// Appends an envelope to the log
    fn broadcast(&self, envelope: Envelope) -> AvssResult<()>;

    /// Returns the number of entries in the log
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the entry at position `index`
    fn get(&self, index: usize) -> Option<Envelope>;

    /// Blocks until the log holds more than `seen` entries, `wake_all` is
    /// called or `timeout` elapses. Returns the length of the log.
    fn wait_for_more(&self, seen: usize, timeout: Duration) -> usize;

    /// Wakes up every reader blocked in `wait_for_more`
    fn wake_all(&self);
}

#[derive(Debug, Default)]
struct Log {
    entries: Vec<Envelope>,
    /// bumped by `wake_all` so that waiters return without new entries
    wakeups: u64,
}

/// An in-process broadcast channel backed by a vector
#[derive(Debug, Default)]
pub struct InMemoryBoard {
    log: Mutex<Log>,
    grown: Condvar,
}

impl InMemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the whole log
    pub fn entries(&self) -> Vec<Envelope> {
        self.lock().entries.clone()
    }

    // the log is append-only so it stays consistent even if a writer panicked
    fn lock(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BroadcastChannel for InMemoryBoard {
    fn broadcast(&self, envelope: Envelope) -> AvssResult<()> {
        self.lock().entries.push(envelope);
        self.grown.notify_all();
        Ok(())
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn get(&self, index: usize) -> Option<Envelope> {
        self.lock().entries.get(index).cloned()
    }

    fn wait_for_more(&self, seen: usize, timeout: Duration) -> usize {
        let log = self.lock();
        let wakeups = log.wakeups;
        let (log, _) = self
            .grown
            .wait_timeout_while(log, timeout, |log| {
                log.entries.len() <= seen && log.wakeups == wakeups
            })
            .unwrap_or_else(PoisonError::into_inner);
        log.entries.len()
    }

    fn wake_all(&self) {
        self.lock().wakeups += 1;
        self.grown.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Instant};

    fn envelope(sender: u32) -> Envelope {
        Envelope {
            sender,
            opcode: 2,
            body: vec![sender as u8],
        }
    }

    #[test]
    fn append_and_read() {
        let board = InMemoryBoard::new();
        assert!(board.is_empty());

        board.broadcast(envelope(1)).unwrap();
        board.broadcast(envelope(2)).unwrap();

        assert_eq!(board.len(), 2);
        assert_eq!(board.get(1), Some(envelope(2)));
        assert_eq!(board.get(2), None);
    }

    #[test]
    fn wait_returns_immediately_with_unseen_entries() {
        let board = InMemoryBoard::new();
        board.broadcast(envelope(0)).unwrap();
        assert_eq!(board.wait_for_more(0, Duration::from_secs(10)), 1);
    }

    #[test]
    fn wait_times_out() {
        let board = InMemoryBoard::new();
        let start = Instant::now();
        assert_eq!(board.wait_for_more(0, Duration::from_millis(20)), 0);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn writers_and_wake_all_unblock_readers() {
        let board = Arc::new(InMemoryBoard::new());

        let reader = {
            let board = board.clone();
            thread::spawn(move || board.wait_for_more(0, Duration::from_secs(30)))
        };
        board.broadcast(envelope(7)).unwrap();
        assert_eq!(reader.join().unwrap(), 1);

        let reader = {
            let board = board.clone();
            thread::spawn(move || board.wait_for_more(1, Duration::from_secs(30)))
        };
        // keep waking until the reader has returned
        while !reader.is_finished() {
            board.wake_all();
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(reader.join().unwrap(), 1);
    }
}
