//! Single-clock FIFO with a registered read port.

use std::collections::VecDeque;

/// Synchronous FIFO whose head sits in an output register.
///
/// Timing follows a buffered block-RAM FIFO:
/// - a value written at edge `k` is presented on the read port from the cycle after edge `k + 1`;
/// - the inner store holds `depth - 1` entries and the output register one more, so `depth`
///   values fit in total;
/// - `w_rdy` reflects only the inner store, which means it can briefly drop while the store is
///   full and the output register is about to take an entry.
///
/// Writes presented while `w_rdy` is low are dropped. Reads while empty return `T::default()`
/// and do not disturb the FIFO.
#[derive(Debug, Clone)]
pub struct SyncFifo<T> {
    depth: usize,
    inner: VecDeque<T>,
    out: Option<T>,
}

impl<T: Copy + Default> SyncFifo<T> {
    /// # Panics
    ///
    /// Panics if `depth < 2`.
    pub fn new(depth: usize) -> Self {
        assert!(depth >= 2, "SyncFifo depth must be at least 2 (got {depth})");
        Self {
            depth,
            inner: VecDeque::with_capacity(depth - 1),
            out: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn w_rdy(&self) -> bool {
        self.inner.len() < self.depth - 1
    }

    pub fn r_rdy(&self) -> bool {
        self.out.is_some()
    }

    pub fn r_data(&self) -> T {
        self.out.unwrap_or_default()
    }

    /// Number of entries held, including the one in the output register.
    pub fn level(&self) -> usize {
        self.inner.len() + usize::from(self.out.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.level() == 0
    }

    /// Commit one clock edge.
    ///
    /// `write` is stored if `w_rdy` was high before the edge; `read` consumes the output register
    /// if it was valid. Returns whether the write (if any) was accepted.
    pub fn clock(&mut self, write: Option<T>, read: bool) -> bool {
        let w_rdy = self.w_rdy();
        if self.out.is_none() || read {
            self.out = self.inner.pop_front();
        }
        match write {
            Some(value) if w_rdy => {
                self.inner.push_back(value);
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    pub fn reset(&mut self) {
        self.inner.clear();
        self.out = None;
    }
}
