//! Dual-clock FIFO with synchronizer latency between the two domains.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    /// Read-domain edges left before the entry shows up on the read port.
    visible_in: u8,
}

/// Clock-domain-crossing FIFO.
///
/// Pointers crossing between domains pass through `sync_stages` flip-flops, so:
/// - a written entry becomes readable after `sync_stages` read-domain edges;
/// - a slot freed by a read becomes writable after `sync_stages` write-domain edges.
///
/// Operations happen "at" an edge of their own domain. After performing them, the owner of each
/// domain calls [`Self::clock_write_domain`] / [`Self::clock_read_domain`] exactly once per edge.
#[derive(Debug, Clone)]
pub struct AsyncFifo<T> {
    depth: usize,
    sync_stages: u8,
    entries: VecDeque<Entry<T>>,
    /// Slots released by the reader, counting down write-domain edges until the writer sees them.
    released: VecDeque<u8>,
}

impl<T> AsyncFifo<T> {
    pub const DEFAULT_SYNC_STAGES: u8 = 2;

    /// # Panics
    ///
    /// Panics if `depth == 0`.
    pub fn new(depth: usize, sync_stages: u8) -> Self {
        assert!(depth > 0, "AsyncFifo depth must be non-zero");
        Self {
            depth,
            sync_stages,
            entries: VecDeque::with_capacity(depth),
            released: VecDeque::with_capacity(depth),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn sync_stages(&self) -> u8 {
        self.sync_stages
    }

    /// Write-side view: there is a slot the writer knows to be free.
    pub fn w_rdy(&self) -> bool {
        self.entries.len() + self.released.len() < self.depth
    }

    /// Read-side view: the head entry has crossed into the read domain.
    pub fn r_rdy(&self) -> bool {
        self.entries.front().is_some_and(|e| e.visible_in == 0)
    }

    pub fn peek(&self) -> Option<&T> {
        self.entries
            .front()
            .filter(|e| e.visible_in == 0)
            .map(|e| &e.value)
    }

    /// Returns `false` (and drops `value`) when the writer sees no free slot.
    pub fn write(&mut self, value: T) -> bool {
        if !self.w_rdy() {
            return false;
        }
        self.entries.push_back(Entry {
            value,
            visible_in: self.sync_stages,
        });
        true
    }

    pub fn read(&mut self) -> Option<T> {
        if !self.r_rdy() {
            return None;
        }
        let entry = self.entries.pop_front()?;
        if self.sync_stages > 0 {
            self.released.push_back(self.sync_stages);
        }
        Some(entry.value)
    }

    pub fn clock_write_domain(&mut self) {
        for remaining in self.released.iter_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        while self.released.front() == Some(&0) {
            self.released.pop_front();
        }
    }

    pub fn clock_read_domain(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.visible_in = entry.visible_in.saturating_sub(1);
        }
    }

    /// Number of entries written and not yet read, visible or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.released.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_crosses_after_sync_stages_read_edges() {
        let mut fifo = AsyncFifo::new(2, 2);
        assert!(fifo.write(0xabu32));
        fifo.clock_write_domain();
        assert!(!fifo.r_rdy());
        fifo.clock_read_domain();
        assert!(!fifo.r_rdy());
        fifo.clock_read_domain();
        assert_eq!(fifo.peek(), Some(&0xab));
        assert_eq!(fifo.read(), Some(0xab));
        assert!(fifo.is_empty());
    }

    #[test]
    fn freed_slot_returns_after_write_edges() {
        let mut fifo = AsyncFifo::new(1, 2);
        assert!(fifo.write(1u8));
        assert!(!fifo.w_rdy());
        assert!(!fifo.write(2));
        fifo.clock_read_domain();
        fifo.clock_read_domain();
        assert_eq!(fifo.read(), Some(1));

        assert!(!fifo.w_rdy());
        fifo.clock_write_domain();
        assert!(!fifo.w_rdy());
        fifo.clock_write_domain();
        assert!(fifo.w_rdy());
    }

    #[test]
    fn zero_stages_is_combinational() {
        let mut fifo = AsyncFifo::new(2, 0);
        fifo.write(5u8);
        assert_eq!(fifo.read(), Some(5));
        assert!(fifo.w_rdy());
    }

    #[test]
    fn reset_clears_both_domains() {
        let mut fifo = AsyncFifo::new(2, 2);
        fifo.write(1u8);
        fifo.write(2u8);
        fifo.reset();
        assert!(fifo.w_rdy());
        assert!(fifo.is_empty());
        assert_eq!(fifo.read(), None);
    }

    #[test]
    fn preserves_order() {
        let mut fifo = AsyncFifo::new(2, 1);
        fifo.write(1u8);
        fifo.write(2u8);
        fifo.clock_read_domain();
        assert_eq!(fifo.read(), Some(1));
        assert_eq!(fifo.read(), Some(2));
    }
}
