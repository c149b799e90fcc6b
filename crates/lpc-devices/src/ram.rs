//! Word-addressed RAM slave, used as the DMA target of firmware cycles.

use lpc_bus::{SlavePort, WbRequest, WbResponse, WishboneBus};
use tracing::trace;

use crate::lpc_ctrl::byte_lane_mask;

/// 32-bit memory with byte-lane writes.
///
/// Addresses wrap modulo the memory size, like a memory whose upper address lines are not
/// decoded.
#[derive(Debug, Clone)]
pub struct WishboneRam {
    words: Vec<u32>,
    port: SlavePort,
}

impl WishboneRam {
    /// # Panics
    ///
    /// Panics if `words == 0`.
    pub fn new(words: usize) -> Self {
        Self::from_words(vec![0; words])
    }

    pub fn from_words(words: Vec<u32>) -> Self {
        assert!(!words.is_empty(), "WishboneRam needs at least one word");
        Self {
            words,
            port: SlavePort::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn index(&self, adr: u32) -> usize {
        adr as usize % self.words.len()
    }

    pub fn word(&self, adr: u32) -> u32 {
        self.words[self.index(adr)]
    }

    pub fn set_word(&mut self, adr: u32, value: u32) {
        let idx = self.index(adr);
        self.words[idx] = value;
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl WishboneBus for WishboneRam {
    fn response(&self, _req: &WbRequest) -> WbResponse {
        self.port.response()
    }

    fn clock(&mut self, req: &WbRequest) {
        if !self.port.accepts(req) {
            self.port.settle();
            return;
        }
        let idx = self.index(req.adr);
        if req.we {
            let lanes = byte_lane_mask(req.sel);
            let word = &mut self.words[idx];
            *word = (*word & !lanes) | (req.dat_w & lanes);
            trace!(adr = req.adr, sel = req.sel, value = *word, "ram write");
            self.port.complete();
        } else {
            trace!(adr = req.adr, value = self.words[idx], "ram read");
            self.port.complete_read(self.words[idx]);
        }
    }

    fn reset(&mut self) {
        self.port.reset();
    }
}
