//! Firmware window control.
//!
//! LPC firmware cycles address a 28-bit space. Before they reach system memory they are confined
//! to a window: the word address is masked and then offset by a base, both programmable from the
//! BMC. Base and mask are byte quantities; the low two bits are dropped when applied to word
//! addresses.
//!
//! | word | register |
//! |---|---|
//! | 0 | `base_lo` |
//! | 1 | `base_hi` (stored, unused) |
//! | 2 | `mask_lo` |
//! | 3 | `mask_hi` (stored, unused) |

use lpc_bus::{SlavePort, WbRequest, WbResponse, WishboneBus};
use tracing::debug;

pub const LPC_CTRL_DEFAULT_BASE: u32 = 192 * 1024 * 1024;
pub const LPC_CTRL_DEFAULT_MASK: u32 = 0x03ff_ffff;

/// Word addresses on the DMA bus are 30 bits wide.
pub const DMA_ADDR_MASK: u32 = 0x3fff_ffff;

#[derive(Debug, Clone)]
pub struct LpcCtrl {
    base_lo: u32,
    base_hi: u32,
    mask_lo: u32,
    mask_hi: u32,
    port: SlavePort,
}

impl Default for LpcCtrl {
    fn default() -> Self {
        Self::new(LPC_CTRL_DEFAULT_BASE, LPC_CTRL_DEFAULT_MASK)
    }
}

impl LpcCtrl {
    pub fn new(base: u32, mask: u32) -> Self {
        Self {
            base_lo: base,
            base_hi: 0,
            mask_lo: mask,
            mask_hi: 0,
            port: SlavePort::new(),
        }
    }

    pub fn base(&self) -> u32 {
        self.base_lo
    }

    pub fn mask(&self) -> u32 {
        self.mask_lo
    }

    /// Map a firmware-bus request onto the DMA bus.
    pub fn translate(&self, req: &WbRequest) -> WbRequest {
        let adr = ((req.adr & (self.mask_lo >> 2)) | (self.base_lo >> 2)) & DMA_ADDR_MASK;
        req.with_adr(adr)
    }

    fn register(&mut self, offset: u32) -> Option<&mut u32> {
        match offset {
            0 => Some(&mut self.base_lo),
            1 => Some(&mut self.base_hi),
            2 => Some(&mut self.mask_lo),
            3 => Some(&mut self.mask_hi),
            _ => None,
        }
    }
}

impl WishboneBus for LpcCtrl {
    fn response(&self, _req: &WbRequest) -> WbResponse {
        self.port.response()
    }

    fn clock(&mut self, req: &WbRequest) {
        if !self.port.accepts(req) {
            self.port.settle();
            return;
        }
        if req.we {
            if let Some(reg) = self.register(req.adr) {
                let lanes = byte_lane_mask(req.sel);
                *reg = (*reg & !lanes) | (req.dat_w & lanes);
                debug!(offset = req.adr, value = *reg, "lpc ctrl write");
            }
            self.port.complete();
        } else {
            let value = self.register(req.adr).map_or(0, |reg| *reg);
            self.port.complete_read(value);
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Expand a 4-bit byte select into a 32-bit mask.
pub fn byte_lane_mask(sel: u8) -> u32 {
    (0..4u32)
        .filter(|lane| sel & (1 << lane) != 0)
        .fold(0, |mask, lane| mask | (0xff << (8 * lane)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_64mib_at_192mib() {
        let ctrl = LpcCtrl::default();
        let req = WbRequest::read(0, 0xf);
        assert_eq!(ctrl.translate(&req).adr, 0x0300_0000);
        let req = WbRequest::read(0x0123_4567 >> 2, 0xf);
        assert_eq!(ctrl.translate(&req).adr, (0x0c00_0000 | 0x0123_4564) >> 2);
    }

    #[test]
    fn registers_read_back_after_one_cycle() {
        let mut ctrl = LpcCtrl::default();
        let write = WbRequest::write(2, 0x000f_ffff, 0xf);
        ctrl.clock(&write);
        assert!(ctrl.response(&write).ack);
        ctrl.clock(&write);
        assert_eq!(ctrl.mask(), 0x000f_ffff);

        let read = WbRequest::read(1, 0xf);
        ctrl.clock(&read);
        assert_eq!(ctrl.response(&read), WbResponse::ack(0));
    }

    #[test]
    fn partial_write_honours_byte_select() {
        let mut ctrl = LpcCtrl::new(0x1122_3344, 0);
        ctrl.clock(&WbRequest::write(0, 0xaabb_ccdd, 0b0101));
        assert_eq!(ctrl.base(), 0x11bb_33dd);
    }

    #[test]
    fn translate_keeps_other_signals() {
        let ctrl = LpcCtrl::new(0x1000, 0xfff);
        let req = WbRequest::write(0x7ff, 0xdead_beef, 0b0011);
        let out = ctrl.translate(&req);
        assert_eq!(out.adr, 0x3ff | 0x400);
        assert_eq!((out.dat_w, out.sel, out.we), (0xdead_beef, 0b0011, true));
    }
}
