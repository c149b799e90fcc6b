//! Address decoding for the two Wishbone buses that reach the register devices.
//!
//! The target (LPC I/O) bus is byte addressed with 8-bit data. It reaches the BT target window
//! and the target side of the virtual UART. Anything else falls through to an error responder:
//! one cycle after a request starts, if neither device acknowledged, the bus signals `err`. The
//! same window applies to mapped devices, so every target access must complete in one cycle.
//!
//! The BMC bus is word addressed with 32-bit data; each register occupies one word with byte
//! registers in the low lane. It reaches the UART's BMC side, the BT BMC window and the firmware
//! window control registers. Unmapped BMC accesses signal `err` the cycle after the request.

use lpc_bus::{WbRequest, WbResponse, WishboneBus};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::ipmi_bt::{IpmiBt, BT_FIFO_DEPTH};
use crate::lpc_ctrl::{LpcCtrl, LPC_CTRL_DEFAULT_BASE, LPC_CTRL_DEFAULT_MASK};
use crate::vuart::{VUartJoined, VUART_FIFO_DEPTH};

/// Size of each device window on the target bus, in bytes.
pub const TARGET_IPMI_SPAN: u32 = 4;
pub const TARGET_VUART_SPAN: u32 = 8;
/// Size of each device window on the BMC bus, in words.
pub const BMC_WINDOW_WORDS: u32 = 8;

/// Device placement and sizing. BMC addresses are byte addresses and must be word aligned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoSpaceConfig {
    pub bt_depth: usize,
    pub vuart_depth: usize,
    pub bmc_vuart_addr: u32,
    pub bmc_ipmi_addr: u32,
    pub bmc_lpc_ctrl_addr: u32,
    pub target_vuart_addr: u16,
    pub target_ipmi_addr: u16,
    pub lpc_ctrl_base: u32,
    pub lpc_ctrl_mask: u32,
}

impl Default for IoSpaceConfig {
    fn default() -> Self {
        Self {
            bt_depth: BT_FIFO_DEPTH,
            vuart_depth: VUART_FIFO_DEPTH,
            bmc_vuart_addr: 0x0,
            bmc_ipmi_addr: 0x1000,
            bmc_lpc_ctrl_addr: 0x2000,
            target_vuart_addr: 0x3f8,
            target_ipmi_addr: 0xe4,
            lpc_ctrl_base: LPC_CTRL_DEFAULT_BASE,
            lpc_ctrl_mask: LPC_CTRL_DEFAULT_MASK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetSlot {
    IpmiBt(u32),
    VUart(u32),
    Unmapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BmcSlot {
    VUart(u32),
    IpmiBt(u32),
    LpcCtrl(u32),
    Unmapped,
}

fn window(adr: u32, base: u32, span: u32) -> Option<u32> {
    adr.checked_sub(base).filter(|offset| *offset < span)
}

#[derive(Debug, Clone)]
pub struct IoSpace {
    config: IoSpaceConfig,
    ipmi_bt: IpmiBt,
    vuart: VUartJoined,
    lpc_ctrl: LpcCtrl,
    ack_expected: bool,
    bmc_err: bool,
}

impl Default for IoSpace {
    fn default() -> Self {
        Self::new(IoSpaceConfig::default())
    }
}

impl IoSpace {
    pub fn new(config: IoSpaceConfig) -> Self {
        Self {
            ipmi_bt: IpmiBt::new(config.bt_depth),
            vuart: VUartJoined::new(config.vuart_depth),
            lpc_ctrl: LpcCtrl::new(config.lpc_ctrl_base, config.lpc_ctrl_mask),
            config,
            ack_expected: false,
            bmc_err: false,
        }
    }

    pub fn config(&self) -> &IoSpaceConfig {
        &self.config
    }

    pub fn ipmi_bt(&self) -> &IpmiBt {
        &self.ipmi_bt
    }

    pub fn vuart(&self) -> &VUartJoined {
        &self.vuart
    }

    pub fn lpc_ctrl(&self) -> &LpcCtrl {
        &self.lpc_ctrl
    }

    pub fn bmc_vuart_irq(&self) -> bool {
        self.vuart.irq_a()
    }

    pub fn bmc_ipmi_irq(&self) -> bool {
        self.ipmi_bt.bmc_irq()
    }

    pub fn target_vuart_irq(&self) -> bool {
        self.vuart.irq_b()
    }

    pub fn target_ipmi_irq(&self) -> bool {
        self.ipmi_bt.target_irq()
    }

    fn decode_target(&self, adr: u32) -> TargetSlot {
        let adr = adr & 0xffff;
        if let Some(offset) = window(adr, self.config.target_ipmi_addr.into(), TARGET_IPMI_SPAN) {
            TargetSlot::IpmiBt(offset)
        } else if let Some(offset) =
            window(adr, self.config.target_vuart_addr.into(), TARGET_VUART_SPAN)
        {
            TargetSlot::VUart(offset)
        } else {
            TargetSlot::Unmapped
        }
    }

    fn decode_bmc(&self, adr: u32) -> BmcSlot {
        let words = |base: u32| window(adr, base >> 2, BMC_WINDOW_WORDS);
        if let Some(offset) = words(self.config.bmc_vuart_addr) {
            BmcSlot::VUart(offset)
        } else if let Some(offset) = words(self.config.bmc_ipmi_addr) {
            BmcSlot::IpmiBt(offset)
        } else if let Some(offset) = words(self.config.bmc_lpc_ctrl_addr) {
            BmcSlot::LpcCtrl(offset)
        } else {
            BmcSlot::Unmapped
        }
    }

    /// Target-bus slave signals for the current cycle.
    pub fn target_response(&self, req: &WbRequest) -> WbResponse {
        let bt = self.ipmi_bt.target_response();
        let uart = self.vuart.b_response();
        let mut rsp = match self.decode_target(req.adr) {
            TargetSlot::IpmiBt(_) => bt,
            TargetSlot::VUart(_) => uart,
            TargetSlot::Unmapped => WbResponse::NONE,
        };
        rsp.dat_r &= 0xff;
        if self.ack_expected && !bt.ack && !uart.ack {
            rsp.err = true;
        }
        rsp
    }

    /// BMC-bus slave signals for the current cycle.
    pub fn bmc_response(&self, req: &WbRequest) -> WbResponse {
        match self.decode_bmc(req.adr) {
            BmcSlot::VUart(_) => self.vuart.a_response(),
            BmcSlot::IpmiBt(_) => self.ipmi_bt.bmc_response(),
            BmcSlot::LpcCtrl(_) => self.lpc_ctrl.response(req),
            BmcSlot::Unmapped => WbResponse {
                err: self.bmc_err,
                ..WbResponse::NONE
            },
        }
    }

    /// One system clock edge with both masters' signals.
    pub fn clock(&mut self, target: &WbRequest, bmc: &WbRequest) {
        let idle = WbRequest::IDLE;
        let (mut bt_target, mut uart_b) = (idle, idle);
        let target_slot = self.decode_target(target.adr);
        match target_slot {
            TargetSlot::IpmiBt(offset) => bt_target = target.with_adr(offset),
            TargetSlot::VUart(offset) => uart_b = target.with_adr(offset),
            TargetSlot::Unmapped => {}
        }

        let (mut bt_bmc, mut uart_a, mut ctrl) = (idle, idle, idle);
        let bmc_slot = self.decode_bmc(bmc.adr);
        match bmc_slot {
            BmcSlot::VUart(offset) => uart_a = bmc.with_adr(offset),
            BmcSlot::IpmiBt(offset) => bt_bmc = bmc.with_adr(offset),
            BmcSlot::LpcCtrl(offset) => ctrl = bmc.with_adr(offset),
            BmcSlot::Unmapped => {}
        }

        if target.is_active() && !self.ack_expected {
            trace!(adr = target.adr, we = target.we, slot = ?target_slot, "target access");
            if target_slot == TargetSlot::Unmapped {
                warn!(adr = target.adr, "target access to unmapped I/O address");
            }
        }
        if bmc.is_active() && bmc_slot == BmcSlot::Unmapped && !self.bmc_err {
            warn!(adr = bmc.adr, "bmc access to unmapped address");
        }

        self.ipmi_bt.clock(&bt_bmc, &bt_target);
        self.vuart.clock(&uart_a, &uart_b);
        self.lpc_ctrl.clock(&ctrl);

        self.ack_expected = target.sel != 0 && target.cyc && !self.ack_expected;
        self.bmc_err = bmc.is_active() && bmc_slot == BmcSlot::Unmapped && !self.bmc_err;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}
