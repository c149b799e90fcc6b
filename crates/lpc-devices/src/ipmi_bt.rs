//! IPMI Block Transfer (BT) interface.
//!
//! A mailbox between the BMC and the target (the LPC host). Each side has its own byte-wide
//! register window on its own Wishbone port; both windows share one clock. Messages flow through
//! two byte FIFOs, one per direction, and the two sides hand messages back and forth with the
//! attention and busy flags in `BT_CTRL`.
//!
//! Target window (byte offsets on the LPC I/O bus):
//!
//! | offset | read | write |
//! |---|---|---|
//! | 0 | `BT_CTRL` | `BT_CTRL` command |
//! | 1 | pop BMC→target FIFO | push target→BMC FIFO |
//! | 2 | `BT_INTMASK` (`enable`, `pending`) | bit0 enable, bit1 clears pending |
//!
//! BMC window (word offsets): 0 `IRQ_MASK`, 1 `IRQ_STATUS`, 4 `BT_CTRL`, 5 data.

use bitflags::bitflags;
use lpc_bus::{SlavePort, SyncFifo, WbRequest, WbResponse};
use tracing::{debug, trace, warn};

pub const BT_FIFO_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TargetReg {
    BtCtrl = 0,
    Data = 1,
    IntMask = 2,
}

impl TargetReg {
    pub fn from_offset(offset: u32) -> Option<Self> {
        match offset {
            0 => Some(Self::BtCtrl),
            1 => Some(Self::Data),
            2 => Some(Self::IntMask),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BmcReg {
    IrqMask = 0,
    IrqStatus = 1,
    BtCtrl = 4,
    Data = 5,
}

impl BmcReg {
    pub fn from_offset(offset: u32) -> Option<Self> {
        match offset {
            0 => Some(Self::IrqMask),
            1 => Some(Self::IrqStatus),
            4 => Some(Self::BtCtrl),
            5 => Some(Self::Data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtSide {
    Target,
    Bmc,
}

bitflags! {
    /// Command bits of a `BT_CTRL` write.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct CtrlWrite: u8 {
        /// Clear the FIFO the writing side pushes into.
        const CLR_WR_PTR = 1 << 0;
        const CLR_RD_PTR = 1 << 1;
        const TARGET_TO_BMC_ATTN = 1 << 2;
        const BMC_TO_TARGET_ATTN = 1 << 3;
        const SMS_ATTN = 1 << 4;
        const PLATFORM_RESERVED = 1 << 5;
        const TARGET_BUSY = 1 << 6;
        const BMC_BUSY = 1 << 7;
    }
}

bitflags! {
    /// BMC interrupt sources, as laid out in `IRQ_MASK` and `IRQ_STATUS`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct BmcIrq: u8 {
        /// The target raised `target_to_bmc_attn`.
        const TARGET_TO_BMC_ATTN = 1 << 0;
        /// The target dropped `target_busy`.
        const TARGET_NOT_BUSY = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlFlag {
    TargetToBmcAttn,
    BmcToTargetAttn,
    SmsAttn,
    PlatformReserved,
    TargetBusy,
    BmcBusy,
}

/// What a `BT_CTRL` write of a flag's bit does, depending on the writing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagAccess {
    Set,
    Clear,
    Toggle,
    Ignored,
}

impl CtrlFlag {
    pub const ALL: [CtrlFlag; 6] = [
        CtrlFlag::TargetToBmcAttn,
        CtrlFlag::BmcToTargetAttn,
        CtrlFlag::SmsAttn,
        CtrlFlag::PlatformReserved,
        CtrlFlag::TargetBusy,
        CtrlFlag::BmcBusy,
    ];

    pub fn bit(self) -> CtrlWrite {
        match self {
            Self::TargetToBmcAttn => CtrlWrite::TARGET_TO_BMC_ATTN,
            Self::BmcToTargetAttn => CtrlWrite::BMC_TO_TARGET_ATTN,
            Self::SmsAttn => CtrlWrite::SMS_ATTN,
            Self::PlatformReserved => CtrlWrite::PLATFORM_RESERVED,
            Self::TargetBusy => CtrlWrite::TARGET_BUSY,
            Self::BmcBusy => CtrlWrite::BMC_BUSY,
        }
    }

    /// Ownership table for control flags.
    pub fn access(self, side: BtSide) -> FlagAccess {
        use BtSide::{Bmc, Target};
        match (self, side) {
            (Self::TargetToBmcAttn, Target) => FlagAccess::Set,
            (Self::TargetToBmcAttn, Bmc) => FlagAccess::Clear,
            (Self::BmcToTargetAttn | Self::SmsAttn, Target) => FlagAccess::Clear,
            (Self::BmcToTargetAttn | Self::SmsAttn, Bmc) => FlagAccess::Set,
            (Self::PlatformReserved, Target) => FlagAccess::Set,
            (Self::PlatformReserved, Bmc) => FlagAccess::Clear,
            (Self::TargetBusy, Target) | (Self::BmcBusy, Bmc) => FlagAccess::Toggle,
            (Self::TargetBusy, Bmc) | (Self::BmcBusy, Target) => FlagAccess::Ignored,
        }
    }
}

/// The shared `BT_CTRL` flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BtCtrl {
    pub target_to_bmc_attn: bool,
    pub bmc_to_target_attn: bool,
    pub sms_attn: bool,
    pub platform_reserved: bool,
    pub target_busy: bool,
    pub bmc_busy: bool,
}

impl BtCtrl {
    pub fn get(&self, flag: CtrlFlag) -> bool {
        match flag {
            CtrlFlag::TargetToBmcAttn => self.target_to_bmc_attn,
            CtrlFlag::BmcToTargetAttn => self.bmc_to_target_attn,
            CtrlFlag::SmsAttn => self.sms_attn,
            CtrlFlag::PlatformReserved => self.platform_reserved,
            CtrlFlag::TargetBusy => self.target_busy,
            CtrlFlag::BmcBusy => self.bmc_busy,
        }
    }

    pub fn set(&mut self, flag: CtrlFlag, value: bool) {
        let slot = match flag {
            CtrlFlag::TargetToBmcAttn => &mut self.target_to_bmc_attn,
            CtrlFlag::BmcToTargetAttn => &mut self.bmc_to_target_attn,
            CtrlFlag::SmsAttn => &mut self.sms_attn,
            CtrlFlag::PlatformReserved => &mut self.platform_reserved,
            CtrlFlag::TargetBusy => &mut self.target_busy,
            CtrlFlag::BmcBusy => &mut self.bmc_busy,
        };
        *slot = value;
    }

    /// Register encoding; bits 0 and 1 read as zero.
    pub fn to_byte(self) -> u8 {
        CtrlFlag::ALL
            .into_iter()
            .filter(|flag| self.get(*flag))
            .fold(CtrlWrite::empty(), |acc, flag| acc | flag.bit())
            .bits()
    }
}

/// Registered state other than the FIFOs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BtRegs {
    ctrl: BtCtrl,
    target_irq_en: bool,
    target_irq: bool,
    bmc_irq_en: BmcIrq,
    bmc_irq: BmcIrq,
}

impl BtRegs {
    /// Apply one side's `BT_CTRL` command. Conditions are evaluated on `old`; results land in
    /// `self`.
    fn apply_ctrl(&mut self, old: &BtRegs, side: BtSide, cmd: CtrlWrite) {
        for flag in CtrlFlag::ALL {
            if !cmd.contains(flag.bit()) {
                continue;
            }
            match flag.access(side) {
                FlagAccess::Set => {
                    self.ctrl.set(flag, true);
                    self.raise_on_set(old, flag);
                }
                FlagAccess::Clear => self.ctrl.set(flag, false),
                FlagAccess::Toggle => {
                    let was = old.ctrl.get(flag);
                    self.ctrl.set(flag, !was);
                    if was && flag == CtrlFlag::TargetBusy {
                        self.raise_bmc(old, BmcIrq::TARGET_NOT_BUSY);
                    }
                }
                FlagAccess::Ignored => {}
            }
        }
    }

    fn raise_on_set(&mut self, old: &BtRegs, flag: CtrlFlag) {
        match flag {
            CtrlFlag::TargetToBmcAttn => self.raise_bmc(old, BmcIrq::TARGET_TO_BMC_ATTN),
            CtrlFlag::BmcToTargetAttn | CtrlFlag::SmsAttn => {
                if old.target_irq_en {
                    self.target_irq = true;
                }
            }
            _ => {}
        }
    }

    fn raise_bmc(&mut self, old: &BtRegs, source: BmcIrq) {
        if old.bmc_irq_en.contains(source) {
            self.bmc_irq |= source;
        }
    }
}

#[derive(Debug, Clone)]
pub struct IpmiBt {
    regs: BtRegs,
    target_to_bmc: SyncFifo<u8>,
    bmc_to_target: SyncFifo<u8>,
    /// FIFO reset pulses scheduled for the next edge.
    clear_target_to_bmc: bool,
    clear_bmc_to_target: bool,
    target_port: SlavePort,
    bmc_port: SlavePort,
}

impl Default for IpmiBt {
    fn default() -> Self {
        Self::new(BT_FIFO_DEPTH)
    }
}

impl IpmiBt {
    pub fn new(depth: usize) -> Self {
        Self {
            regs: BtRegs::default(),
            target_to_bmc: SyncFifo::new(depth),
            bmc_to_target: SyncFifo::new(depth),
            clear_target_to_bmc: false,
            clear_bmc_to_target: false,
            target_port: SlavePort::new(),
            bmc_port: SlavePort::new(),
        }
    }

    pub fn ctrl(&self) -> BtCtrl {
        self.regs.ctrl
    }

    pub fn target_response(&self) -> WbResponse {
        self.target_port.response()
    }

    pub fn bmc_response(&self) -> WbResponse {
        self.bmc_port.response()
    }

    pub fn target_irq(&self) -> bool {
        self.regs.target_irq_en && self.regs.target_irq
    }

    pub fn bmc_irq(&self) -> bool {
        !(self.regs.bmc_irq_en & self.regs.bmc_irq).is_empty()
    }

    /// Bytes queued toward the BMC.
    pub fn target_to_bmc_level(&self) -> usize {
        self.target_to_bmc.level()
    }

    pub fn bmc_to_target_level(&self) -> usize {
        self.bmc_to_target.level()
    }

    /// One clock edge. `bmc` and `target` carry local register offsets in `adr`.
    pub fn clock(&mut self, bmc: &WbRequest, target: &WbRequest) {
        let old = self.regs;
        let mut next = old;
        let mut target_push = None;
        let mut target_pop = false;
        let mut bmc_push = None;
        let mut bmc_pop = false;
        let mut clear_target_to_bmc = false;
        let mut clear_bmc_to_target = false;

        if self.target_port.accepts(target) {
            let reg = TargetReg::from_offset(target.adr);
            if target.we {
                let value = target.dat_w as u8;
                trace!(?reg, value, "bt target write");
                match reg {
                    Some(TargetReg::BtCtrl) => {
                        let cmd = CtrlWrite::from_bits_retain(value);
                        clear_target_to_bmc = cmd.contains(CtrlWrite::CLR_WR_PTR);
                        next.apply_ctrl(&old, BtSide::Target, cmd);
                    }
                    Some(TargetReg::Data) => target_push = Some(value),
                    Some(TargetReg::IntMask) => {
                        next.target_irq_en = value & 0b01 != 0;
                        if value & 0b10 != 0 {
                            next.target_irq = false;
                        }
                    }
                    None => {}
                }
                self.target_port.complete();
            } else {
                let value = match reg {
                    Some(TargetReg::BtCtrl) => Some(old.ctrl.to_byte()),
                    Some(TargetReg::Data) => {
                        target_pop = self.bmc_to_target.r_rdy();
                        Some(self.bmc_to_target.r_data())
                    }
                    Some(TargetReg::IntMask) => {
                        Some(u8::from(old.target_irq_en) | (u8::from(old.target_irq) << 1))
                    }
                    None => None,
                };
                trace!(?reg, ?value, "bt target read");
                self.target_port.complete_read(value.map_or(0, u32::from));
            }
        } else {
            self.target_port.settle();
        }

        // The BMC window is applied second so it wins when both sides touch the same state.
        if self.bmc_port.accepts(bmc) {
            let reg = BmcReg::from_offset(bmc.adr);
            if bmc.we {
                let value = bmc.dat_w as u8;
                trace!(?reg, value, "bt bmc write");
                match reg {
                    Some(BmcReg::IrqMask) => next.bmc_irq_en = BmcIrq::from_bits_truncate(value),
                    Some(BmcReg::IrqStatus) => next.bmc_irq = BmcIrq::from_bits_truncate(value),
                    Some(BmcReg::BtCtrl) => {
                        let cmd = CtrlWrite::from_bits_retain(value);
                        clear_bmc_to_target = cmd.contains(CtrlWrite::CLR_WR_PTR);
                        next.apply_ctrl(&old, BtSide::Bmc, cmd);
                    }
                    Some(BmcReg::Data) => bmc_push = Some(value),
                    None => {}
                }
                self.bmc_port.complete();
            } else {
                let value = match reg {
                    Some(BmcReg::IrqMask) => Some(old.bmc_irq_en.bits()),
                    Some(BmcReg::IrqStatus) => Some(old.bmc_irq.bits()),
                    Some(BmcReg::BtCtrl) => Some(old.ctrl.to_byte()),
                    Some(BmcReg::Data) => {
                        bmc_pop = self.target_to_bmc.r_rdy();
                        Some(self.target_to_bmc.r_data())
                    }
                    None => None,
                };
                trace!(?reg, ?value, "bt bmc read");
                self.bmc_port.complete_read(value.map_or(0, u32::from));
            }
        } else {
            self.bmc_port.settle();
        }

        if self.clear_target_to_bmc {
            debug!("bt target->bmc fifo cleared");
            self.target_to_bmc.reset();
        } else if !self.target_to_bmc.clock(target_push, bmc_pop) {
            warn!("bt target->bmc fifo full, byte dropped");
        }
        if self.clear_bmc_to_target {
            debug!("bt bmc->target fifo cleared");
            self.bmc_to_target.reset();
        } else if !self.bmc_to_target.clock(bmc_push, target_pop) {
            warn!("bt bmc->target fifo full, byte dropped");
        }

        self.clear_target_to_bmc = clear_target_to_bmc;
        self.clear_bmc_to_target = clear_bmc_to_target;
        self.regs = next;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.target_to_bmc.depth());
    }
}
