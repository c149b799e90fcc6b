//! LPC protocol state machine.
//!
//! Decodes target I/O read/write cycles and firmware memory read/write cycles one `LCLK` at a
//! time. Each decoded transaction becomes a [`WriteCommand`] for the system side; the matching
//! [`ReadResponse`] is awaited with long-wait SYNC and then reported as READY (with data for
//! reads) or ERROR.
//!
//! LFRAME# and LRESET# override whatever the machine was doing, so any transaction can be
//! aborted at any cycle.

use tracing::{debug, trace};

use crate::command::{Operation, ReadResponse, TransferSize, WriteCommand};
use crate::protocol::{
    shift_in_address, CYCTYPE_IO_READ, CYCTYPE_IO_WRITE, CYCTYPE_MASK, IO_ADDR_MASK,
    IO_ADDR_NIBBLES, FW_ADDR_NIBBLES, LAD_IDLE, LAD_MASK, START_FW_READ, START_FW_WRITE,
    START_TARGET, SYNC_ERROR, SYNC_LONG_WAIT, SYNC_READY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LpcState {
    #[default]
    Start,
    CycleType,
    IoAddr,
    FwIdSel,
    FwAddr,
    FwMSize,
    RdTar1,
    RdSync,
    RdData,
    WrData,
    WrTar1,
    WrSync,
    Tar2,
}

/// Host-driven pin levels sampled on one `LCLK` edge.
///
/// `lframe` and `lreset` are the *asserted* state of the active-low LFRAME# and LRESET# pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LpcPins {
    pub lad: u8,
    pub lframe: bool,
    pub lreset: bool,
}

impl LpcPins {
    pub const IDLE: Self = Self {
        lad: LAD_IDLE,
        lframe: false,
        lreset: false,
    };

    /// A START cycle (LFRAME# asserted) carrying `lad`.
    pub fn frame(lad: u8) -> Self {
        Self {
            lad,
            lframe: true,
            lreset: false,
        }
    }

    pub fn data(lad: u8) -> Self {
        Self {
            lad,
            lframe: false,
            lreset: false,
        }
    }

    pub fn reset() -> Self {
        Self {
            lreset: true,
            ..Self::IDLE
        }
    }
}

impl Default for LpcPins {
    fn default() -> Self {
        Self::IDLE
    }
}

/// What the target drives onto LAD during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LadDrive {
    pub lad: u8,
    pub enabled: bool,
}

impl LadDrive {
    pub const RELEASED: Self = Self {
        lad: 0,
        enabled: false,
    };

    pub fn driven(lad: u8) -> Self {
        Self {
            lad: lad & LAD_MASK,
            enabled: true,
        }
    }
}

/// Everything the front end produces during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrontCycle {
    pub drive: LadDrive,
    /// Enqueue this command toward the system side.
    pub command: Option<WriteCommand>,
    /// Pop the head of the response queue (used both to consume a response and to drain stale
    /// ones while the address is shifting in).
    pub pop_response: bool,
    /// Both queues must be cleared; holds while LFRAME# is asserted and for one cycle after.
    pub reset_queues: bool,
}

#[derive(Debug, Clone)]
pub struct LpcFront {
    state: LpcState,
    op: Operation,
    count: u8,
    addr: u32,
    data: u32,
    size: TransferSize,
    /// LFRAME# asserted on the previous cycle.
    lframe_prev: bool,
}

impl Default for LpcFront {
    fn default() -> Self {
        Self::new()
    }
}

impl LpcFront {
    pub fn new() -> Self {
        Self {
            state: LpcState::Start,
            op: Operation::IoRead,
            count: 0,
            addr: 0,
            data: 0,
            size: TransferSize::One,
            // The synchronizer flop powers up low, i.e. "asserted".
            lframe_prev: true,
        }
    }

    pub fn state(&self) -> LpcState {
        self.state
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn command(&self) -> WriteCommand {
        let addr = if self.op.is_io() {
            self.addr & IO_ADDR_MASK
        } else {
            self.addr
        };
        WriteCommand {
            op: self.op,
            addr,
            data: if self.op.is_write() { self.data } else { 0 },
            size: self.size,
        }
    }

    /// Evaluate one `LCLK` cycle.
    ///
    /// `response` is the head of the response queue as visible in the LPC domain, if any.
    /// Outputs are computed from the state before the edge; the registered state then advances.
    pub fn clock(&mut self, pins: LpcPins, response: Option<ReadResponse>) -> FrontCycle {
        let lad = pins.lad & LAD_MASK;
        let mut out = FrontCycle::default();
        let mut next = self.state;

        match self.state {
            LpcState::Start => {}
            LpcState::CycleType => {
                self.count = IO_ADDR_NIBBLES - 1;
                next = match lad & CYCTYPE_MASK {
                    CYCTYPE_IO_READ => {
                        self.op = Operation::IoRead;
                        LpcState::IoAddr
                    }
                    CYCTYPE_IO_WRITE => {
                        self.op = Operation::IoWrite;
                        LpcState::IoAddr
                    }
                    other => {
                        debug!(cyctype = other, "unsupported cycle type");
                        LpcState::Start
                    }
                };
            }
            LpcState::IoAddr => {
                self.addr = shift_in_address(self.addr, lad);
                out.pop_response = true;
                if self.count == 0 {
                    self.size = TransferSize::One;
                    self.count = 1;
                    next = if self.op == Operation::IoRead {
                        LpcState::RdTar1
                    } else {
                        LpcState::WrData
                    };
                } else {
                    self.count -= 1;
                }
            }
            LpcState::FwIdSel => {
                self.count = FW_ADDR_NIBBLES - 1;
                next = LpcState::FwAddr;
            }
            LpcState::FwAddr => {
                self.addr = shift_in_address(self.addr, lad);
                out.pop_response = true;
                if self.count == 0 {
                    next = LpcState::FwMSize;
                } else {
                    self.count -= 1;
                }
            }
            LpcState::FwMSize => match TransferSize::from_msize(lad) {
                Some(size) => {
                    self.size = size;
                    if self.op == Operation::FwRead {
                        self.count = 1;
                        next = LpcState::RdTar1;
                    } else {
                        self.count = size.nibbles() - 1;
                        next = LpcState::WrData;
                    }
                }
                None => {
                    debug!(msize = lad, "unsupported firmware transfer size");
                    next = LpcState::Start;
                }
            },
            LpcState::RdTar1 => {
                if self.count == 1 {
                    out.command = Some(self.command());
                }
                if self.count == 0 {
                    next = LpcState::RdSync;
                } else {
                    self.count -= 1;
                }
            }
            LpcState::RdSync => {
                out.drive = LadDrive::driven(SYNC_LONG_WAIT);
                if let Some(rsp) = response {
                    out.pop_response = true;
                    if rsp.error {
                        out.drive = LadDrive::driven(SYNC_ERROR);
                        next = LpcState::Start;
                    } else {
                        out.drive = LadDrive::driven(SYNC_READY);
                        self.data = rsp.data & self.size.data_mask();
                        self.count = self.size.nibbles() - 1;
                        next = LpcState::RdData;
                    }
                }
            }
            LpcState::RdData => {
                out.drive = LadDrive::driven(self.data as u8);
                self.data = self.data.rotate_right(4);
                if self.count == 0 {
                    self.count = 1;
                    next = LpcState::Tar2;
                } else {
                    self.count -= 1;
                }
            }
            LpcState::WrData => {
                self.data = self.size.shift_in_data(self.data, lad);
                if self.count == 0 {
                    self.count = 1;
                    next = LpcState::WrTar1;
                } else {
                    self.count -= 1;
                }
            }
            LpcState::WrTar1 => {
                if self.count == 1 {
                    out.command = Some(self.command());
                }
                if self.count == 0 {
                    next = LpcState::WrSync;
                } else {
                    self.count -= 1;
                }
            }
            LpcState::WrSync => {
                out.drive = LadDrive::driven(SYNC_LONG_WAIT);
                if let Some(rsp) = response {
                    out.pop_response = true;
                    if rsp.error {
                        out.drive = LadDrive::driven(SYNC_ERROR);
                        next = LpcState::Start;
                    } else {
                        out.drive = LadDrive::driven(SYNC_READY);
                        self.count = 1;
                        next = LpcState::Tar2;
                    }
                }
            }
            LpcState::Tar2 => {
                if self.count == 0 {
                    next = LpcState::Start;
                } else {
                    out.drive = LadDrive::driven(LAD_IDLE);
                    self.count -= 1;
                }
            }
        }

        if pins.lreset {
            next = LpcState::Start;
            out.drive = LadDrive::RELEASED;
        }

        if pins.lframe {
            out.drive = LadDrive::RELEASED;
            next = match lad {
                START_TARGET => LpcState::CycleType,
                START_FW_READ => {
                    self.op = Operation::FwRead;
                    LpcState::FwIdSel
                }
                START_FW_WRITE => {
                    self.op = Operation::FwWrite;
                    LpcState::FwIdSel
                }
                _ => LpcState::Start,
            };
        }

        out.reset_queues = pins.lframe || self.lframe_prev;
        if out.reset_queues {
            out.command = None;
            out.pop_response = false;
        }
        self.lframe_prev = pins.lframe;

        if let Some(cmd) = &out.command {
            debug!(op = ?cmd.op, addr = cmd.addr, data = cmd.data, size = ?cmd.size, "lpc command");
        }
        if next != self.state {
            trace!(from = ?self.state, to = ?next, "lpc state");
        }
        self.state = next;
        out
    }
}
