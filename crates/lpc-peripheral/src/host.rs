//! Host-side LPC driver.
//!
//! Plays the chipset's part of each cycle: START, cycle type, address, size and write data, the
//! first turnaround, then polls SYNC until the target answers. Wait states are unbounded on the
//! wire, so the driver gives up after [`HostConfig::max_sync_cycles`] and aborts the cycle with
//! LFRAME#.
//!
//! [`HostConfig::max_sync_cycles`]: crate::config::HostConfig::max_sync_cycles

use lpc_bus::WishboneBus;
use lpc_front::protocol::{
    CYCTYPE_IO_READ, CYCTYPE_IO_WRITE, FW_ADDR_NIBBLES, IO_ADDR_NIBBLES, LAD_IDLE, START_FW_READ,
    START_FW_WRITE, START_TARGET, SYNC_ERROR, SYNC_LONG_WAIT, SYNC_READY, SYNC_SHORT_WAIT,
};
use lpc_front::{LadDrive, LpcPins, TransferSize};
use tracing::{debug, warn};

use crate::error::HostError;
use crate::sim::Simulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    IoRead {
        addr: u16,
    },
    IoWrite {
        addr: u16,
        data: u8,
    },
    FwRead {
        addr: u32,
        size: TransferSize,
    },
    FwWrite {
        addr: u32,
        size: TransferSize,
        data: u32,
    },
}

fn address(addr: u32, nibbles: u8) -> impl Iterator<Item = LpcPins> {
    (0..u32::from(nibbles))
        .rev()
        .map(move |i| LpcPins::data((addr >> (4 * i)) as u8 & 0xf))
}

fn data(value: u32, nibbles: u8) -> impl Iterator<Item = LpcPins> {
    (0..u32::from(nibbles)).map(move |i| LpcPins::data((value >> (4 * i)) as u8 & 0xf))
}

impl HostRequest {
    pub fn is_read(&self) -> bool {
        matches!(self, Self::IoRead { .. } | Self::FwRead { .. })
    }

    /// Nibbles of read data the target returns after READY.
    pub fn read_nibbles(&self) -> u8 {
        match self {
            Self::IoRead { .. } => 2,
            Self::FwRead { size, .. } => size.nibbles(),
            Self::IoWrite { .. } | Self::FwWrite { .. } => 0,
        }
    }

    /// Everything the host drives before the first turnaround.
    pub fn header(&self) -> Vec<LpcPins> {
        let mut pins = Vec::with_capacity(20);
        match *self {
            Self::IoRead { addr } => {
                pins.push(LpcPins::frame(START_TARGET));
                pins.push(LpcPins::data(CYCTYPE_IO_READ));
                pins.extend(address(addr.into(), IO_ADDR_NIBBLES));
            }
            Self::IoWrite { addr, data: value } => {
                pins.push(LpcPins::frame(START_TARGET));
                pins.push(LpcPins::data(CYCTYPE_IO_WRITE));
                pins.extend(address(addr.into(), IO_ADDR_NIBBLES));
                pins.extend(data(value.into(), 2));
            }
            Self::FwRead { addr, size } => {
                pins.push(LpcPins::frame(START_FW_READ));
                // IDSEL: this model answers to device 0 only.
                pins.push(LpcPins::data(0));
                pins.extend(address(addr, FW_ADDR_NIBBLES));
                pins.push(LpcPins::data(size.msize()));
            }
            Self::FwWrite {
                addr,
                size,
                data: value,
            } => {
                pins.push(LpcPins::frame(START_FW_WRITE));
                pins.push(LpcPins::data(0));
                pins.extend(address(addr, FW_ADDR_NIBBLES));
                pins.push(LpcPins::data(size.msize()));
                pins.extend(data(value, size.nibbles()));
            }
        }
        pins
    }
}

/// Result of a completed LPC cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Read data; zero for writes.
    pub data: u32,
    /// SYNC symbols observed, ending with READY.
    pub sync: Vec<u8>,
    /// LPC cycles from START through the final turnaround.
    pub cycles: u64,
}

/// Borrowed view of a [`Simulator`] acting as the LPC host.
pub struct LpcHost<'a, D> {
    sim: &'a mut Simulator<D>,
}

impl<'a, D: WishboneBus> LpcHost<'a, D> {
    pub fn new(sim: &'a mut Simulator<D>) -> Self {
        Self { sim }
    }

    fn released(&mut self, pins: LpcPins, phase: &'static str) -> Result<(), HostError> {
        if self.sim.host_cycle(pins).enabled {
            return Err(HostError::Contention { phase });
        }
        Ok(())
    }

    fn driven(&mut self, phase: &'static str) -> Result<LadDrive, HostError> {
        let drive = self.sim.host_cycle(LpcPins::IDLE);
        if !drive.enabled {
            return Err(HostError::NotDriving { phase });
        }
        Ok(drive)
    }

    fn await_sync(&mut self) -> Result<Vec<u8>, HostError> {
        let budget = self.sim.limits().max_sync_cycles;
        let mut seen = Vec::new();
        for _ in 0..budget {
            let symbol = self.driven("SYNC")?.lad;
            seen.push(symbol);
            match symbol {
                SYNC_LONG_WAIT | SYNC_SHORT_WAIT => {}
                SYNC_READY => return Ok(seen),
                SYNC_ERROR => return Err(HostError::SyncError),
                other => return Err(HostError::UnexpectedSync { symbol: other }),
            }
        }
        warn!(cycles = budget, "SYNC timeout, aborting cycle");
        self.abort();
        Err(HostError::SyncTimeout { cycles: budget })
    }

    /// Run one complete LPC cycle.
    pub fn transact(&mut self, req: HostRequest) -> Result<Completion, HostError> {
        let start = self.sim.host_cycles();
        for pins in req.header() {
            self.released(pins, "request")?;
        }
        for _ in 0..2 {
            self.released(LpcPins::data(LAD_IDLE), "turnaround")?;
        }

        let sync = self.await_sync()?;

        let mut value = 0;
        for i in 0..req.read_nibbles() {
            let nibble = self.driven("read data")?.lad;
            value |= u32::from(nibble) << (4 * u32::from(i));
        }

        if self.driven("turnaround")?.lad != LAD_IDLE {
            return Err(HostError::NotDriving {
                phase: "turnaround",
            });
        }
        self.released(LpcPins::IDLE, "turnaround")?;

        let completion = Completion {
            data: value,
            sync,
            cycles: self.sim.host_cycles() - start,
        };
        debug!(?req, data = completion.data, cycles = completion.cycles, "lpc cycle complete");
        Ok(completion)
    }

    pub fn io_read(&mut self, addr: u16) -> Result<u8, HostError> {
        Ok(self.transact(HostRequest::IoRead { addr })?.data as u8)
    }

    pub fn io_write(&mut self, addr: u16, data: u8) -> Result<(), HostError> {
        self.transact(HostRequest::IoWrite { addr, data })?;
        Ok(())
    }

    pub fn fw_read(&mut self, addr: u32, size: TransferSize) -> Result<u32, HostError> {
        Ok(self.transact(HostRequest::FwRead { addr, size })?.data)
    }

    pub fn fw_write(&mut self, addr: u32, size: TransferSize, data: u32) -> Result<(), HostError> {
        self.transact(HostRequest::FwWrite { addr, size, data })?;
        Ok(())
    }

    /// Drive only the first `symbols` cycles of `req`'s header, leaving the cycle unfinished.
    pub fn send_partial(&mut self, req: HostRequest, symbols: usize) {
        for pins in req.header().into_iter().take(symbols) {
            self.sim.host_cycle(pins);
        }
    }

    /// Abort whatever is in progress: one cycle of LFRAME# with the stop nibble.
    pub fn abort(&mut self) {
        self.sim.host_cycle(LpcPins::frame(LAD_IDLE));
        self.sim.host_cycle(LpcPins::IDLE);
    }

    /// Hold LRESET# for `cycles` LPC cycles.
    pub fn bus_reset(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.sim.host_cycle(LpcPins::reset());
        }
        self.sim.host_cycle(LpcPins::IDLE);
    }
}
