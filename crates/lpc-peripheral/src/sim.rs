//! Two-clock, cycle-stepped simulation of the peripheral.
//!
//! Time is kept in picoseconds. The earliest pending edge always runs next; when a host edge and
//! a system edge coincide the system edge runs first.

use lpc_bus::{WbRequest, WbResponse, WishboneBus};
use lpc_front::{LadDrive, LpcPins};
use tracing::{debug, trace};

use crate::config::{HostConfig, PeripheralConfig};
use crate::error::{BmcError, ConfigError};
use crate::host::LpcHost;
use crate::peripheral::LpcPeripheral;

#[derive(Debug)]
pub struct Simulator<D> {
    peripheral: LpcPeripheral<D>,
    host_period: u64,
    system_period: u64,
    now: u64,
    next_host_edge: u64,
    next_system_edge: u64,
    host_cycles: u64,
    system_cycles: u64,
    limits: HostConfig,
}

impl<D: WishboneBus> Simulator<D> {
    pub fn new(config: &PeripheralConfig, dma: D) -> Result<Self, ConfigError> {
        let peripheral = LpcPeripheral::new(config, dma)?;
        Ok(Self {
            peripheral,
            host_period: config.clocks.host_period_ps,
            system_period: config.clocks.system_period_ps,
            now: 0,
            next_host_edge: config.clocks.host_period_ps,
            next_system_edge: config.clocks.system_period_ps,
            host_cycles: 0,
            system_cycles: 0,
            limits: config.host.clone(),
        })
    }

    pub fn peripheral(&self) -> &LpcPeripheral<D> {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut LpcPeripheral<D> {
        &mut self.peripheral
    }

    pub fn limits(&self) -> &HostConfig {
        &self.limits
    }

    /// Simulated time of the most recent edge, in picoseconds.
    pub fn now_ps(&self) -> u64 {
        self.now
    }

    pub fn host_cycles(&self) -> u64 {
        self.host_cycles
    }

    pub fn system_cycles(&self) -> u64 {
        self.system_cycles
    }

    pub fn host(&mut self) -> LpcHost<'_, D> {
        LpcHost::new(self)
    }

    fn system_edge(&mut self) -> WbResponse {
        self.now = self.next_system_edge;
        self.next_system_edge += self.system_period;
        self.system_cycles += 1;
        self.peripheral.system_clock()
    }

    /// Run up to and including the next LPC edge, sampling `pins` there.
    pub fn host_cycle(&mut self, pins: LpcPins) -> LadDrive {
        while self.next_system_edge <= self.next_host_edge {
            self.system_edge();
        }
        self.now = self.next_host_edge;
        self.next_host_edge += self.host_period;
        self.host_cycles += 1;
        let drive = self.peripheral.host_clock(pins);
        trace!(t = self.now, ?pins, ?drive, "lpc cycle");
        drive
    }

    /// Run up to and including the next system edge. LPC edges on the way see an idle bus.
    pub fn system_cycle(&mut self) -> WbResponse {
        while self.next_host_edge < self.next_system_edge {
            self.host_cycle(LpcPins::IDLE);
        }
        self.system_edge()
    }

    pub fn run_system_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.system_cycle();
        }
    }

    fn bmc_transfer(&mut self, req: WbRequest) -> Result<u32, BmcError> {
        self.peripheral.set_bmc_request(req);
        let budget = self.limits.max_bmc_cycles;
        let mut result = Err(BmcError::NoAck {
            adr: req.adr,
            cycles: budget,
        });
        for _ in 0..budget {
            let rsp = self.system_cycle();
            if rsp.ack {
                result = Ok(rsp.dat_r);
                break;
            }
            if rsp.err {
                result = Err(BmcError::Bus { adr: req.adr });
                break;
            }
        }
        self.peripheral.set_bmc_request(WbRequest::IDLE);
        debug!(adr = req.adr, we = req.we, dat_w = req.dat_w, ?result, "bmc access");
        result
    }

    /// 32-bit read from the BMC bus at word address `adr`.
    pub fn bmc_read(&mut self, adr: u32) -> Result<u32, BmcError> {
        self.bmc_transfer(WbRequest::read(adr, 0b1111))
    }

    pub fn bmc_write(&mut self, adr: u32, value: u32) -> Result<(), BmcError> {
        self.bmc_transfer(WbRequest::write(adr, value, 0b1111))?;
        Ok(())
    }
}
