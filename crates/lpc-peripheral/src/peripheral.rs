//! Top-level peripheral.
//!
//! The LPC side runs on the host clock; everything behind the bridge runs on the system clock.
//! The firmware bus passes through the LPC control window before reaching the DMA slave.

use lpc_bridge::LpcBridge;
use lpc_bus::{WbRequest, WbResponse, WishboneBus};
use lpc_devices::IoSpace;
use lpc_front::{LadDrive, LpcPins, LpcState};
use serde::Serialize;

use crate::config::PeripheralConfig;
use crate::error::ConfigError;

/// Interrupt outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Interrupts {
    pub bmc_vuart: bool,
    pub bmc_ipmi: bool,
    pub target_vuart: bool,
    pub target_ipmi: bool,
}

#[derive(Debug)]
pub struct LpcPeripheral<D> {
    bridge: LpcBridge,
    io_space: IoSpace,
    dma: D,
    bmc_request: WbRequest,
}

impl<D: WishboneBus> LpcPeripheral<D> {
    pub fn new(config: &PeripheralConfig, dma: D) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            bridge: LpcBridge::new(config.sync_stages),
            io_space: IoSpace::new(config.io_space.clone()),
            dma,
            bmc_request: WbRequest::IDLE,
        })
    }

    pub fn front_state(&self) -> LpcState {
        self.bridge.front_state()
    }

    pub fn io_space(&self) -> &IoSpace {
        &self.io_space
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }

    pub fn interrupts(&self) -> Interrupts {
        Interrupts {
            bmc_vuart: self.io_space.bmc_vuart_irq(),
            bmc_ipmi: self.io_space.bmc_ipmi_irq(),
            target_vuart: self.io_space.target_vuart_irq(),
            target_ipmi: self.io_space.target_ipmi_irq(),
        }
    }

    /// One LPC clock edge.
    pub fn host_clock(&mut self, pins: LpcPins) -> LadDrive {
        self.bridge.host_clock(pins)
    }

    /// Master signals the BMC drives from now on.
    pub fn set_bmc_request(&mut self, req: WbRequest) {
        self.bmc_request = req;
    }

    pub fn bmc_response(&self) -> WbResponse {
        self.io_space.bmc_response(&self.bmc_request)
    }

    /// One system clock edge. Returns the BMC-bus response seen during the cycle that ends here.
    pub fn system_clock(&mut self) -> WbResponse {
        let reqs = self.bridge.requests();
        let dma_req = self.io_space.lpc_ctrl().translate(&reqs.fw);

        let io_rsp = self.io_space.target_response(&reqs.io);
        let fw_rsp = self.dma.response(&dma_req);
        let bmc_rsp = self.io_space.bmc_response(&self.bmc_request);

        self.bridge.system_clock(io_rsp, fw_rsp);
        self.io_space.clock(&reqs.io, &self.bmc_request);
        self.dma.clock(&dma_req);
        bmc_rsp
    }

    pub fn reset(&mut self) {
        self.bridge.reset();
        self.io_space.reset();
        self.dma.reset();
        self.bmc_request = WbRequest::IDLE;
    }
}
