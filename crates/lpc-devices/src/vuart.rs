//! Virtual 16550 UART pair.
//!
//! Two 16550-style register files joined back to back: whatever one side writes to THR shows up
//! in the other side's RBR. There is no baud-rate timing; divisor, line and modem control
//! registers are plain storage so that unmodified 16550 drivers can program them.

use lpc_bus::{SlavePort, SyncFifo, WbRequest, WbResponse};
use tracing::{trace, warn};

pub const VUART_FIFO_DEPTH: usize = 2048;

const IER_ERBFI: u8 = 1 << 0;
const IER_ETBEI: u8 = 1 << 1;
const LCR_DLAB: u8 = 1 << 7;

const IIR_NONE: u8 = 0b0001;
const IIR_THRE: u8 = 0b0010;
const IIR_RX_DATA: u8 = 0b0100;

const LSR_DR: u8 = 1 << 0;
// THR empty + transmitter empty; the far side may not be draining, so TX always looks idle.
const LSR_TX_IDLE: u8 = 0x60;

/// Side effects of one register access on the joined FIFOs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UartTraffic {
    pub tx: Option<u8>,
    pub rx_pop: bool,
}

/// One 16550-style register file.
#[derive(Debug, Clone, Default)]
pub struct VUart {
    ier: u8,
    fcr: u8,
    lcr: u8,
    mcr: u8,
    msr: u8,
    scr: u8,
    dll: u8,
    dlm: u8,
    port: SlavePort,
}

impl VUart {
    pub fn new() -> Self {
        Self::default()
    }

    fn dlab(&self) -> bool {
        self.lcr & LCR_DLAB != 0
    }

    /// Interrupt output given the state of the receive FIFO.
    pub fn irq(&self, rx_ready: bool) -> bool {
        self.iir(rx_ready) != IIR_NONE
    }

    fn iir(&self, rx_ready: bool) -> u8 {
        if self.ier & IER_ERBFI != 0 && rx_ready {
            IIR_RX_DATA
        } else if self.ier & IER_ETBEI != 0 {
            IIR_THRE
        } else {
            IIR_NONE
        }
    }

    pub fn response(&self) -> WbResponse {
        self.port.response()
    }

    /// One clock edge; `rx` is the FIFO this side receives from.
    pub fn clock(&mut self, req: &WbRequest, rx: &SyncFifo<u8>) -> UartTraffic {
        let mut traffic = UartTraffic::default();
        if !self.port.accepts(req) {
            self.port.settle();
            return traffic;
        }

        let value = req.dat_w as u8;
        if req.we {
            trace!(reg = req.adr, value, "vuart write");
            match req.adr {
                0 => {
                    if self.dlab() {
                        self.dll = value;
                    } else {
                        traffic.tx = Some(value);
                    }
                }
                1 => {
                    if self.dlab() {
                        self.dlm = value;
                    } else {
                        self.ier = value & 0x0f;
                    }
                }
                2 => self.fcr = value,
                3 => self.lcr = value,
                4 => self.mcr = value & 0x1f,
                6 => self.msr = value,
                7 => self.scr = value,
                _ => {}
            }
            self.port.complete();
            return traffic;
        }

        let data = match req.adr {
            0 => {
                if self.dlab() {
                    self.dll
                } else {
                    traffic.rx_pop = rx.r_rdy();
                    rx.r_data()
                }
            }
            1 => {
                if self.dlab() {
                    self.dlm
                } else {
                    self.ier
                }
            }
            2 => self.iir(rx.r_rdy()),
            3 => self.lcr,
            4 => self.mcr,
            5 => LSR_TX_IDLE | if rx.r_rdy() { LSR_DR } else { 0 },
            6 => self.msr,
            7 => self.scr,
            _ => 0,
        };
        trace!(reg = req.adr, data, "vuart read");
        self.port.complete_read(u32::from(data));
        traffic
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Two [`VUart`]s wired back to back: side A (BMC) and side B (LPC target).
#[derive(Debug, Clone)]
pub struct VUartJoined {
    a: VUart,
    b: VUart,
    a_to_b: SyncFifo<u8>,
    b_to_a: SyncFifo<u8>,
}

impl Default for VUartJoined {
    fn default() -> Self {
        Self::new(VUART_FIFO_DEPTH)
    }
}

impl VUartJoined {
    pub fn new(depth: usize) -> Self {
        Self {
            a: VUart::new(),
            b: VUart::new(),
            a_to_b: SyncFifo::new(depth),
            b_to_a: SyncFifo::new(depth),
        }
    }

    pub fn a_response(&self) -> WbResponse {
        self.a.response()
    }

    pub fn b_response(&self) -> WbResponse {
        self.b.response()
    }

    pub fn irq_a(&self) -> bool {
        self.a.irq(self.b_to_a.r_rdy())
    }

    pub fn irq_b(&self) -> bool {
        self.b.irq(self.a_to_b.r_rdy())
    }

    /// One clock edge; requests carry register offsets in `adr`.
    pub fn clock(&mut self, req_a: &WbRequest, req_b: &WbRequest) {
        let from_a = self.a.clock(req_a, &self.b_to_a);
        let from_b = self.b.clock(req_b, &self.a_to_b);
        if !self.a_to_b.clock(from_a.tx, from_b.rx_pop) {
            warn!("vuart a->b fifo full, byte dropped");
        }
        if !self.b_to_a.clock(from_b.tx, from_a.rx_pop) {
            warn!("vuart b->a fifo full, byte dropped");
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.a_to_b.depth());
    }
}
