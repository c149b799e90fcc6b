#![forbid(unsafe_code)]

//! LPC to Wishbone bridge.
//!
//! The front end runs on the LPC clock; decoded commands cross into the system clock through a
//! two-entry asynchronous FIFO and are issued on one of two Wishbone masters:
//!
//! - the I/O bus: 16-bit byte address, 8-bit data, always a single byte lane;
//! - the firmware bus: 30-bit word address, 32-bit data, byte lanes chosen from the transfer size
//!   and the low address bits.
//!
//! Completions travel back through a second two-entry FIFO. Only the I/O bus reports errors.

use lpc_bus::{AsyncFifo, WbRequest, WbResponse, WishboneBus};
use lpc_front::protocol::IO_ADDR_MASK;
use lpc_front::{LadDrive, LpcFront, LpcPins, LpcState, Operation, ReadResponse, TransferSize, WriteCommand};
use tracing::{trace, warn};

pub const QUEUE_DEPTH: usize = 2;

/// Master signals for both system-side buses during one system cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusRequests {
    pub io: WbRequest,
    pub fw: WbRequest,
}

/// Byte offset of the lane a firmware transfer uses within its 32-bit word.
///
/// 1-byte transfers use `addr[1:0]`, 2-byte transfers `addr[1]`, 4-byte transfers lane 0.
pub fn firmware_lane(addr: u32, size: TransferSize) -> u32 {
    addr & (4 - size.bytes())
}

#[derive(Debug, Clone)]
pub struct LpcBridge {
    front: LpcFront,
    commands: AsyncFifo<u64>,
    responses: AsyncFifo<u64>,
}

impl LpcBridge {
    pub fn new(sync_stages: u8) -> Self {
        Self {
            front: LpcFront::new(),
            commands: AsyncFifo::new(QUEUE_DEPTH, sync_stages),
            responses: AsyncFifo::new(QUEUE_DEPTH, sync_stages),
        }
    }

    pub fn front_state(&self) -> LpcState {
        self.front.state()
    }

    /// One LPC clock edge. Returns what the target drives onto LAD during the cycle.
    pub fn host_clock(&mut self, pins: LpcPins) -> LadDrive {
        let head = self.responses.peek().copied().map(ReadResponse::unpack);
        let cycle = self.front.clock(pins, head);

        if cycle.reset_queues {
            self.commands.reset();
            self.responses.reset();
        } else {
            if cycle.pop_response {
                self.responses.read();
            }
            if let Some(cmd) = cycle.command {
                if !self.commands.write(cmd.pack()) {
                    warn!(?cmd, "command queue full, dropping LPC command");
                }
            }
        }

        self.commands.clock_write_domain();
        self.responses.clock_read_domain();
        cycle.drive
    }

    fn pending_command(&self) -> Option<u64> {
        self.commands.peek().copied()
    }

    /// Master signals for the current system cycle.
    ///
    /// A command is only issued while there is room for its response, so a completion can
    /// always be queued at the edge it arrives.
    pub fn requests(&self) -> BusRequests {
        let Some(cmd) = self.pending_command().and_then(WriteCommand::unpack) else {
            return BusRequests::default();
        };
        let go = self.responses.w_rdy();
        let mut reqs = BusRequests::default();
        if cmd.op.is_io() {
            reqs.io = WbRequest {
                adr: cmd.addr & IO_ADDR_MASK,
                dat_w: cmd.data & 0xff,
                sel: 1,
                cyc: go,
                stb: go,
                we: cmd.op == Operation::IoWrite,
            };
        } else {
            let lane = firmware_lane(cmd.addr, cmd.size);
            reqs.fw = WbRequest {
                adr: cmd.addr >> 2,
                dat_w: cmd.data << (8 * lane),
                sel: cmd.size.lanes() << lane,
                cyc: go,
                stb: go,
                we: cmd.op == Operation::FwWrite,
            };
        }
        reqs
    }

    /// One system clock edge with the slave responses sampled for the cycle.
    pub fn system_clock(&mut self, io: WbResponse, fw: WbResponse) {
        let issued = self
            .pending_command()
            .filter(|_| self.responses.w_rdy());
        if let Some(raw) = issued {
            match WriteCommand::unpack(raw) {
                Some(cmd) => {
                    if let Some(rsp) = Self::completion(&cmd, io, fw) {
                        trace!(?cmd, ?rsp, "wishbone completion");
                        self.commands.read();
                        self.responses.write(rsp.pack());
                    }
                }
                None => {
                    warn!(raw, "malformed command record");
                    self.commands.read();
                    self.responses.write(ReadResponse::error().pack());
                }
            }
        }
        self.commands.clock_read_domain();
        self.responses.clock_write_domain();
    }

    fn completion(cmd: &WriteCommand, io: WbResponse, fw: WbResponse) -> Option<ReadResponse> {
        if cmd.op.is_io() {
            if io.err {
                return Some(ReadResponse::error());
            }
            if !io.ack {
                return None;
            }
            let data = if cmd.op == Operation::IoRead {
                io.dat_r & 0xff
            } else {
                0
            };
            Some(ReadResponse::ok(data))
        } else {
            if !fw.ack {
                return None;
            }
            let data = if cmd.op == Operation::FwRead {
                (fw.dat_r >> (8 * firmware_lane(cmd.addr, cmd.size))) & cmd.size.data_mask()
            } else {
                0
            };
            Some(ReadResponse::ok(data))
        }
    }

    /// Drive both buses for one system edge against the given slaves.
    pub fn clock_system_with<I, F>(&mut self, io: &mut I, fw: &mut F)
    where
        I: WishboneBus + ?Sized,
        F: WishboneBus + ?Sized,
    {
        let reqs = self.requests();
        let io_rsp = io.response(&reqs.io);
        let fw_rsp = fw.response(&reqs.fw);
        self.system_clock(io_rsp, fw_rsp);
        io.clock(&reqs.io);
        fw.clock(&reqs.fw);
    }

    pub fn reset(&mut self) {
        self.front.reset();
        self.commands.reset();
        self.responses.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_selection() {
        assert_eq!(firmware_lane(0x13, TransferSize::One), 3);
        assert_eq!(firmware_lane(0x13, TransferSize::Two), 2);
        assert_eq!(firmware_lane(0x13, TransferSize::Four), 0);
    }

    fn bridge_with(cmd: WriteCommand) -> LpcBridge {
        let mut bridge = LpcBridge::new(0);
        assert!(bridge.commands.write(cmd.pack()));
        bridge
    }

    #[test]
    fn firmware_byte_write_uses_one_lane() {
        let bridge = bridge_with(WriteCommand {
            op: Operation::FwWrite,
            addr: 0x102,
            data: 0xaa,
            size: TransferSize::One,
        });
        let reqs = bridge.requests();
        assert!(!reqs.io.cyc);
        assert_eq!(reqs.fw, WbRequest::write(0x40, 0x00aa_0000, 0b0100));
    }

    #[test]
    fn firmware_halfword_read_shifts_data_down() {
        let mut bridge = bridge_with(WriteCommand {
            op: Operation::FwRead,
            addr: 0x6,
            data: 0,
            size: TransferSize::Two,
        });
        assert_eq!(bridge.requests().fw, WbRequest::read(1, 0b1100));
        bridge.system_clock(WbResponse::NONE, WbResponse::ack(0xbeef_1234));
        assert_eq!(
            bridge.responses.peek().copied().map(ReadResponse::unpack),
            Some(ReadResponse::ok(0xbeef))
        );
    }

    #[test]
    fn io_error_becomes_error_response() {
        let mut bridge = bridge_with(WriteCommand {
            op: Operation::IoRead,
            addr: 0x80,
            data: 0,
            size: TransferSize::One,
        });
        assert_eq!(bridge.requests().io, WbRequest::read(0x80, 1));
        bridge.system_clock(WbResponse::err(), WbResponse::NONE);
        assert!(bridge.commands.is_empty());
        assert_eq!(bridge.responses.peek().copied(), Some(ReadResponse::error().pack()));
    }

    #[test]
    fn waits_while_response_queue_is_full() {
        let mut bridge = bridge_with(WriteCommand {
            op: Operation::IoWrite,
            addr: 0x80,
            data: 1,
            size: TransferSize::One,
        });
        bridge.responses.write(0);
        bridge.responses.write(0);
        let reqs = bridge.requests();
        assert!(!reqs.io.cyc && !reqs.io.stb);
        assert_eq!(reqs.io.adr, 0x80);
    }
}
