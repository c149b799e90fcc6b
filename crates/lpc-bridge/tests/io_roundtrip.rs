use lpc_bridge::LpcBridge;
use lpc_bus::{WbRequest, WbResponse, WishboneBus};
use lpc_front::protocol::{
    CYCTYPE_IO_READ, CYCTYPE_IO_WRITE, LAD_IDLE, START_FW_READ, START_FW_WRITE, START_TARGET,
    SYNC_LONG_WAIT, SYNC_READY,
};
use lpc_front::{LadDrive, LpcPins, TransferSize};

/// Byte-wide I/O space backed by memory, acking one cycle after the request.
struct IoMemory {
    bytes: Vec<u8>,
    ack: Option<u32>,
}

impl IoMemory {
    fn new() -> Self {
        Self {
            bytes: vec![0; 0x10000],
            ack: None,
        }
    }
}

impl WishboneBus for IoMemory {
    fn response(&self, _req: &WbRequest) -> WbResponse {
        self.ack.map_or(WbResponse::NONE, WbResponse::ack)
    }

    fn clock(&mut self, req: &WbRequest) {
        if self.ack.is_some() || !req.is_active() {
            self.ack = None;
            return;
        }
        let slot = &mut self.bytes[req.adr as usize];
        if req.we {
            *slot = req.dat_w as u8;
        }
        self.ack = Some(u32::from(*slot));
    }
}

/// 32-bit word memory with byte enables.
struct WordMemory {
    words: Vec<u32>,
    ack: Option<u32>,
}

impl WishboneBus for WordMemory {
    fn response(&self, _req: &WbRequest) -> WbResponse {
        self.ack.map_or(WbResponse::NONE, WbResponse::ack)
    }

    fn clock(&mut self, req: &WbRequest) {
        if self.ack.is_some() || !req.is_active() {
            self.ack = None;
            return;
        }
        let word = &mut self.words[req.adr as usize];
        if req.we {
            for lane in 0..4 {
                if req.sel & (1 << lane) != 0 {
                    let mask = 0xffu32 << (8 * lane);
                    *word = (*word & !mask) | (req.dat_w & mask);
                }
            }
        }
        self.ack = Some(*word);
    }
}

struct Harness {
    bridge: LpcBridge,
    io: IoMemory,
    fw: WordMemory,
}

impl Harness {
    fn new() -> Self {
        Self {
            bridge: LpcBridge::new(2),
            io: IoMemory::new(),
            fw: WordMemory {
                words: vec![0; 256],
                ack: None,
            },
        }
    }

    /// Three system edges per LPC edge.
    fn cycle(&mut self, pins: LpcPins) -> LadDrive {
        for _ in 0..3 {
            self.bridge.clock_system_with(&mut self.io, &mut self.fw);
        }
        self.bridge.host_clock(pins)
    }

    fn send(&mut self, lads: &[u8]) {
        for &lad in lads {
            assert!(!self.cycle(LpcPins::data(lad)).enabled);
        }
    }

    fn sync(&mut self) -> Vec<u8> {
        let mut seen = Vec::new();
        for _ in 0..64 {
            let drive = self.cycle(LpcPins::IDLE);
            assert!(drive.enabled);
            seen.push(drive.lad);
            if drive.lad != SYNC_LONG_WAIT {
                return seen;
            }
        }
        panic!("no SYNC completion: {seen:?}");
    }

    fn tar2(&mut self) {
        assert_eq!(self.cycle(LpcPins::IDLE), LadDrive::driven(LAD_IDLE));
        assert!(!self.cycle(LpcPins::IDLE).enabled);
    }

    fn io_write(&mut self, addr: u16, value: u8) -> Vec<u8> {
        self.cycle(LpcPins::frame(START_TARGET));
        self.send(&[CYCTYPE_IO_WRITE]);
        self.send(&addr_nibbles(u32::from(addr), 4));
        self.send(&[value & 0xf, value >> 4]);
        self.send(&[LAD_IDLE, LAD_IDLE]);
        let sync = self.sync();
        self.tar2();
        sync
    }

    fn io_read(&mut self, addr: u16) -> (Vec<u8>, u8) {
        self.cycle(LpcPins::frame(START_TARGET));
        self.send(&[CYCTYPE_IO_READ]);
        self.send(&addr_nibbles(u32::from(addr), 4));
        self.send(&[LAD_IDLE, LAD_IDLE]);
        let sync = self.sync();
        let lo = self.cycle(LpcPins::IDLE).lad;
        let hi = self.cycle(LpcPins::IDLE).lad;
        self.tar2();
        (sync, lo | (hi << 4))
    }

    fn fw_write(&mut self, addr: u32, size: TransferSize, value: u32) {
        self.cycle(LpcPins::frame(START_FW_WRITE));
        self.send(&[0]);
        self.send(&addr_nibbles(addr, 7));
        self.send(&[size.msize()]);
        let nibbles: Vec<u8> = (0..size.nibbles()).map(|i| (value >> (4 * i)) as u8 & 0xf).collect();
        self.send(&nibbles);
        self.send(&[LAD_IDLE, LAD_IDLE]);
        assert_eq!(self.sync().last(), Some(&SYNC_READY));
        self.tar2();
    }

    fn fw_read(&mut self, addr: u32, size: TransferSize) -> u32 {
        self.cycle(LpcPins::frame(START_FW_READ));
        self.send(&[0]);
        self.send(&addr_nibbles(addr, 7));
        self.send(&[size.msize()]);
        self.send(&[LAD_IDLE, LAD_IDLE]);
        assert_eq!(self.sync().last(), Some(&SYNC_READY));
        let mut value = 0;
        for i in 0..size.nibbles() {
            value |= u32::from(self.cycle(LpcPins::IDLE).lad) << (4 * i);
        }
        self.tar2();
        value
    }
}

fn addr_nibbles(addr: u32, count: u32) -> Vec<u8> {
    (0..count).rev().map(|i| (addr >> (4 * i)) as u8 & 0xf).collect()
}

#[test]
fn io_write_then_read_back() {
    let mut h = Harness::new();
    let sync = h.io_write(0x3f8, 0x5a);
    assert!(sync.len() > 1, "long-wait expected before READY: {sync:?}");
    assert_eq!(sync.last(), Some(&SYNC_READY));
    assert!(sync[..sync.len() - 1].iter().all(|&s| s == SYNC_LONG_WAIT));
    assert_eq!(h.io.bytes[0x3f8], 0x5a);

    let (sync, value) = h.io_read(0x3f8);
    assert_eq!(sync.last(), Some(&SYNC_READY));
    assert_eq!(value, 0x5a);
}

#[test]
fn firmware_sizes_and_lanes() {
    let mut h = Harness::new();
    h.fw_write(0x40, TransferSize::Four, 0x1234_5678);
    assert_eq!(h.fw.words[0x10], 0x1234_5678);

    h.fw_write(0x41, TransferSize::One, 0xab);
    assert_eq!(h.fw.words[0x10], 0x1234_ab78);

    assert_eq!(h.fw_read(0x42, TransferSize::Two), 0x1234);
    assert_eq!(h.fw_read(0x43, TransferSize::One), 0x12);
    assert_eq!(h.fw_read(0x40, TransferSize::Four), 0x1234_ab78);
}

#[test]
fn abort_mid_transaction_then_next_transaction_works() {
    let mut h = Harness::new();
    h.cycle(LpcPins::frame(START_TARGET));
    h.send(&[CYCTYPE_IO_WRITE, 0x0, 0x0]);
    // Host restarts with a fresh transaction before finishing the address.
    h.io_write(0x80, 0x11);
    assert_eq!(h.io.bytes[0x80], 0x11);
    assert_eq!(h.io_read(0x80).1, 0x11);
}
