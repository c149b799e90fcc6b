use lpc_bus::{WbRequest, WbResponse, WishboneBus};
use lpc_front::protocol::{SYNC_LONG_WAIT, SYNC_READY};
use lpc_front::LpcState;
use lpc_peripheral::{
    HostError, HostRequest, PeripheralConfig, Simulator, TransferSize, WishboneRam,
};

const BMC_VUART: u32 = 0x0000 >> 2;
const BMC_BT: u32 = 0x1000 >> 2;
const BMC_LPC_CTRL: u32 = 0x2000 >> 2;

fn sim() -> Simulator<WishboneRam> {
    Simulator::new(&PeripheralConfig::default(), WishboneRam::new(1 << 12)).unwrap()
}

/// DMA slave that remembers every request it accepted.
#[derive(Default)]
struct Recorder {
    ram: Option<WishboneRam>,
    seen: Vec<WbRequest>,
    ack: bool,
}

impl WishboneBus for Recorder {
    fn response(&self, _req: &WbRequest) -> WbResponse {
        WbResponse {
            ack: self.ack,
            ..WbResponse::NONE
        }
    }

    fn clock(&mut self, req: &WbRequest) {
        if let Some(ram) = self.ram.as_mut() {
            ram.clock(req);
        }
        if req.is_active() && !self.ack {
            self.seen.push(*req);
            self.ack = true;
        } else {
            self.ack = false;
        }
    }
}

/// DMA slave that never answers.
struct Silent;

impl WishboneBus for Silent {
    fn response(&self, _req: &WbRequest) -> WbResponse {
        WbResponse::NONE
    }

    fn clock(&mut self, _req: &WbRequest) {}
}

#[test]
fn io_write_then_read_scratch_register() {
    let mut sim = sim();
    let write = sim
        .host()
        .transact(HostRequest::IoWrite {
            addr: 0x3ff,
            data: 0x13,
        })
        .unwrap();
    assert_eq!(write.sync.last(), Some(&SYNC_READY));
    assert!(write.sync[..write.sync.len() - 1]
        .iter()
        .all(|&s| s == SYNC_LONG_WAIT));
    assert!(write.sync.len() > 1);

    assert_eq!(sim.host().io_read(0x3ff), Ok(0x13));
}

#[test]
fn vuart_carries_bytes_between_host_and_bmc() {
    let mut sim = sim();
    sim.host().io_write(0x3f8, 0x13).unwrap();
    // LSR on the BMC side reports data ready.
    assert_eq!(sim.bmc_read(BMC_VUART + 5).unwrap() & 1, 1);
    assert_eq!(sim.bmc_read(BMC_VUART), Ok(0x13));

    // BMC enables the RX interrupt on the target side's behalf and answers.
    sim.host().io_write(0x3f9, 0x01).unwrap();
    sim.bmc_write(BMC_VUART, u32::from(b'k')).unwrap();
    sim.run_system_cycles(2);
    assert!(sim.peripheral().interrupts().target_vuart);
    assert_eq!(sim.host().io_read(0x3fa), Ok(0b0100));
    assert_eq!(sim.host().io_read(0x3f8), Ok(b'k'));
    assert!(!sim.peripheral().interrupts().target_vuart);
}

#[test]
fn unmapped_io_reports_error_sync_and_recovers() {
    let mut sim = sim();
    assert_eq!(sim.host().io_read(0x80), Err(HostError::SyncError));
    assert_eq!(sim.peripheral().front_state(), LpcState::Start);
    assert_eq!(sim.host().io_write(0x81, 1), Err(HostError::SyncError));

    sim.host().io_write(0x3ff, 0x42).unwrap();
    assert_eq!(sim.host().io_read(0x3ff), Ok(0x42));
}

#[test]
fn firmware_halfword_write_lanes() {
    let recorder = Recorder::default();
    let mut sim = Simulator::new(&PeripheralConfig::default(), recorder).unwrap();
    sim.host()
        .fw_write(0x1002, TransferSize::Two, 0xbeef)
        .unwrap();

    let seen = &sim.peripheral().dma().seen;
    assert_eq!(seen.len(), 1);
    let req = seen[0];
    assert!(req.we);
    assert_eq!(req.sel, 0b1100);
    assert_eq!(req.dat_w >> 16, 0xbeef);
    // Default window: 192 MiB base, 64 MiB mask.
    assert_eq!(req.adr, (0x0c00_0000 | 0x1000) >> 2);
}

#[test]
fn firmware_reads_and_writes_reach_ram() {
    let mut sim = sim();
    let mut host = sim.host();
    host.fw_write(0x20, TransferSize::Four, 0x0102_0304).unwrap();
    host.fw_write(0x22, TransferSize::One, 0xaa).unwrap();
    assert_eq!(host.fw_read(0x20, TransferSize::Four), Ok(0x01aa_0304));
    assert_eq!(host.fw_read(0x22, TransferSize::Two), Ok(0x01aa));
    assert_eq!(host.fw_read(0x21, TransferSize::One), Ok(0x03));

    let word = sim.peripheral().dma().word((0x0c00_0000 | 0x20) >> 2);
    assert_eq!(word, 0x01aa_0304);
}

#[test]
fn host_reads_memory_preloaded_behind_the_window() {
    let mut sim = sim();
    sim.peripheral_mut()
        .dma_mut()
        .set_word((0x0c00_0000 | 0x40) >> 2, 0xcafe_f00d);
    let mut host = sim.host();
    assert_eq!(host.fw_read(0x40, TransferSize::Four), Ok(0xcafe_f00d));
    assert_eq!(host.fw_read(0x42, TransferSize::Two), Ok(0xcafe));
    assert_eq!(host.fw_read(0x40, TransferSize::One), Ok(0x0d));
}

#[test]
fn bmc_moves_the_firmware_window() {
    let mut sim = sim();
    sim.bmc_write(BMC_LPC_CTRL, 0x0000_4000).unwrap();
    sim.bmc_write(BMC_LPC_CTRL + 2, 0x0000_0fff).unwrap();
    sim.host().fw_write(0x0123_4010, TransferSize::Four, 0x5555_aaaa).unwrap();
    assert_eq!(sim.peripheral().dma().word((0x4000 | 0x010) >> 2), 0x5555_aaaa);
}

#[test]
fn ipmi_bt_message_from_host_to_bmc() {
    let mut sim = sim();
    sim.bmc_write(BMC_BT, 0b01).unwrap();

    for byte in [0x02, 0x18, 0x01] {
        sim.host().io_write(0xe5, byte).unwrap();
    }
    sim.host().io_write(0xe4, 0x04).unwrap();
    sim.run_system_cycles(2);
    assert!(sim.peripheral().interrupts().bmc_ipmi);
    assert_eq!(sim.bmc_read(BMC_BT + 4), Ok(0x04));

    let msg: Vec<u32> = (0..3).map(|_| sim.bmc_read(BMC_BT + 5).unwrap()).collect();
    assert_eq!(msg, vec![0x02, 0x18, 0x01]);

    sim.bmc_write(BMC_BT + 4, 0x04).unwrap();
    sim.bmc_write(BMC_BT + 1, 0).unwrap();
    assert!(!sim.peripheral().interrupts().bmc_ipmi);
    assert_eq!(sim.host().io_read(0xe4), Ok(0));
}

#[test]
fn ipmi_bt_response_interrupts_host() {
    let mut sim = sim();
    sim.host().io_write(0xe6, 0x01).unwrap();
    sim.bmc_write(BMC_BT + 5, 0x77).unwrap();
    sim.bmc_write(BMC_BT + 4, 0x08).unwrap();
    sim.run_system_cycles(2);
    assert!(sim.peripheral().interrupts().target_ipmi);

    assert_eq!(sim.host().io_read(0xe4), Ok(0x08));
    assert_eq!(sim.host().io_read(0xe5), Ok(0x77));
    sim.host().io_write(0xe6, 0x03).unwrap();
    sim.run_system_cycles(2);
    assert!(!sim.peripheral().interrupts().target_ipmi);
}

#[test]
fn partial_cycle_is_abandoned_by_next_start() {
    let mut sim = sim();
    let req = HostRequest::IoWrite {
        addr: 0x3ff,
        data: 0xee,
    };
    sim.host().send_partial(req, 5);
    sim.host().io_write(0x3ff, 0x21).unwrap();
    assert_eq!(sim.host().io_read(0x3ff), Ok(0x21));
}

#[test]
fn stalled_firmware_cycle_times_out_and_bus_recovers() {
    let mut config = PeripheralConfig::default();
    config.host.max_sync_cycles = 16;
    let mut sim = Simulator::new(&config, Silent).unwrap();
    assert_eq!(
        sim.host().fw_read(0, TransferSize::Four),
        Err(HostError::SyncTimeout { cycles: 16 })
    );
    assert_eq!(sim.peripheral().front_state(), LpcState::Start);

    sim.host().io_write(0x3ff, 0x99).unwrap();
    assert_eq!(sim.host().io_read(0x3ff), Ok(0x99));
}

#[test]
fn lreset_mid_cycle_returns_to_start() {
    let mut sim = sim();
    sim.host().send_partial(
        HostRequest::FwWrite {
            addr: 0x100,
            size: TransferSize::Four,
            data: 1,
        },
        12,
    );
    sim.host().bus_reset(3);
    assert_eq!(sim.peripheral().front_state(), LpcState::Start);
    sim.host().io_write(0x3ff, 0x5).unwrap();
    assert_eq!(sim.host().io_read(0x3ff), Ok(0x5));
}

#[test]
fn recorder_forwards_to_ram() {
    let recorder = Recorder {
        ram: Some(WishboneRam::new(16)),
        ..Recorder::default()
    };
    let mut sim = Simulator::new(&PeripheralConfig::default(), recorder).unwrap();
    sim.host().fw_write(0x8, TransferSize::Four, 0xcafe_f00d).unwrap();
    let ram = sim.peripheral().dma().ram.as_ref().unwrap();
    assert_eq!(ram.word((0x0c00_0000 | 0x8) >> 2), 0xcafe_f00d);
}
