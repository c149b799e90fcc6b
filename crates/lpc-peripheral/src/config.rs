//! Peripheral configuration.
//!
//! Every field has a default matching the hardware build, so a JSON file only needs to name what
//! it changes.

use lpc_devices::io_space::{BMC_WINDOW_WORDS, TARGET_IPMI_SPAN, TARGET_VUART_SPAN};
use lpc_devices::IoSpaceConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Clock periods in picoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub host_period_ps: u64,
    pub system_period_ps: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            // 33 MHz LCLK.
            host_period_ps: 30_000,
            system_period_ps: 10_000,
        }
    }
}

/// Patience of the simulated host and BMC masters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// LPC cycles the host waits in SYNC before giving up and aborting the cycle.
    pub max_sync_cycles: u32,
    /// System cycles a BMC access may take before it is reported as unacknowledged.
    pub max_bmc_cycles: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_sync_cycles: 256,
            max_bmc_cycles: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeripheralConfig {
    pub io_space: IoSpaceConfig,
    pub clocks: ClockConfig,
    pub host: HostConfig,
    /// Synchronizer depth of the two clock-domain queues.
    pub sync_stages: u8,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            io_space: IoSpaceConfig::default(),
            clocks: ClockConfig::default(),
            host: HostConfig::default(),
            sync_stages: 2,
        }
    }
}

/// Bytes addressable on the BMC bus (14-bit word address).
pub const BMC_BUS_BYTES: u64 = 0x1_0000;
/// Bytes addressable on the target I/O bus.
pub const TARGET_BUS_BYTES: u64 = 0x1_0000;

fn overlaps(a: (u32, u32), b: (u32, u32)) -> bool {
    let end = |(base, len): (u32, u32)| u64::from(base) + u64::from(len);
    u64::from(a.0) < end(b) && u64::from(b.0) < end(a)
}

impl PeripheralConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let io = &self.io_space;
        for (fifo, depth) in [("BT", io.bt_depth), ("VUART", io.vuart_depth)] {
            if depth < 2 {
                return Err(ConfigError::FifoDepth { fifo, depth });
            }
        }

        if self.clocks.host_period_ps == 0 {
            return Err(ConfigError::ZeroClockPeriod { clock: "host" });
        }
        if self.clocks.system_period_ps == 0 {
            return Err(ConfigError::ZeroClockPeriod { clock: "system" });
        }
        if self.sync_stages == 0 {
            return Err(ConfigError::NoSyncStages);
        }
        if self.host.max_sync_cycles == 0 {
            return Err(ConfigError::ZeroBudget { budget: "host SYNC" });
        }
        if self.host.max_bmc_cycles == 0 {
            return Err(ConfigError::ZeroBudget { budget: "BMC" });
        }

        let bmc = [
            ("BMC VUART", io.bmc_vuart_addr),
            ("BMC IPMI BT", io.bmc_ipmi_addr),
            ("LPC control", io.bmc_lpc_ctrl_addr),
        ];
        for (window, addr) in bmc {
            if addr % 4 != 0 {
                return Err(ConfigError::Misaligned { window, addr });
            }
        }
        let span = BMC_WINDOW_WORDS * 4;
        for (window, addr) in bmc {
            if u64::from(addr) + u64::from(span) > BMC_BUS_BYTES {
                return Err(ConfigError::OutOfRange { window, addr });
            }
        }
        for (i, &(first, a)) in bmc.iter().enumerate() {
            for &(second, b) in &bmc[i + 1..] {
                if overlaps((a, span), (b, span)) {
                    return Err(ConfigError::Overlap { first, second });
                }
            }
        }

        let target = [
            ("target IPMI BT", u32::from(io.target_ipmi_addr), TARGET_IPMI_SPAN),
            ("target VUART", u32::from(io.target_vuart_addr), TARGET_VUART_SPAN),
        ];
        for (window, addr, len) in target {
            if u64::from(addr) + u64::from(len) > TARGET_BUS_BYTES {
                return Err(ConfigError::OutOfRange { window, addr });
            }
        }
        let [(first, a, a_len), (second, b, b_len)] = target;
        if overlaps((a, a_len), (b, b_len)) {
            return Err(ConfigError::Overlap { first, second });
        }
        Ok(())
    }
}
