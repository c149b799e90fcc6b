#![forbid(unsafe_code)]

//! Script runner for the LPC peripheral simulator.
//!
//! A script is a JSON document with a list of steps, each tagged by `op`:
//!
//! ```json
//! { "steps": [
//!     { "op": "io_write", "addr": 1016, "data": 19 },
//!     { "op": "bmc_read", "addr": 0, "expect": 19 },
//!     { "op": "fw_read", "addr": 4096, "size": 2 }
//! ] }
//! ```
//!
//! LPC and BMC bus errors are part of the normal output; only a failed `expect` aborts the run.

use anyhow::{bail, Context, Result};
use lpc_bus::WishboneBus;
use lpc_peripheral::{Completion, HostRequest, Interrupts, Simulator, TransferSize};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    IoWrite {
        addr: u16,
        data: u8,
    },
    IoRead {
        addr: u16,
        #[serde(default)]
        expect: Option<u8>,
    },
    FwWrite {
        addr: u32,
        size: u8,
        data: u32,
    },
    FwRead {
        addr: u32,
        size: u8,
        #[serde(default)]
        expect: Option<u32>,
    },
    /// BMC bus access; `addr` is a word address.
    BmcWrite {
        addr: u32,
        data: u32,
    },
    BmcRead {
        addr: u32,
        #[serde(default)]
        expect: Option<u32>,
    },
    /// Assert LFRAME# with the stop nibble.
    Abort,
    /// Hold LRESET# for a number of LPC cycles.
    LpcReset {
        cycles: u32,
    },
    /// Let the system clock run.
    Idle {
        cycles: u64,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Self::IoWrite { .. } => "io_write",
            Self::IoRead { .. } => "io_read",
            Self::FwWrite { .. } => "fw_write",
            Self::FwRead { .. } => "fw_read",
            Self::BmcWrite { .. } => "bmc_write",
            Self::BmcRead { .. } => "bmc_read",
            Self::Abort => "abort",
            Self::LpcReset { .. } => "lpc_reset",
            Self::Idle { .. } => "idle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse script")
    }
}

/// One line of output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sync: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub time_ps: u64,
    pub irqs: Interrupts,
}

impl std::fmt::Display for StepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:>4}] {:<9} t={}ps", self.index, self.op, self.time_ps)?;
        if let Some(data) = self.data {
            write!(f, " data={data:#x}")?;
        }
        if !self.sync.is_empty() {
            write!(f, " sync={}", self.sync.len())?;
        }
        if let Some(error) = &self.error {
            write!(f, " error=\"{error}\"")?;
        }
        let irqs = self.irqs;
        write!(
            f,
            " irq(bmc vuart={} ipmi={}, target vuart={} ipmi={})",
            u8::from(irqs.bmc_vuart),
            u8::from(irqs.bmc_ipmi),
            u8::from(irqs.target_vuart),
            u8::from(irqs.target_ipmi)
        )
    }
}

pub fn transfer_size(bytes: u8) -> Result<TransferSize> {
    match bytes {
        1 => Ok(TransferSize::One),
        2 => Ok(TransferSize::Two),
        4 => Ok(TransferSize::Four),
        other => bail!("unsupported firmware transfer size {other} (expected 1, 2 or 4)"),
    }
}

fn check<T: PartialEq + std::fmt::LowerHex>(index: usize, got: Option<T>, expect: Option<T>) -> Result<()> {
    match (got, expect) {
        (_, None) => Ok(()),
        (Some(got), Some(expect)) if got == expect => Ok(()),
        (Some(got), Some(expect)) => {
            bail!("step {index}: expected {expect:#x}, got {got:#x}")
        }
        (None, Some(expect)) => bail!("step {index}: expected {expect:#x}, got an error"),
    }
}

/// Run every step in order and collect the reports.
pub fn run_script<D: WishboneBus>(sim: &mut Simulator<D>, script: &Script) -> Result<Vec<StepReport>> {
    let mut reports = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let mut report = StepReport {
            index,
            op: step.name(),
            data: None,
            sync: Vec::new(),
            error: None,
            time_ps: 0,
            irqs: Interrupts::default(),
        };

        let host_cycle = |sim: &mut Simulator<D>, req: HostRequest, report: &mut StepReport| {
            match sim.host().transact(req) {
                Ok(Completion { data, sync, .. }) => {
                    report.sync = sync;
                    if req.is_read() {
                        report.data = Some(data);
                    }
                }
                Err(err) => report.error = Some(err.to_string()),
            }
        };

        match *step {
            Step::IoWrite { addr, data } => {
                host_cycle(sim, HostRequest::IoWrite { addr, data }, &mut report)
            }
            Step::IoRead { addr, expect } => {
                host_cycle(sim, HostRequest::IoRead { addr }, &mut report);
                check(index, report.data, expect.map(u32::from))?;
            }
            Step::FwWrite { addr, size, data } => {
                let size = transfer_size(size).with_context(|| format!("step {index}"))?;
                host_cycle(sim, HostRequest::FwWrite { addr, size, data }, &mut report);
            }
            Step::FwRead { addr, size, expect } => {
                let size = transfer_size(size).with_context(|| format!("step {index}"))?;
                host_cycle(sim, HostRequest::FwRead { addr, size }, &mut report);
                check(index, report.data, expect)?;
            }
            Step::BmcWrite { addr, data } => {
                if let Err(err) = sim.bmc_write(addr, data) {
                    report.error = Some(err.to_string());
                }
            }
            Step::BmcRead { addr, expect } => {
                match sim.bmc_read(addr) {
                    Ok(data) => report.data = Some(data),
                    Err(err) => report.error = Some(err.to_string()),
                }
                check(index, report.data, expect)?;
            }
            Step::Abort => sim.host().abort(),
            Step::LpcReset { cycles } => sim.host().bus_reset(cycles),
            Step::Idle { cycles } => sim.run_system_cycles(cycles),
        }

        report.time_ps = sim.now_ps();
        report.irqs = sim.peripheral().interrupts();
        info!(index, op = report.op, error = report.error.as_deref(), "step done");
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpc_peripheral::{PeripheralConfig, WishboneRam};

    fn sim() -> Simulator<WishboneRam> {
        Simulator::new(&PeripheralConfig::default(), WishboneRam::new(256)).unwrap()
    }

    #[test]
    fn parses_tagged_steps() {
        let script = Script::from_json_str(
            r#"{ "steps": [ { "op": "io_read", "addr": 1023 }, { "op": "abort" }, { "op": "idle", "cycles": 3 } ] }"#,
        )
        .unwrap();
        assert_eq!(
            script.steps,
            vec![
                Step::IoRead {
                    addr: 1023,
                    expect: None
                },
                Step::Abort,
                Step::Idle { cycles: 3 },
            ]
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Script::from_json_str(r#"{ "steps": [ { "op": "abort", "now": true } ] }"#).is_err());
    }

    #[test]
    fn bus_errors_are_reported_not_fatal() {
        let script = Script {
            steps: vec![
                Step::IoRead {
                    addr: 0x80,
                    expect: None,
                },
                Step::BmcRead {
                    addr: 0x7000,
                    expect: None,
                },
                Step::IoWrite {
                    addr: 0x3ff,
                    data: 7,
                },
                Step::IoRead {
                    addr: 0x3ff,
                    expect: Some(7),
                },
            ],
        };
        let reports = run_script(&mut sim(), &script).unwrap();
        assert!(reports[0].error.is_some());
        assert!(reports[1].error.is_some());
        assert_eq!(reports[3].data, Some(7));
        assert!(reports[3].time_ps > reports[2].time_ps);
    }

    #[test]
    fn failed_expectation_stops_the_run() {
        let script = Script {
            steps: vec![Step::BmcRead {
                addr: 0x2000 >> 2,
                expect: Some(0),
            }],
        };
        let err = run_script(&mut sim(), &script).unwrap_err();
        assert!(err.to_string().contains("expected 0x0"));
    }

    #[test]
    fn invalid_size_is_an_error() {
        let script = Script {
            steps: vec![Step::FwRead {
                addr: 0,
                size: 3,
                expect: None,
            }],
        };
        assert!(run_script(&mut sim(), &script).is_err());
    }
}
