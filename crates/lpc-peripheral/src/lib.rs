#![forbid(unsafe_code)]

//! The complete LPC peripheral: LPC front end and bridge, the I/O-space devices and the firmware
//! window onto a DMA bus, plus a two-clock simulator and a host-side LPC driver for exercising it.

pub mod config;
pub mod error;
pub mod host;
pub mod peripheral;
pub mod sim;

pub use config::{ClockConfig, HostConfig, PeripheralConfig};
pub use error::{BmcError, ConfigError, HostError};
pub use host::{Completion, HostRequest, LpcHost};
pub use peripheral::{Interrupts, LpcPeripheral};
pub use sim::Simulator;

pub use lpc_devices::{IoSpaceConfig, WishboneRam};
pub use lpc_front::TransferSize;
