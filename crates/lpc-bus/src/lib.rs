#![forbid(unsafe_code)]

//! Bus plumbing shared by the LPC peripheral model: Wishbone classic signals sampled per clock
//! edge, plus the FIFOs that move bytes and command records between blocks.

pub mod async_fifo;
pub mod fifo;
pub mod wishbone;

pub use async_fifo::AsyncFifo;
pub use fifo::SyncFifo;
pub use wishbone::{HandshakeState, SlavePort, WbRequest, WbResponse, WishboneBus};
