#![forbid(unsafe_code)]

//! LPC target front end: the bus protocol constants, the command/response records exchanged with
//! the system side, and the per-clock protocol state machine.

pub mod command;
pub mod front;
pub mod protocol;

pub use command::{Operation, ReadResponse, TransferSize, WriteCommand};
pub use front::{FrontCycle, LadDrive, LpcFront, LpcPins, LpcState};
