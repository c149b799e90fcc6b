#![forbid(unsafe_code)]

//! Wishbone slaves behind the LPC bridge and the BMC bus.

pub mod io_space;
pub mod ipmi_bt;
pub mod lpc_ctrl;
pub mod ram;
pub mod vuart;

pub use io_space::{IoSpace, IoSpaceConfig};
pub use ipmi_bt::{BmcIrq, BtCtrl, BtSide, CtrlFlag, CtrlWrite, FlagAccess, IpmiBt};
pub use lpc_ctrl::LpcCtrl;
pub use ram::WishboneRam;
pub use vuart::{VUart, VUartJoined};
