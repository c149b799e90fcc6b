//! LPC wire encodings.

/// Only the low four bits of `LAD` are meaningful.
pub const LAD_MASK: u8 = 0x0f;

/// Value a released or turning-around `LAD` bus reads as.
pub const LAD_IDLE: u8 = 0b1111;

// START field, sampled while LFRAME# is asserted.
pub const START_TARGET: u8 = 0b0000;
pub const START_FW_READ: u8 = 0b1101;
pub const START_FW_WRITE: u8 = 0b1110;

// CYCTYPE + DIR field. Bit 0 is reserved and ignored.
pub const CYCTYPE_MASK: u8 = 0b1110;
pub const CYCTYPE_IO_READ: u8 = 0b0000;
pub const CYCTYPE_IO_WRITE: u8 = 0b0010;

// SYNC field.
pub const SYNC_READY: u8 = 0b0000;
pub const SYNC_SHORT_WAIT: u8 = 0b0101;
pub const SYNC_LONG_WAIT: u8 = 0b0110;
pub const SYNC_ERROR: u8 = 0b1010;

// MSIZE field of firmware cycles.
pub const MSIZE_1_BYTE: u8 = 0b0000;
pub const MSIZE_2_BYTES: u8 = 0b0001;
pub const MSIZE_4_BYTES: u8 = 0b0010;

pub const IO_ADDR_NIBBLES: u8 = 4;
pub const FW_ADDR_NIBBLES: u8 = 7;
pub const IO_ADDR_MASK: u32 = 0xffff;
pub const FW_ADDR_MASK: u32 = 0x0fff_ffff;

/// Shift one address nibble in, most significant nibble first.
pub fn shift_in_address(addr: u32, lad: u8) -> u32 {
    ((addr << 4) | u32::from(lad & LAD_MASK)) & FW_ADDR_MASK
}
