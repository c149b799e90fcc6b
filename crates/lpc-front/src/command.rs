//! Records exchanged between the LPC clock domain and the system clock domain.
//!
//! Commands travel as a packed `u64`:
//!
//! | bits  | field |
//! |-------|-------|
//! | 0..32 | data  |
//! | 32..60| addr  |
//! | 60..62| op    |
//! | 62..64| size  |
//!
//! Responses are packed as `data | error << 32`.

use crate::protocol::{FW_ADDR_MASK, MSIZE_1_BYTE, MSIZE_2_BYTES, MSIZE_4_BYTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Operation {
    #[default]
    IoRead = 0,
    IoWrite = 1,
    FwRead = 2,
    FwWrite = 3,
}

impl Operation {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::IoRead,
            1 => Self::IoWrite,
            2 => Self::FwRead,
            _ => Self::FwWrite,
        }
    }

    pub fn is_io(self) -> bool {
        matches!(self, Self::IoRead | Self::IoWrite)
    }

    pub fn is_write(self) -> bool {
        matches!(self, Self::IoWrite | Self::FwWrite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferSize {
    #[default]
    One,
    Two,
    Four,
}

impl TransferSize {
    pub fn bytes(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Number of LAD data nibbles.
    pub fn nibbles(self) -> u8 {
        (self.bytes() * 2) as u8
    }

    pub fn data_mask(self) -> u32 {
        match self {
            Self::One => 0xff,
            Self::Two => 0xffff,
            Self::Four => 0xffff_ffff,
        }
    }

    /// Byte-lane mask for a transfer starting at lane 0.
    pub fn lanes(self) -> u8 {
        match self {
            Self::One => 0b0001,
            Self::Two => 0b0011,
            Self::Four => 0b1111,
        }
    }

    /// Encoding in the packed command record (`bytes - 1`; 2 is unused).
    pub fn code(self) -> u8 {
        (self.bytes() - 1) as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::One),
            1 => Some(Self::Two),
            3 => Some(Self::Four),
            _ => None,
        }
    }

    pub fn from_msize(nibble: u8) -> Option<Self> {
        match nibble {
            MSIZE_1_BYTE => Some(Self::One),
            MSIZE_2_BYTES => Some(Self::Two),
            MSIZE_4_BYTES => Some(Self::Four),
            _ => None,
        }
    }

    pub fn msize(self) -> u8 {
        match self {
            Self::One => MSIZE_1_BYTE,
            Self::Two => MSIZE_2_BYTES,
            Self::Four => MSIZE_4_BYTES,
        }
    }

    /// Shift a write-data nibble in at the top of the field; the first nibble received ends up
    /// least significant.
    pub fn shift_in_data(self, data: u32, lad: u8) -> u32 {
        let bits = self.bytes() * 8;
        ((data & self.data_mask()) >> 4) | (u32::from(lad & 0xf) << (bits - 4))
    }
}

/// A bus transaction decoded by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteCommand {
    pub op: Operation,
    pub addr: u32,
    pub data: u32,
    pub size: TransferSize,
}

impl WriteCommand {
    pub fn pack(&self) -> u64 {
        u64::from(self.data)
            | (u64::from(self.addr & FW_ADDR_MASK) << 32)
            | (u64::from(self.op as u8) << 60)
            | (u64::from(self.size.code()) << 62)
    }

    /// `None` if the size field holds the unused encoding.
    pub fn unpack(raw: u64) -> Option<Self> {
        Some(Self {
            data: raw as u32,
            addr: (raw >> 32) as u32 & FW_ADDR_MASK,
            op: Operation::from_bits((raw >> 60) as u8),
            size: TransferSize::from_code((raw >> 62) as u8 & 0b11)?,
        })
    }
}

/// Completion of a [`WriteCommand`]. Writes complete with `data == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadResponse {
    pub data: u32,
    pub error: bool,
}

impl ReadResponse {
    pub fn ok(data: u32) -> Self {
        Self { data, error: false }
    }

    pub fn error() -> Self {
        Self {
            data: 0,
            error: true,
        }
    }

    pub fn pack(&self) -> u64 {
        u64::from(self.data) | (u64::from(self.error) << 32)
    }

    pub fn unpack(raw: u64) -> Self {
        Self {
            data: raw as u32,
            error: (raw >> 32) & 1 != 0,
        }
    }
}
