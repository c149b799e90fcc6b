use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{fifo} FIFO depth must be at least 2 (got {depth})")]
    FifoDepth { fifo: &'static str, depth: usize },

    #[error("{clock} clock period must be non-zero")]
    ZeroClockPeriod { clock: &'static str },

    #[error("clock-domain queues need at least one synchronizer stage")]
    NoSyncStages,

    #[error("{window} window at {addr:#x} is not word aligned")]
    Misaligned { window: &'static str, addr: u32 },

    #[error("{window} window at {addr:#x} runs past the end of its bus")]
    OutOfRange { window: &'static str, addr: u32 },

    #[error("{first} and {second} windows overlap")]
    Overlap {
        first: &'static str,
        second: &'static str,
    },

    #[error("{budget} cycle budget must be non-zero")]
    ZeroBudget { budget: &'static str },

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures seen by the host-side LPC driver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("no SYNC completion after {cycles} LPC cycles")]
    SyncTimeout { cycles: u32 },

    #[error("target signalled ERROR sync")]
    SyncError,

    #[error("unexpected SYNC symbol {symbol:#06b}")]
    UnexpectedSync { symbol: u8 },

    #[error("target drove LAD during {phase}")]
    Contention { phase: &'static str },

    #[error("target did not drive LAD during {phase}")]
    NotDriving { phase: &'static str },
}

/// Failures of a BMC-side register access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BmcError {
    #[error("bus error at BMC word address {adr:#x}")]
    Bus { adr: u32 },

    #[error("no acknowledge from BMC word address {adr:#x} after {cycles} cycles")]
    NoAck { adr: u32, cycles: u32 },
}
