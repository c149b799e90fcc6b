//! Wishbone classic (non-pipelined) bus signals.
//!
//! Every block in the model is evaluated once per clock edge. A master publishes a [`WbRequest`]
//! for the cycle, slaves answer with a [`WbResponse`] computed purely from their registered state,
//! and then the edge commits (`clock`). Responses therefore always reflect what a slave latched on
//! an earlier edge, which is what gives the model its cycle accuracy.

/// Master-driven signals for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WbRequest {
    pub adr: u32,
    pub dat_w: u32,
    pub sel: u8,
    pub cyc: bool,
    pub stb: bool,
    pub we: bool,
}

impl WbRequest {
    pub const IDLE: Self = Self {
        adr: 0,
        dat_w: 0,
        sel: 0,
        cyc: false,
        stb: false,
        we: false,
    };

    pub fn read(adr: u32, sel: u8) -> Self {
        Self {
            adr,
            sel,
            cyc: true,
            stb: true,
            ..Self::IDLE
        }
    }

    pub fn write(adr: u32, dat_w: u32, sel: u8) -> Self {
        Self {
            adr,
            dat_w,
            sel,
            cyc: true,
            stb: true,
            we: true,
        }
    }

    /// A transfer is requested this cycle (`cyc & stb`).
    pub fn is_active(&self) -> bool {
        self.cyc && self.stb
    }

    /// Same request with the address replaced; used by decoders to hand a slave its local offset.
    pub fn with_adr(&self, adr: u32) -> Self {
        Self { adr, ..*self }
    }
}

/// Slave-driven signals for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WbResponse {
    pub dat_r: u32,
    pub ack: bool,
    pub err: bool,
}

impl WbResponse {
    pub const NONE: Self = Self {
        dat_r: 0,
        ack: false,
        err: false,
    };

    pub fn ack(dat_r: u32) -> Self {
        Self {
            dat_r,
            ack: true,
            err: false,
        }
    }

    pub fn err() -> Self {
        Self {
            dat_r: 0,
            ack: false,
            err: true,
        }
    }

    /// The slave terminated the transfer this cycle, successfully or not.
    pub fn is_done(&self) -> bool {
        self.ack || self.err
    }
}

pub trait WishboneBus {
    /// Signals the slave drives during the current cycle.
    fn response(&self, req: &WbRequest) -> WbResponse;

    /// Commit one clock edge with `req` as the sampled master signals.
    fn clock(&mut self, req: &WbRequest);

    /// Reset the device back to its power-on state.
    fn reset(&mut self) {}
}

impl<T: WishboneBus + ?Sized> WishboneBus for Box<T> {
    fn response(&self, req: &WbRequest) -> WbResponse {
        (**self).response(req)
    }

    fn clock(&mut self, req: &WbRequest) {
        (**self).clock(req)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

impl<T: WishboneBus + ?Sized> WishboneBus for &mut T {
    fn response(&self, req: &WbRequest) -> WbResponse {
        (**self).response(req)
    }

    fn clock(&mut self, req: &WbRequest) {
        (**self).clock(req)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HandshakeState {
    #[default]
    Idle,
    Ack,
}

/// Two-state slave handshake used by the register-file devices.
///
/// An access seen while `Idle` is performed at that edge and acknowledged (with registered read
/// data) during the following cycle. The port then spends one edge in `Ack` before it will accept
/// another access, so back-to-back transfers from a master that keeps `cyc` high take two cycles
/// each.
#[derive(Debug, Clone, Default)]
pub struct SlavePort {
    state: HandshakeState,
    ack: bool,
    dat_r: u32,
}

impl SlavePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn response(&self) -> WbResponse {
        WbResponse {
            dat_r: self.dat_r,
            ack: self.ack,
            err: false,
        }
    }

    /// Whether `req` will be performed at the coming edge.
    pub fn accepts(&self, req: &WbRequest) -> bool {
        self.state == HandshakeState::Idle && req.is_active()
    }

    /// Finish an accepted read; `data` becomes visible with the ack.
    pub fn complete_read(&mut self, data: u32) {
        self.dat_r = data;
        self.complete();
    }

    /// Finish an accepted write. Read data keeps its previous value.
    pub fn complete(&mut self) {
        self.ack = true;
        self.state = HandshakeState::Ack;
    }

    /// Edge with no accepted access.
    pub fn settle(&mut self) {
        self.ack = false;
        self.state = HandshakeState::Idle;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
