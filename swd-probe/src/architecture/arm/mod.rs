//! All the interface bits for ARM.

mod ack;
pub(crate) mod communication_interface;
pub mod dp;
pub mod sequences;
mod traits;

pub use ack::{Ack, ProtocolError};
pub use communication_interface::{Adiv5Swd, ArmError, DapError, DpState, LinkState};
pub use traits::*;

/// A debug port register with a fixed address inside the SWD register window.
pub trait Register: Clone + From<u32> + Into<u32> + Sized + std::fmt::Debug {
    const ADDRESS: u8;
    const NAME: &'static str;
}
