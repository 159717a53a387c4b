//! Bit sequences clocked out on SWDIO outside of regular transfers.

use super::DapTransport;
use crate::probe::DebugProbeError;

/// SWJ-DP switch code selecting SWD, sent LSB first.
pub const JTAG_TO_SWD: u16 = 0xE79E;

/// 56 cycles with SWDIO high, enough for the required minimum of 50.
pub const LINE_RESET_HIGH: [u8; 7] = [0xFF; 7];

/// Idle cycles with SWDIO low, which end a line reset.
pub const IDLE_LOW: [u8; 1] = [0x00];

/// A fixed pattern of SWDIO levels, LSB of the first byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwjSequence {
    pub name: &'static str,
    pub bits: &'static [u8],
    pub bit_len: usize,
}

const JTAG_TO_SWD_BYTES: [u8; 2] = JTAG_TO_SWD.to_le_bytes();

/// The complete switch to SWD: line reset, switch code, line reset, idle.
pub const SWD_LINE_RESET: [SwjSequence; 4] = [
    SwjSequence {
        name: "line reset",
        bits: &LINE_RESET_HIGH,
        bit_len: LINE_RESET_HIGH.len() * 8,
    },
    SwjSequence {
        name: "JTAG to SWD",
        bits: &JTAG_TO_SWD_BYTES,
        bit_len: 16,
    },
    SwjSequence {
        name: "line reset",
        bits: &LINE_RESET_HIGH,
        bit_len: LINE_RESET_HIGH.len() * 8,
    },
    SwjSequence {
        name: "idle",
        bits: &IDLE_LOW,
        bit_len: IDLE_LOW.len() * 8,
    },
];

/// Clock out [`SWD_LINE_RESET`] and flush it to the wire.
///
/// This only selects SWD and resets the DP state machine. Reading DPIDR afterwards,
/// which the protocol requires before anything else, is up to the caller.
pub fn swd_line_reset<P: DapTransport + ?Sized>(transport: &mut P) -> Result<(), DebugProbeError> {
    tracing::debug!("Performing SWD line reset");

    for sequence in &SWD_LINE_RESET {
        tracing::trace!("SWJ sequence: {} ({} bits)", sequence.name, sequence.bit_len);
        transport.raw_out(sequence.bits, sequence.bit_len)?;
    }

    transport.flush()
}
