/// Outcome of a single transfer as reported by the target, or by the probe on its behalf.
///
/// The 3-bit SWD acknowledge is decoded by [`Ack::from_swd_bits`]. CMSIS-DAP probes report the
/// same field plus extra flags in their response byte, see [`Ack::from_dap_response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The transfer completed.
    Ok,
    /// The target is busy and the transfer has to be repeated.
    Wait,
    /// A sticky error flag is set in the debug port.
    Fault,
    /// The response could not be trusted.
    Protocol(ProtocolError),
    /// An earlier transfer in the same probe command failed, so this one was never sent.
    NotExecuted,
}

impl Ack {
    /// Wire value of an OK acknowledge, LSB first on the line.
    pub const OK: u8 = 0b001;
    /// Wire value of a WAIT acknowledge.
    pub const WAIT: u8 = 0b010;
    /// Wire value of a FAULT acknowledge.
    pub const FAULT: u8 = 0b100;

    /// Decode the three acknowledge bits sampled from SWDIO.
    pub fn from_swd_bits(bits: u8) -> Self {
        match bits & 0b111 {
            Self::OK => Ack::Ok,
            Self::WAIT => Ack::Wait,
            Self::FAULT => Ack::Fault,
            other => Ack::Protocol(ProtocolError::InvalidAck(other)),
        }
    }

    /// Decode the acknowledge byte of a `DAP_Transfer` or `DAP_TransferBlock` response.
    ///
    /// Bit 3 signals an SWD protocol error detected by the probe firmware, and
    /// takes precedence over the acknowledge bits. Bit 4 (value mismatch) is
    /// not part of the acknowledge and has to be checked separately.
    pub fn from_dap_response(response: u8) -> Self {
        if response & 0x08 != 0 {
            Ack::Protocol(ProtocolError::SwdProtocol)
        } else {
            Self::from_swd_bits(response)
        }
    }

    pub fn is_ok(self) -> bool {
        self == Ack::Ok
    }
}

/// The different ways a transfer can fail without a valid acknowledge from the target.
#[derive(thiserror::Error, docsplay::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The parity bit of the read data does not match the data.
    IncorrectParity,
    /// The target answered with the invalid acknowledge {0:#05b}.
    InvalidAck(u8),
    /// The probe reported an SWD protocol error.
    SwdProtocol,
    /// The transfer was not executed because an earlier transfer failed.
    NotExecuted,
}
