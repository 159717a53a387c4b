//! SWD transfers on top of a bit level transport.

use super::{BitTransport, DebugProbeError};
use crate::architecture::arm::{
    Ack, BlockTransferRequest, BlockTransferResult, DapTransport, PortType, ProtocolError,
    RegisterAddress, TransferDirection, TransferKind, TransferRequest, TransferResult,
};

/// Even parity over all bits of `value`, as used for the SWD data phase.
pub(crate) fn parity(value: u32) -> bool {
    value.count_ones() % 2 == 1
}

/// Build the 8-bit SWD request header.
///
/// Bit 0 is sent first: start, APnDP, RnW, A\[2:3\], parity, stop, park.
pub(crate) fn build_request_header(
    port: PortType,
    direction: TransferDirection,
    address: RegisterAddress,
) -> u8 {
    let ap_n_dp = port.is_ap() as u8;
    let r_n_w = (direction == TransferDirection::Read) as u8;
    let a2 = address.a2() as u8;
    let a3 = address.a3() as u8;

    let parity = (ap_n_dp + r_n_w + a2 + a3) & 1;

    // Start and park bits are always high, stop is always low.
    0x81 | ap_n_dp << 1 | r_n_w << 2 | a2 << 3 | a3 << 4 | parity << 5
}

/// SWD transfers, driven one bit at a time through a [`BitTransport`].
///
/// AP reads are posted: the value returned for an AP read is the result of the
/// previous AP read. This layer reports what is on the wire, resolving that is up to
/// [`Adiv5Swd`](crate::Adiv5Swd).
#[derive(Debug)]
pub struct SwdLink<T> {
    transport: T,
}

impl<T: BitTransport> SwdLink<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn transfer_inner(
        &mut self,
        request: &TransferRequest,
    ) -> Result<TransferResult, DebugProbeError> {
        let header = build_request_header(request.port, request.direction(), request.address);
        let ack = Ack::from_swd_bits(self.transport.write_cmd(header)?);

        tracing::trace!("SWD request {:#04x}: {:?}", header, ack);

        match ack {
            Ack::Ok => {}
            Ack::Protocol(_) => {
                // Nobody knows whether the target is sending data now, so clock
                // through a data phase to keep the framing.
                let _ = self.transport.read_word_and_parity()?;
                return Ok(TransferResult::with_ack(ack));
            }
            _ => return Ok(TransferResult::with_ack(ack)),
        }

        match request.kind {
            TransferKind::Write(value) => {
                self.transport.write_word_and_parity(value, parity(value))?;
                Ok(TransferResult::ok(None))
            }
            TransferKind::Read => {
                let (value, received_parity) = self.transport.read_word_and_parity()?;

                if parity(value) != received_parity {
                    tracing::debug!("Parity error, read {:#010x}", value);
                    return Ok(TransferResult {
                        ack: Ack::Protocol(ProtocolError::IncorrectParity),
                        value: Some(value),
                        value_mismatch: false,
                    });
                }

                Ok(TransferResult::ok(Some(value)))
            }
        }
    }
}

impl<T: BitTransport> DapTransport for SwdLink<T> {
    fn transfer(&mut self, request: &TransferRequest) -> Result<TransferResult, DebugProbeError> {
        self.transfer_inner(request)
    }

    fn transfer_block(
        &mut self,
        request: &BlockTransferRequest,
    ) -> Result<BlockTransferResult, DebugProbeError> {
        let mut result = BlockTransferResult {
            ack: Ack::Ok,
            values: Vec::with_capacity(match request.direction() {
                TransferDirection::Read => request.len(),
                TransferDirection::Write => 0,
            }),
            executed: 0,
        };

        for index in 0..request.len() {
            let Some(single) = request.nth(index) else {
                break;
            };

            let single = self.transfer_inner(&single)?;
            result.ack = single.ack;

            if !single.ack.is_ok() {
                break;
            }

            result.values.extend(single.value);
            result.executed += 1;
        }

        Ok(result)
    }

    fn posts_ap_reads(&self) -> bool {
        true
    }

    fn raw_out(&mut self, bits: &[u8], bit_len: usize) -> Result<(), DebugProbeError> {
        self.transport.raw_out(bits, bit_len)
    }

    fn flush(&mut self) -> Result<(), DebugProbeError> {
        self.transport.flush()
    }

    fn reset_target(&mut self, assert: bool) -> Result<(), DebugProbeError> {
        self.transport.reset_target(assert)
    }
}
