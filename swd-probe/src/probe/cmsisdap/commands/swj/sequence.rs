//! Implementation of the DAP_SWJ_Sequence command

use super::super::{write_bytes, CmsisDapError, CommandId, Request, SendError, Status};

/// Most bits a single sequence command can carry.
pub const MAX_SEQUENCE_BITS: usize = 256;

#[derive(Clone, Copy, Debug)]
pub struct SequenceRequest {
    /// Number of bits, 0 encodes 256.
    bit_count: u8,
    data: [u8; 32],
}

impl Request for SequenceRequest {
    const COMMAND_ID: CommandId = CommandId::SwjSequence;

    type Response = Status;

    fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, SendError> {
        let transfer_len_bytes = (self.bit_len() + 7) / 8;

        write_bytes(buffer, 0, &[self.bit_count])?;
        write_bytes(buffer, 1, &self.data[..transfer_len_bytes])?;

        // bit_count + data
        Ok(1 + transfer_len_bytes)
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, SendError> {
        Status::from_byte(*buffer.first().ok_or(SendError::NotEnoughData)?)
    }
}

impl SequenceRequest {
    /// Clock out the first `bit_len` bits of `data`, LSB of the first byte first.
    pub(crate) fn new(data: &[u8], bit_len: usize) -> Result<SequenceRequest, CmsisDapError> {
        if bit_len > MAX_SEQUENCE_BITS {
            return Err(CmsisDapError::TooMuchData(MAX_SEQUENCE_BITS));
        }

        let byte_len = (bit_len + 7) / 8;
        let mut owned_data = [0u8; 32];
        let available = data.len().min(byte_len);
        owned_data[..available].copy_from_slice(&data[..available]);

        Ok(SequenceRequest {
            // 256 wraps to 0, which is what the probe expects.
            bit_count: bit_len as u8,
            data: owned_data,
        })
    }

    pub fn bit_len(&self) -> usize {
        match self.bit_count {
            0 => MAX_SEQUENCE_BITS,
            n => n as usize,
        }
    }
}
