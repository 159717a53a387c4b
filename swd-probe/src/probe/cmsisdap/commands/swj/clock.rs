use super::super::{write_bytes, CommandId, Request, SendError, Status};

/// Set the SWD clock frequency, in Hz.
#[derive(Debug, Clone, Copy)]
pub struct SwjClockRequest(pub(crate) u32);

impl SwjClockRequest {
    pub fn from_khz(speed_khz: u32) -> Self {
        SwjClockRequest(speed_khz.saturating_mul(1000))
    }
}

impl Request for SwjClockRequest {
    const COMMAND_ID: CommandId = CommandId::SwjClock;

    type Response = Status;

    fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, SendError> {
        write_bytes(buffer, 0, &self.0.to_le_bytes())?;
        Ok(4)
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, SendError> {
        Status::from_byte(*buffer.first().ok_or(SendError::NotEnoughData)?)
    }
}
