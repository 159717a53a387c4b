use super::super::{CommandId, Request, SendError};

#[derive(Clone, Copy, Debug)]
pub enum ConnectRequest {
    UseSwd = 0x01,
}

impl Request for ConnectRequest {
    const COMMAND_ID: CommandId = CommandId::Connect;

    type Response = ConnectResponse;

    fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, SendError> {
        buffer[0] = *self as u8;
        Ok(1)
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, SendError> {
        match buffer.first() {
            None => Err(SendError::NotEnoughData),
            Some(0) => Ok(ConnectResponse::InitFailed),
            Some(1) => Ok(ConnectResponse::SuccessfulInitForSwd),
            Some(2) => Ok(ConnectResponse::SuccessfulInitForJtag),
            Some(&other) => Err(SendError::ConnectResponseError(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectResponse {
    InitFailed = 0x00,
    SuccessfulInitForSwd = 0x01,
    SuccessfulInitForJtag = 0x02,
}
