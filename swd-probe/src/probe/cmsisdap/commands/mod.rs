pub mod general;
pub mod swj;
pub mod transfer;

use std::str::Utf8Error;

use crate::probe::DebugProbeError;

#[derive(thiserror::Error, docsplay::Display, Debug)]
pub enum CmsisDapError {
    /// Error handling CMSIS-DAP command {command_id:?}.
    Send {
        command_id: CommandId,
        #[source]
        source: SendError,
    },

    /// CMSIS-DAP responded with an error.
    ErrorResponse,

    /// Too much data provided for the command, the limit is {0}.
    TooMuchData(usize),

    /// Could not determine a suitable packet size for this probe.
    NoPacketSize,

    /// The probe does not support SWD.
    SwdNotSupported,

    /// Connecting to the target failed.
    ConnectFailed,
}

#[derive(thiserror::Error, docsplay::Display, Debug)]
pub enum SendError {
    /// Error in the USB access.
    UsbError(#[source] rusb::Error),

    /// Not enough data in response from probe.
    NotEnoughData,

    /// Only {0} of {1} bytes were written to the probe.
    ShortWrite(usize, usize),

    /// Only {0} of {1} bytes were received from the probe.
    ShortRead(usize, usize),

    /// Status can only be 0x00 or 0xFF.
    InvalidResponseStatus,

    /// Connecting to target failed, received: {0:#04x}.
    ConnectResponseError(u8),

    /// Command ID in response ({0:#04x}) does not match sent command ID.
    CommandIdMismatch(u8),

    /// String in response is not valid UTF-8.
    ///
    /// Strings are required to be UTF-8 encoded by the
    /// CMSIS-DAP specification.
    #[ignore_extra_doc_attributes]
    InvalidString(#[from] Utf8Error),

    /// Unexpected answer to command.
    UnexpectedAnswer,

    /// The request does not fit into a single packet.
    RequestTooLarge,

    /// Timeout in USB communication.
    Timeout,
}

impl From<rusb::Error> for SendError {
    fn from(error: rusb::Error) -> Self {
        match error {
            rusb::Error::Timeout => SendError::Timeout,
            other => SendError::UsbError(other),
        }
    }
}

impl From<CmsisDapError> for DebugProbeError {
    fn from(error: CmsisDapError) -> Self {
        DebugProbeError::ProbeSpecific(Box::new(error))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Status {
    DapOk = 0x00,
    DapError = 0xFF,
}

impl Status {
    pub fn from_byte(value: u8) -> Result<Self, SendError> {
        match value {
            0x00 => Ok(Status::DapOk),
            0xFF => Ok(Status::DapError),
            _ => Err(SendError::InvalidResponseStatus),
        }
    }

    /// Turn an error status into [`CmsisDapError::ErrorResponse`].
    pub fn check(self) -> Result<(), CmsisDapError> {
        match self {
            Status::DapOk => Ok(()),
            Status::DapError => Err(CmsisDapError::ErrorResponse),
        }
    }
}

/// Command ID for CMSIS-DAP commands.
///
/// The command ID is always sent as the first byte for every command,
/// and also is the first byte of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    Info = 0x00,
    Connect = 0x02,
    Transfer = 0x05,
    TransferBlock = 0x06,
    SwjPins = 0x10,
    SwjClock = 0x11,
    SwjSequence = 0x12,
}

pub(crate) trait Request {
    const COMMAND_ID: CommandId;

    type Response;

    /// Convert the request to bytes, which can be sent to the probe.
    /// Returns the amount of bytes written to the buffer.
    ///
    /// The buffer starts after the command ID.
    fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, SendError>;

    /// Parse the response, starting after the command ID.
    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, SendError>;
}

/// A packet based connection to a CMSIS-DAP probe.
///
/// Every call transfers exactly one packet. The buffers passed in are always
/// a full packet long.
pub trait DapChannel {
    /// Send one packet to the probe, returning the number of bytes written.
    fn write(&mut self, buffer: &[u8]) -> Result<usize, SendError>;

    /// Receive one packet from the probe, returning the number of bytes read.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SendError>;

    /// Drop any responses still queued in the probe.
    fn drain(&mut self) {}
}

impl<D: DapChannel + ?Sized> DapChannel for Box<D> {
    fn write(&mut self, buffer: &[u8]) -> Result<usize, SendError> {
        (**self).write(buffer)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SendError> {
        (**self).read(buffer)
    }

    fn drain(&mut self) {
        (**self).drain()
    }
}

pub(crate) fn send_command<Req: Request, D: DapChannel + ?Sized>(
    channel: &mut D,
    packet_size: usize,
    request: &Req,
) -> Result<Req::Response, CmsisDapError> {
    send_command_inner(channel, packet_size, request).map_err(|e| CmsisDapError::Send {
        command_id: Req::COMMAND_ID,
        source: e,
    })
}

fn send_command_inner<Req: Request, D: DapChannel + ?Sized>(
    channel: &mut D,
    packet_size: usize,
    request: &Req,
) -> Result<Req::Response, SendError> {
    // Every packet is sent with its full size, padded with zeros.
    let mut buffer = vec![0; packet_size];

    buffer[0] = Req::COMMAND_ID as u8;
    let size = request.to_bytes(&mut buffer[1..])? + 1;
    trace_buffer("Transmit buffer", &buffer[..size]);

    let written = channel.write(&buffer)?;
    if written != buffer.len() {
        return Err(SendError::ShortWrite(written, buffer.len()));
    }

    buffer.fill(0);
    let bytes_read = channel.read(&mut buffer)?;
    let response_data = &buffer[..bytes_read];
    trace_buffer("Receive buffer", response_data);

    if bytes_read != buffer.len() {
        return Err(SendError::ShortRead(bytes_read, buffer.len()));
    }

    match response_data.split_first() {
        None => Err(SendError::NotEnoughData),
        Some((&id, rest)) if id == Req::COMMAND_ID as u8 => request.parse_response(rest),
        Some((&id, _)) => Err(SendError::CommandIdMismatch(id)),
    }
}

/// Copy `data` into `buffer` at `offset`, failing if it does not fit.
pub(crate) fn write_bytes(buffer: &mut [u8], offset: usize, data: &[u8]) -> Result<(), SendError> {
    buffer
        .get_mut(offset..offset + data.len())
        .ok_or(SendError::RequestTooLarge)?
        .copy_from_slice(data);
    Ok(())
}

/// Trace log a buffer, including only the first trailing zero.
///
/// This is useful for the CMSIS-DAP USB buffers, which often contain many trailing
/// zeros required for the various USB APIs, but make the trace output very long and
/// difficult to read.
fn trace_buffer(name: &str, buf: &[u8]) {
    if tracing::enabled!(tracing::Level::TRACE) {
        let len = buf.len();
        let cut = len + 1 - buf.iter().rev().position(|&x| x != 0).unwrap_or(len);
        let end = std::cmp::min(len, std::cmp::max(1, cut));
        tracing::trace!("{}: {:02X?}...", name, &buf[..end]);
    }
}
