use super::super::{CommandId, Request, SendError};

use scroll::{Pread, LE};

macro_rules! info_command {
    ($id:expr, $name:ident, $response_type:ty) => {
        #[derive(Clone, Default, Debug)]
        pub struct $name {}

        impl Request for $name {
            const COMMAND_ID: CommandId = CommandId::Info;

            type Response = $response_type;

            fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, SendError> {
                buffer[0] = $id;
                Ok(1)
            }

            fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, SendError> {
                ParseFromResponse::from_response(buffer)
            }
        }
    };
}

info_command!(0x01, VendorCommand, Option<String>);

info_command!(0x02, ProductIdCommand, Option<String>);

info_command!(0x03, SerialNumberCommand, Option<String>);

info_command!(0x04, FirmwareVersionCommand, Option<String>);

info_command!(0x05, TargetDeviceVendorCommand, Option<String>);

info_command!(0x06, TargetDeviceNameCommand, Option<String>);

info_command!(0xF0, CapabilitiesCommand, Capabilities);

info_command!(0xFE, PacketCountCommand, u8);

info_command!(0xFF, PacketSizeCommand, u16);

trait ParseFromResponse: Sized {
    fn from_response(buffer: &[u8]) -> Result<Self, SendError>;
}

/// The payload of an info response, whose first byte is the payload length.
fn payload(buffer: &[u8]) -> Result<&[u8], SendError> {
    let (&len, rest) = buffer.split_first().ok_or(SendError::NotEnoughData)?;
    rest.get(..len as usize).ok_or(SendError::NotEnoughData)
}

impl ParseFromResponse for Option<String> {
    /// Create a String out of the received buffer.
    ///
    /// The length of the buffer is read from the first byte of the buffer.
    /// If the length is zero, no string is returned.
    fn from_response(buffer: &[u8]) -> Result<Self, SendError> {
        // The length includes the zero terminator, which some probes omit.
        let data = payload(buffer)?;
        let data = match data.iter().position(|&b| b == 0) {
            Some(end) => &data[..end],
            None => data,
        };

        match data {
            [] => Ok(None),
            data => Ok(Some(std::str::from_utf8(data)?.to_owned())),
        }
    }
}

impl ParseFromResponse for u8 {
    fn from_response(buffer: &[u8]) -> Result<Self, SendError> {
        match payload(buffer)? {
            [value] => Ok(*value),
            _ => Err(SendError::UnexpectedAnswer),
        }
    }
}

impl ParseFromResponse for u16 {
    fn from_response(buffer: &[u8]) -> Result<Self, SendError> {
        let data = payload(buffer)?;
        if data.len() != 2 {
            return Err(SendError::UnexpectedAnswer);
        }
        data.pread_with(0, LE).map_err(|_| SendError::NotEnoughData)
    }
}

/// Features reported by the probe firmware.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub swd_implemented: bool,
    pub jtag_implemented: bool,
    pub swo_uart_implemented: bool,
    pub swo_manchester_implemented: bool,
    pub atomic_commands_implemented: bool,
    pub test_domain_timer_implemented: bool,
    pub swo_streaming_trace_implemented: bool,
}

impl ParseFromResponse for Capabilities {
    fn from_response(buffer: &[u8]) -> Result<Self, SendError> {
        // This response can contain two info bytes.
        // Only the first byte describes debug features, so only that one is parsed.
        match payload(buffer)? {
            [] => Err(SendError::UnexpectedAnswer),
            [bits, ..] => Ok(Capabilities {
                swd_implemented: bits & 0x01 > 0,
                jtag_implemented: bits & 0x02 > 0,
                swo_uart_implemented: bits & 0x04 > 0,
                swo_manchester_implemented: bits & 0x08 > 0,
                atomic_commands_implemented: bits & 0x10 > 0,
                test_domain_timer_implemented: bits & 0x20 > 0,
                swo_streaming_trace_implemented: bits & 0x40 > 0,
            }),
        }
    }
}
