use super::{write_bytes, CommandId, Request, SendError};
use crate::architecture::arm::{
    self, Ack, BlockTransferKind, BlockTransferRequest, BlockTransferResult, PortType,
    RegisterAddress, TransferDirection, TransferKind, TransferResult,
};
use scroll::{Pread, LE};
use std::cmp::Ordering;

/// Bytes of a DAP_Transfer command or response before the first transfer.
pub(crate) const TRANSFER_HEADER_LEN: usize = 3;

/// Bit 4 of the acknowledge byte, set when a value match read did not match.
const VALUE_MISMATCH: u8 = 0x10;

/// The request byte shared by DAP_Transfer and DAP_TransferBlock.
fn control_byte(port: PortType, direction: TransferDirection, address: RegisterAddress) -> u8 {
    (port.is_ap() as u8)
        | ((direction == TransferDirection::Read) as u8) << 1
        | (address.a2() as u8) << 2
        | (address.a3() as u8) << 3
}

/// Contains information about requested access from host debugger.
#[derive(Clone, Debug, PartialEq, Eq)]
struct InnerTransferRequest {
    control: u8,
    /// Contains the optional data word, only present for register writes.
    data: Option<u32>,
}

impl InnerTransferRequest {
    fn new(request: &arm::TransferRequest) -> Self {
        let data = match request.kind {
            TransferKind::Read => None,
            TransferKind::Write(value) => Some(value),
        };

        Self {
            control: control_byte(request.port, request.direction(), request.address),
            data,
        }
    }

    fn is_read(&self) -> bool {
        self.data.is_none()
    }

    fn to_bytes(&self, buffer: &mut [u8], offset: usize) -> Result<usize, SendError> {
        write_bytes(buffer, offset, &[self.control])?;
        match self.data {
            Some(data) => {
                write_bytes(buffer, offset + 1, &data.to_le_bytes())?;
                Ok(5)
            }
            None => Ok(1),
        }
    }
}

/// Space used by `request` in a DAP_Transfer command, and in its response.
pub(crate) fn transfer_len(request: &arm::TransferRequest) -> (usize, usize) {
    match request.kind {
        TransferKind::Read => (1, 4),
        TransferKind::Write(_) => (5, 0),
    }
}

/// Read/write single and multiple registers.
///
/// The DAP_Transfer Command reads or writes data to CoreSight registers.
/// Each CoreSight register is accessed with a single 32-bit read or write.
/// The CoreSight registers are addressed with DPBANKSEL/APBANKSEL and address lines A2, A3 (A0 = 0 and A1 = 0).
/// This command executes several read/write operations on the selected DP/AP registers.
/// The Transfer Data in the Response are in the order of the Transfer Request in the Command but might be shorter in case of communication failures.
/// The data transfer is aborted on a communication error:
///
/// - Protocol Error
/// - Target FAULT response
/// - Target WAIT responses exceed configured value
/// - Value Mismatch (Read Register with Value Match)
#[derive(Debug)]
pub struct TransferRequest {
    /// Zero based device index of the selected JTAG device. For SWD mode the value is ignored.
    dap_index: u8,
    transfers: Vec<InnerTransferRequest>,
}

impl TransferRequest {
    pub fn new(requests: &[arm::TransferRequest]) -> Self {
        Self {
            dap_index: 0,
            transfers: requests.iter().map(InnerTransferRequest::new).collect(),
        }
    }

    /// Map the response to one result per requested transfer.
    ///
    /// The probe reports how many transfers completed, and the acknowledge of the
    /// last one it attempted. Transfers after that one were not executed.
    fn results(
        &self,
        executed: usize,
        response: u8,
        mut data: &[u8],
    ) -> Result<Vec<TransferResult>, SendError> {
        let last_ack = Ack::from_dap_response(response);
        let value_mismatch = response & VALUE_MISMATCH != 0;
        let count = self.transfers.len();

        // The transfer the last acknowledge belongs to.
        let last = executed.min(count.saturating_sub(1));

        let mut results = Vec::with_capacity(count);

        for (i, transfer) in self.transfers.iter().enumerate() {
            let ack = match i.cmp(&executed) {
                // A fully executed batch can still end on a non-OK acknowledge.
                Ordering::Less if i == last => last_ack,
                Ordering::Less => Ack::Ok,
                // Stopped without a failing acknowledge, e.g. on a value mismatch.
                Ordering::Equal if last_ack.is_ok() => Ack::NotExecuted,
                Ordering::Equal => last_ack,
                Ordering::Greater => Ack::NotExecuted,
            };

            let mut result = TransferResult::with_ack(ack);
            result.value_mismatch = value_mismatch && i == last;

            if ack.is_ok() && transfer.is_read() {
                let value = data
                    .pread_with::<u32>(0, LE)
                    .map_err(|_| SendError::NotEnoughData)?;
                data = &data[4..];
                result.value = Some(value);
            }

            results.push(result);
        }

        Ok(results)
    }
}

impl Request for TransferRequest {
    const COMMAND_ID: CommandId = CommandId::Transfer;

    type Response = Vec<TransferResult>;

    fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, SendError> {
        let count = u8::try_from(self.transfers.len()).map_err(|_| SendError::RequestTooLarge)?;
        write_bytes(buffer, 0, &[self.dap_index, count])?;

        let mut size = 2;
        for transfer in self.transfers.iter() {
            size += transfer.to_bytes(buffer, size)?;
        }

        Ok(size)
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, SendError> {
        if buffer.len() < 2 {
            return Err(SendError::NotEnoughData);
        }
        let executed = buffer[0] as usize;
        if executed > self.transfers.len() {
            tracing::error!("Transfer count larger than requested number of transfers");
            return Err(SendError::UnexpectedAnswer);
        }

        self.results(executed, buffer[1], &buffer[2..])
    }
}

/// Repeated accesses to a single register, with a two byte transfer count.
#[derive(Debug)]
pub(crate) struct TransferBlockRequest {
    /// Zero-based device index of the selected JTAG device. For SWD mode the
    /// value is ignored.
    dap_index: u8,
    /// Number of transfers
    transfer_count: u16,

    control: u8,

    /// Register values to write for writes
    transfer_data: Vec<u32>,
}

impl TransferBlockRequest {
    /// Bytes of the command before the first data word, including the command ID.
    pub const WRITE_OVERHEAD: usize = 5;
    /// Bytes of the response before the first data word, including the command ID.
    pub const READ_OVERHEAD: usize = 4;

    pub(crate) fn new(request: &BlockTransferRequest) -> Result<Self, SendError> {
        let transfer_count = u16::try_from(request.len()).map_err(|_| SendError::RequestTooLarge)?;
        let transfer_data = match &request.kind {
            BlockTransferKind::Read { .. } => Vec::new(),
            BlockTransferKind::Write(values) => values.clone(),
        };

        Ok(TransferBlockRequest {
            dap_index: 0,
            transfer_count,
            control: control_byte(request.port, request.direction(), request.address),
            transfer_data,
        })
    }

    fn is_read(&self) -> bool {
        self.control & 0x02 != 0
    }
}

impl Request for TransferBlockRequest {
    const COMMAND_ID: CommandId = CommandId::TransferBlock;

    type Response = BlockTransferResult;

    fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, SendError> {
        write_bytes(buffer, 0, &[self.dap_index])?;
        write_bytes(buffer, 1, &self.transfer_count.to_le_bytes())?;
        write_bytes(buffer, 3, &[self.control])?;

        let mut size = 4;
        for word in &self.transfer_data {
            write_bytes(buffer, size, &word.to_le_bytes())?;
            size += 4;
        }

        Ok(size)
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, SendError> {
        let transfer_count: u16 = buffer
            .pread_with(0, LE)
            .map_err(|_| SendError::NotEnoughData)?;
        let transfer_response: u8 = buffer
            .pread_with(2, LE)
            .map_err(|_| SendError::NotEnoughData)?;

        if transfer_count > self.transfer_count {
            tracing::error!("Block transfer count larger than requested");
            return Err(SendError::UnexpectedAnswer);
        }

        // If it's a read, process the read data.
        // If it's a write, there's no interesting data in the response.
        let mut values = Vec::new();
        if self.is_read() {
            values.reserve(transfer_count as usize);
            for index in 0..transfer_count as usize {
                values.push(
                    buffer
                        .pread_with::<u32>(3 + index * 4, LE)
                        .map_err(|_| SendError::NotEnoughData)?,
                );
            }
        }

        Ok(BlockTransferResult {
            ack: Ack::from_dap_response(transfer_response),
            values,
            executed: transfer_count as usize,
        })
    }
}
