use super::{Ack, ArmError, Register};
use crate::probe::DebugProbeError;

/// The register space addressed by a transfer.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PortType {
    DebugPort,
    AccessPort,
}

impl PortType {
    pub fn is_ap(self) -> bool {
        self == PortType::AccessPort
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TransferDirection {
    Read,
    Write,
}

/// Register offset inside the 16 byte window addressed by one SWD request.
///
/// Only A\[3:2\] are transmitted, so the offset has to be one of 0x0, 0x4, 0x8 or 0xC.
/// AP registers above 0xC are reached by selecting a different bank in
/// [`Select`](super::dp::Select).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct RegisterAddress(u8);

impl RegisterAddress {
    /// The address of a debug port register.
    pub fn of<R: Register>() -> Self {
        RegisterAddress(R::ADDRESS & 0xC)
    }

    /// The raw offset, one of 0x0, 0x4, 0x8 or 0xC.
    pub fn offset(self) -> u8 {
        self.0
    }

    /// Address bit 2.
    pub fn a2(self) -> bool {
        self.0 & 0x4 != 0
    }

    /// Address bit 3.
    pub fn a3(self) -> bool {
        self.0 & 0x8 != 0
    }
}

impl TryFrom<u8> for RegisterAddress {
    type Error = ArmError;

    fn try_from(address: u8) -> Result<Self, Self::Error> {
        if address & !0xC == 0 {
            Ok(RegisterAddress(address))
        } else {
            Err(ArmError::InvalidRegisterAddress(address))
        }
    }
}

impl From<RegisterAddress> for u8 {
    fn from(address: RegisterAddress) -> Self {
        address.0
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TransferKind {
    Read,
    Write(u32),
}

/// A single register access.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TransferRequest {
    pub port: PortType,
    pub address: RegisterAddress,
    pub kind: TransferKind,
}

impl TransferRequest {
    pub fn read(port: PortType, address: RegisterAddress) -> Self {
        Self {
            port,
            address,
            kind: TransferKind::Read,
        }
    }

    pub fn write(port: PortType, address: RegisterAddress, value: u32) -> Self {
        Self {
            port,
            address,
            kind: TransferKind::Write(value),
        }
    }

    pub fn direction(&self) -> TransferDirection {
        match self.kind {
            TransferKind::Read => TransferDirection::Read,
            TransferKind::Write(_) => TransferDirection::Write,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BlockTransferKind {
    Read { count: usize },
    Write(Vec<u32>),
}

/// Repeated accesses to the same register, e.g. DRW with address auto increment.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BlockTransferRequest {
    pub port: PortType,
    pub address: RegisterAddress,
    pub kind: BlockTransferKind,
}

impl BlockTransferRequest {
    pub fn read(port: PortType, address: RegisterAddress, count: usize) -> Self {
        Self {
            port,
            address,
            kind: BlockTransferKind::Read { count },
        }
    }

    pub fn write(port: PortType, address: RegisterAddress, values: Vec<u32>) -> Self {
        Self {
            port,
            address,
            kind: BlockTransferKind::Write(values),
        }
    }

    pub fn direction(&self) -> TransferDirection {
        match self.kind {
            BlockTransferKind::Read { .. } => TransferDirection::Read,
            BlockTransferKind::Write(_) => TransferDirection::Write,
        }
    }

    /// Number of words transferred if every access succeeds.
    pub fn len(&self) -> usize {
        match &self.kind {
            BlockTransferKind::Read { count } => *count,
            BlockTransferKind::Write(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The scalar request for the `index`th word of this block.
    pub(crate) fn nth(&self, index: usize) -> Option<TransferRequest> {
        match &self.kind {
            BlockTransferKind::Read { count } if index < *count => {
                Some(TransferRequest::read(self.port, self.address))
            }
            BlockTransferKind::Write(values) => values
                .get(index)
                .map(|value| TransferRequest::write(self.port, self.address, *value)),
            BlockTransferKind::Read { .. } => None,
        }
    }
}

/// Result of a single [`TransferRequest`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TransferResult {
    pub ack: Ack,
    /// The value read, for successful reads.
    pub value: Option<u32>,
    /// Set by CMSIS-DAP probes when a value match read did not match.
    pub value_mismatch: bool,
}

impl TransferResult {
    pub fn ok(value: Option<u32>) -> Self {
        Self {
            ack: Ack::Ok,
            value,
            value_mismatch: false,
        }
    }

    pub fn with_ack(ack: Ack) -> Self {
        Self {
            ack,
            value: None,
            value_mismatch: false,
        }
    }
}

/// Result of a [`BlockTransferRequest`].
///
/// `executed` counts the accesses that completed with an OK acknowledge. When it is
/// smaller than the requested length, `ack` holds the reason the block stopped.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BlockTransferResult {
    pub ack: Ack,
    /// Values read, in order. Empty for writes.
    pub values: Vec<u32>,
    pub executed: usize,
}

/// Low-level DAP register access, implemented by every probe backend.
///
/// Operations on this trait closely match the transactions on the wire. Acknowledges are
/// reported as values, only I/O failures of the probe itself are errors. Retrying, bank
/// switching and posted read handling are the responsibility of the caller.
pub trait DapTransport {
    /// Perform a single register access.
    fn transfer(&mut self, request: &TransferRequest) -> Result<TransferResult, DebugProbeError>;

    /// Perform repeated accesses to one register, stopping at the first non-OK acknowledge.
    fn transfer_block(
        &mut self,
        request: &BlockTransferRequest,
    ) -> Result<BlockTransferResult, DebugProbeError>;

    /// Largest block accepted by [`transfer_block`](DapTransport::transfer_block), or `None`
    /// if there is no limit.
    fn max_transfer_block(&self, _direction: TransferDirection) -> Option<usize> {
        None
    }

    /// Whether the value of an AP read is returned by the read itself (`false`), or only by the
    /// following transaction (`true`).
    fn posts_ap_reads(&self) -> bool;

    /// Clock out `bit_len` bits on SWDIO, LSB of `bits[0]` first.
    fn raw_out(&mut self, bits: &[u8], bit_len: usize) -> Result<(), DebugProbeError>;

    /// Send everything queued so far and wait until it is on the wire.
    fn flush(&mut self) -> Result<(), DebugProbeError> {
        Ok(())
    }

    /// Drive the target reset line.
    fn reset_target(&mut self, _assert: bool) -> Result<(), DebugProbeError> {
        Err(DebugProbeError::CommandNotSupportedByProbe("reset_target"))
    }
}

impl<T: DapTransport + ?Sized> DapTransport for Box<T> {
    fn transfer(&mut self, request: &TransferRequest) -> Result<TransferResult, DebugProbeError> {
        (**self).transfer(request)
    }

    fn transfer_block(
        &mut self,
        request: &BlockTransferRequest,
    ) -> Result<BlockTransferResult, DebugProbeError> {
        (**self).transfer_block(request)
    }

    fn max_transfer_block(&self, direction: TransferDirection) -> Option<usize> {
        (**self).max_transfer_block(direction)
    }

    fn posts_ap_reads(&self) -> bool {
        (**self).posts_ap_reads()
    }

    fn raw_out(&mut self, bits: &[u8], bit_len: usize) -> Result<(), DebugProbeError> {
        (**self).raw_out(bits, bit_len)
    }

    fn flush(&mut self) -> Result<(), DebugProbeError> {
        (**self).flush()
    }

    fn reset_target(&mut self, assert: bool) -> Result<(), DebugProbeError> {
        (**self).reset_target(assert)
    }
}
