use super::{
    dp::{Abort, RdBuff, Select, DPIDR},
    sequences::swd_line_reset,
    Ack, BlockTransferRequest, DapTransport, PortType, ProtocolError, Register, RegisterAddress,
    TransferDirection, TransferRequest, TransferResult,
};
use crate::probe::DebugProbeError;

/// How often the line reset is attempted before giving up on the target.
const LINE_RESET_ATTEMPTS: usize = 2;

/// An acknowledge other than OK, as seen by users of [`Adiv5Swd`].
#[derive(thiserror::Error, docsplay::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DapError {
    /// Target device responded with a WAIT response to the request.
    WaitResponse,
    /// Target device responded with a FAULT response to the request.
    FaultResponse,
    /// Protocol error on the SWD line.
    Protocol(#[from] ProtocolError),
}

impl DapError {
    /// Map an acknowledge to an error, `None` for [`Ack::Ok`].
    pub fn from_ack(ack: Ack) -> Option<Self> {
        match ack {
            Ack::Ok => None,
            Ack::Wait => Some(DapError::WaitResponse),
            Ack::Fault => Some(DapError::FaultResponse),
            Ack::Protocol(error) => Some(DapError::Protocol(error)),
            Ack::NotExecuted => Some(DapError::Protocol(ProtocolError::NotExecuted)),
        }
    }
}

#[derive(thiserror::Error, docsplay::Display, Debug)]
pub enum ArmError {
    /// An error occurred in the communication with the target.
    Dap(#[from] DapError),

    /// No SWD connection after {attempts} line reset attempts.
    Connection {
        attempts: usize,
        #[source]
        source: DapError,
    },

    /// The block transfer stopped after {executed} of {requested} words.
    #[ignore_extra_doc_attributes]
    ///
    /// For reads, `values` holds the words that were read successfully, in order.
    PartialTransfer {
        requested: usize,
        executed: usize,
        values: Vec<u32>,
        #[source]
        source: DapError,
    },

    /// Register address {0:#x} is not one of 0x0, 0x4, 0x8 or 0xC.
    InvalidRegisterAddress(u8),

    /// An error occurred while using the probe.
    Probe(#[from] DebugProbeError),
}

impl ArmError {
    /// The acknowledge error behind this error, if the target caused it.
    pub fn dap_error(&self) -> Option<DapError> {
        match self {
            ArmError::Dap(error)
            | ArmError::Connection { source: error, .. }
            | ArmError::PartialTransfer { source: error, .. } => Some(*error),
            ArmError::InvalidRegisterAddress(_) | ArmError::Probe(_) => None,
        }
    }
}

/// Where an [`Adiv5Swd`] session is in the connection sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Uninitialized,
    /// A line reset was sent, DPIDR has not been read yet.
    LineReset,
    /// DPIDR was read, sticky errors and SELECT are not initialized yet.
    Connected,
    Operational,
}

/// Debug port state which cannot be read back from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DpState {
    /// The value last written to SELECT. `None` until it is known.
    pub select: Option<Select>,
    /// DPIDR as read during the last line reset.
    pub dpidr: Option<DPIDR>,
}

/// An SWD session with one target, on top of any [`DapTransport`].
///
/// Creating the session switches the target to SWD and initializes the debug port.
/// Afterwards, DP and AP registers can be read and written. AP reads are posted on the
/// wire; this is resolved here so callers always get the value of the register they read.
///
/// Acknowledges other than OK are returned as [`ArmError::Dap`]. WAIT is never retried, and a
/// FAULT leaves the sticky error flags set until [`Adiv5Swd::clear_sticky_errors`] is called.
///
/// The session needs exclusive access to the probe. To share it between threads, wrap it
/// in a `Mutex`.
#[derive(Debug)]
pub struct Adiv5Swd<P> {
    transport: P,
    state: LinkState,
    dp: DpState,
}

impl<P: DapTransport> Adiv5Swd<P> {
    /// Switch the target to SWD and bring the debug port into a known state.
    ///
    /// Fails with [`ArmError::Connection`] if DPIDR cannot be read after two line resets.
    #[tracing::instrument(skip_all)]
    pub fn new(transport: P) -> Result<Self, ArmError> {
        let mut session = Self {
            transport,
            state: LinkState::Uninitialized,
            dp: DpState::default(),
        };

        session.connect()?;

        Ok(session)
    }

    /// Repeat the connection sequence, e.g. after a protocol error.
    pub fn resync(&mut self) -> Result<DPIDR, ArmError> {
        tracing::info!("Resynchronizing SWD link");
        self.connect()
    }

    fn connect(&mut self) -> Result<DPIDR, ArmError> {
        self.dp = DpState::default();

        let dpidr = self.line_reset()?;
        self.dp.dpidr = Some(dpidr);
        self.state = LinkState::Connected;

        self.clear_sticky_errors()?;
        self.write_select(Select::from(0))?;
        self.transport.flush()?;

        self.state = LinkState::Operational;

        Ok(dpidr)
    }

    /// Send the line reset and read DPIDR, retrying once if the target does not answer.
    fn line_reset(&mut self) -> Result<DPIDR, ArmError> {
        let request = TransferRequest::read(PortType::DebugPort, RegisterAddress::of::<DPIDR>());
        let mut last_error = DapError::Protocol(ProtocolError::NotExecuted);

        for attempt in 1..=LINE_RESET_ATTEMPTS {
            self.state = LinkState::LineReset;
            swd_line_reset(&mut self.transport)?;

            let result = self.transport.transfer(&request)?;
            match check_read(result) {
                Ok(value) => {
                    let dpidr = DPIDR::from(value);
                    tracing::debug!("Read DPIDR {:#010x} on attempt {}", value, attempt);
                    return Ok(dpidr);
                }
                Err(error) => {
                    tracing::warn!("Reading DPIDR failed on attempt {}: {}", attempt, error);
                    last_error = error;
                }
            }
        }

        Err(ArmError::Connection {
            attempts: LINE_RESET_ATTEMPTS,
            source: last_error,
        })
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn dp_state(&self) -> &DpState {
        &self.dp
    }

    /// DPIDR read while connecting.
    pub fn dpidr(&self) -> u32 {
        self.dp.dpidr.map(u32::from).unwrap_or_default()
    }

    pub fn transport(&self) -> &P {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut P {
        &mut self.transport
    }

    pub fn into_transport(self) -> P {
        self.transport
    }

    /// Read one register.
    pub fn read(&mut self, port: PortType, address: RegisterAddress) -> Result<u32, ArmError> {
        let result = self
            .transport
            .transfer(&TransferRequest::read(port, address))?;
        let value = check_read(result)?;

        if port.is_ap() && self.transport.posts_ap_reads() {
            // The value belongs to whatever AP read came before.
            tracing::trace!("Discarding posted value {:#010x}", value);
            return self.read_rdbuff();
        }

        Ok(value)
    }

    /// Read `count` values from the same register.
    ///
    /// On failure, [`ArmError::PartialTransfer`] holds the values read up to that point.
    pub fn read_block(
        &mut self,
        port: PortType,
        address: RegisterAddress,
        count: usize,
    ) -> Result<Vec<u32>, ArmError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let posted = port.is_ap() && self.transport.posts_ap_reads();
        let chunk_size = self.chunk_size(TransferDirection::Read, count);

        let mut values = Vec::with_capacity(count);
        let mut remaining = count;

        while remaining > 0 {
            let len = remaining.min(chunk_size);
            let result = self
                .transport
                .transfer_block(&BlockTransferRequest::read(port, address, len))?;

            values.extend(result.values.into_iter().take(result.executed));

            if let Some(error) = block_error(result.ack, result.executed, len) {
                if posted && !values.is_empty() {
                    values.remove(0);
                }
                return Err(ArmError::PartialTransfer {
                    requested: count,
                    executed: values.len(),
                    values,
                    source: error,
                });
            }

            remaining -= len;
        }

        if posted {
            // Every value is shifted by one transaction, the last one is in RDBUFF.
            values.remove(0);
            match self.read_rdbuff() {
                Ok(value) => values.push(value),
                Err(ArmError::Dap(error)) => {
                    return Err(ArmError::PartialTransfer {
                        requested: count,
                        executed: values.len(),
                        values,
                        source: error,
                    })
                }
                Err(other) => return Err(other),
            }
        }

        Ok(values)
    }

    /// Write one register.
    pub fn write(
        &mut self,
        port: PortType,
        address: RegisterAddress,
        value: u32,
    ) -> Result<(), ArmError> {
        let result = self
            .transport
            .transfer(&TransferRequest::write(port, address, value))?;

        match DapError::from_ack(result.ack) {
            None => Ok(()),
            Some(error) => Err(error.into()),
        }
    }

    /// Write all `values` to the same register, in order.
    pub fn write_block(
        &mut self,
        port: PortType,
        address: RegisterAddress,
        values: &[u32],
    ) -> Result<(), ArmError> {
        let chunk_size = self.chunk_size(TransferDirection::Write, values.len());
        let mut executed = 0;

        for chunk in values.chunks(chunk_size) {
            let result = self.transport.transfer_block(&BlockTransferRequest::write(
                port,
                address,
                chunk.to_vec(),
            ))?;

            executed += result.executed.min(chunk.len());

            if let Some(error) = block_error(result.ack, result.executed, chunk.len()) {
                return Err(ArmError::PartialTransfer {
                    requested: values.len(),
                    executed,
                    values: Vec::new(),
                    source: error,
                });
            }
        }

        Ok(())
    }

    /// Select the access port and register bank used by following AP transfers.
    ///
    /// SELECT is only written if the value differs from the one written last.
    pub fn select_ap_bank(&mut self, ap: u8, bank: u8) -> Result<(), ArmError> {
        let mut select = Select::from(0);
        select.set_ap_sel(ap);
        select.set_ap_bank_sel(bank);

        if self.dp.select == Some(select) {
            return Ok(());
        }

        self.write_select(select)
    }

    fn write_select(&mut self, select: Select) -> Result<(), ArmError> {
        tracing::debug!("Writing {}: {:?}", Select::NAME, select);

        // After a failed write, the register content is unknown.
        self.dp.select = None;
        self.write(
            PortType::DebugPort,
            RegisterAddress::of::<Select>(),
            select.into(),
        )?;
        self.dp.select = Some(select);

        Ok(())
    }

    /// Clear all sticky error flags of the debug port by writing ABORT.
    pub fn clear_sticky_errors(&mut self) -> Result<(), ArmError> {
        self.write(
            PortType::DebugPort,
            RegisterAddress::of::<Abort>(),
            Abort::clear_sticky().into(),
        )
    }

    /// Assert or release the target reset line.
    pub fn reset_target(&mut self, assert: bool) -> Result<(), ArmError> {
        self.transport.reset_target(assert)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ArmError> {
        self.transport.flush()?;
        Ok(())
    }

    fn read_rdbuff(&mut self) -> Result<u32, ArmError> {
        let result = self.transport.transfer(&TransferRequest::read(
            PortType::DebugPort,
            RegisterAddress::of::<RdBuff>(),
        ))?;
        Ok(check_read(result)?)
    }

    fn chunk_size(&self, direction: TransferDirection, len: usize) -> usize {
        self.transport
            .max_transfer_block(direction)
            .unwrap_or(len)
            .max(1)
    }
}

/// Turn the result of a read into its value.
fn check_read(result: TransferResult) -> Result<u32, DapError> {
    if let Some(error) = DapError::from_ack(result.ack) {
        return Err(error);
    }
    result
        .value
        .ok_or(DapError::Protocol(ProtocolError::SwdProtocol))
}

/// The reason a block stopped early, if it did.
fn block_error(ack: Ack, executed: usize, requested: usize) -> Option<DapError> {
    match DapError::from_ack(ack) {
        Some(error) => Some(error),
        None if executed < requested => {
            Some(DapError::Protocol(ProtocolError::NotExecuted))
        }
        None => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::probe::arm_debug_interface::{parity, SwdLink};
    use crate::probe::cmsisdap::{test::MockChannel, CmsisDap};
    use crate::probe::mock::{BitOp, MockBitTransport};
    use pretty_assertions::assert_eq;

    const DPIDR_VALUE: u32 = 0x2BA0_1477;

    const DP_READ_DPIDR: u8 = 0xA5;
    const DP_WRITE_ABORT: u8 = 0x81;
    const DP_WRITE_SELECT: u8 = 0xB1;
    const DP_READ_RDBUFF: u8 = 0xBD;
    const AP_READ_0: u8 = 0x87;
    const AP_READ_C: u8 = 0x9F;

    fn expect_line_reset(mock: &mut MockBitTransport) {
        mock.expect(BitOp::RawOut(vec![0xFF; 7], 56))
            .expect(BitOp::RawOut(vec![0x9E, 0xE7], 16))
            .expect(BitOp::RawOut(vec![0xFF; 7], 56))
            .expect(BitOp::RawOut(vec![0x00], 8))
            .expect(BitOp::Flush);
    }

    fn expect_read(mock: &mut MockBitTransport, request: u8, value: u32) {
        mock.expect(BitOp::WriteCmd {
            request,
            ack: Ack::OK,
        })
        .expect(BitOp::ReadWord(value, parity(value)));
    }

    fn expect_write(mock: &mut MockBitTransport, request: u8, value: u32) {
        mock.expect(BitOp::WriteCmd {
            request,
            ack: Ack::OK,
        })
        .expect(BitOp::WriteWord(value, parity(value)));
    }

    fn expect_init(mock: &mut MockBitTransport) {
        expect_write(mock, DP_WRITE_ABORT, 0x1E);
        expect_write(mock, DP_WRITE_SELECT, 0);
        mock.expect(BitOp::Flush);
    }

    fn connected_session(mut mock: MockBitTransport) -> Adiv5Swd<SwdLink<MockBitTransport>> {
        let mut setup = MockBitTransport::new();
        expect_line_reset(&mut setup);
        expect_read(&mut setup, DP_READ_DPIDR, DPIDR_VALUE);
        expect_init(&mut setup);

        setup.append(&mut mock);
        Adiv5Swd::new(SwdLink::new(setup)).unwrap()
    }

    fn address(offset: u8) -> RegisterAddress {
        RegisterAddress::try_from(offset).unwrap()
    }

    #[test]
    fn connect_sequence() {
        let session = connected_session(MockBitTransport::new());

        assert_eq!(session.state(), LinkState::Operational);
        assert_eq!(session.dpidr(), DPIDR_VALUE);
        assert_eq!(session.dp_state().select, Some(Select::from(0)));
    }

    #[test]
    fn line_reset_is_retried_once() {
        let mut mock = MockBitTransport::new();
        expect_line_reset(&mut mock);
        mock.expect(BitOp::WriteCmd {
            request: DP_READ_DPIDR,
            ack: 0b111,
        })
        .expect(BitOp::ReadWord(0xFFFF_FFFF, true));
        expect_line_reset(&mut mock);
        expect_read(&mut mock, DP_READ_DPIDR, DPIDR_VALUE);
        expect_init(&mut mock);

        let session = Adiv5Swd::new(SwdLink::new(mock)).unwrap();
        assert_eq!(session.dpidr(), DPIDR_VALUE);
    }

    #[test]
    fn connection_error_after_second_failed_line_reset() {
        let mut mock = MockBitTransport::new();
        expect_line_reset(&mut mock);
        mock.expect(BitOp::WriteCmd {
            request: DP_READ_DPIDR,
            ack: Ack::WAIT,
        });
        expect_line_reset(&mut mock);
        mock.expect(BitOp::WriteCmd {
            request: DP_READ_DPIDR,
            ack: Ack::FAULT,
        });

        let error = Adiv5Swd::new(SwdLink::new(mock)).unwrap_err();
        assert!(matches!(
            error,
            ArmError::Connection {
                attempts: 2,
                source: DapError::FaultResponse
            }
        ));
    }

    #[test]
    fn ap_read_returns_value_from_rdbuff() {
        let mut mock = MockBitTransport::new();
        expect_read(&mut mock, AP_READ_0, 0x1111_1111);
        expect_read(&mut mock, DP_READ_RDBUFF, 0x2222_2222);

        let mut session = connected_session(mock);
        let value = session.read(PortType::AccessPort, address(0)).unwrap();

        assert_eq!(value, 0x2222_2222);
    }

    #[test]
    fn dp_read_is_not_posted() {
        let mut mock = MockBitTransport::new();
        expect_read(&mut mock, 0x8D, 0xF000_0040);

        let mut session = connected_session(mock);
        let value = session.read(PortType::DebugPort, address(4)).unwrap();

        assert_eq!(value, 0xF000_0040);
    }

    #[test]
    fn ap_block_read_drops_first_value_and_appends_rdbuff() {
        let mut mock = MockBitTransport::new();
        expect_read(&mut mock, AP_READ_C, 0xDEAD_BEEF);
        expect_read(&mut mock, AP_READ_C, 3);
        expect_read(&mut mock, AP_READ_C, 4);
        expect_read(&mut mock, DP_READ_RDBUFF, 5);

        let mut session = connected_session(mock);
        let values = session
            .read_block(PortType::AccessPort, address(0xC), 3)
            .unwrap();

        assert_eq!(values, vec![3, 4, 5]);
    }

    #[test]
    fn block_read_stops_at_fault() {
        let mut mock = MockBitTransport::new();
        expect_read(&mut mock, 0x8D, 1);
        expect_read(&mut mock, 0x8D, 2);
        mock.expect(BitOp::WriteCmd {
            request: 0x8D,
            ack: Ack::FAULT,
        });

        let mut session = connected_session(mock);
        let error = session
            .read_block(PortType::DebugPort, address(4), 4)
            .unwrap_err();

        match error {
            ArmError::PartialTransfer {
                requested,
                executed,
                values,
                source,
            } => {
                assert_eq!(requested, 4);
                assert_eq!(executed, 2);
                assert_eq!(values, vec![1, 2]);
                assert_eq!(source, DapError::FaultResponse);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn wait_is_reported_without_retry() {
        let mut mock = MockBitTransport::new();
        mock.expect(BitOp::WriteCmd {
            request: 0x8D,
            ack: Ack::WAIT,
        });

        let mut session = connected_session(mock);
        let error = session.read(PortType::DebugPort, address(4)).unwrap_err();

        assert_eq!(error.dap_error(), Some(DapError::WaitResponse));
    }

    #[test]
    fn parity_error_is_a_protocol_error() {
        let mut mock = MockBitTransport::new();
        mock.expect(BitOp::WriteCmd {
            request: 0x8D,
            ack: Ack::OK,
        })
        .expect(BitOp::ReadWord(0x1, false));

        let mut session = connected_session(mock);
        let error = session.read(PortType::DebugPort, address(4)).unwrap_err();

        assert_eq!(
            error.dap_error(),
            Some(DapError::Protocol(ProtocolError::IncorrectParity))
        );
    }

    #[test]
    fn select_is_cached() {
        let mut mock = MockBitTransport::new();
        expect_write(&mut mock, DP_WRITE_SELECT, 0x0100_00F0);

        let mut session = connected_session(mock);
        session.select_ap_bank(1, 0xF).unwrap();
        session.select_ap_bank(1, 0xF).unwrap();

        assert_eq!(session.dp_state().select, Some(Select::from(0x0100_00F0)));
    }

    #[test]
    fn resync_repeats_the_connection_sequence() {
        let mut mock = MockBitTransport::new();
        expect_line_reset(&mut mock);
        expect_read(&mut mock, DP_READ_DPIDR, DPIDR_VALUE);
        expect_init(&mut mock);

        let mut session = connected_session(mock);
        let dpidr = session.resync().unwrap();

        assert_eq!(u32::from(dpidr), DPIDR_VALUE);
        assert_eq!(session.state(), LinkState::Operational);
    }

    /// The packets sent by `Adiv5Swd::new` over a CMSIS-DAP probe.
    fn expect_cmsis_dap_connect(channel: &mut MockChannel) {
        channel.expect_line_reset();
        // DAP_Transfer, one DP read of DPIDR.
        channel.expect(
            vec![0x05, 0x00, 0x01, 0x02],
            [vec![0x05, 0x01, 0x01], DPIDR_VALUE.to_le_bytes().to_vec()].concat(),
        );
        // ABORT = 0x1E, SELECT = 0.
        channel.expect(
            vec![0x05, 0x00, 0x01, 0x00, 0x1E, 0x00, 0x00, 0x00],
            vec![0x05, 0x01, 0x01],
        );
        channel.expect(
            vec![0x05, 0x00, 0x01, 0x08, 0x00, 0x00, 0x00, 0x00],
            vec![0x05, 0x01, 0x01],
        );
    }

    /// A DAP_TransferBlock write of `words` to AP register 0xC.
    fn block_write_request(words: &[u32]) -> Vec<u8> {
        let mut request = vec![0x06, 0x00];
        request.extend_from_slice(&(words.len() as u16).to_le_bytes());
        request.push(0x0D);
        for word in words {
            request.extend_from_slice(&word.to_le_bytes());
        }
        request
    }

    /// A DAP_TransferBlock read of `len` words from AP register 0xC.
    fn block_read_request(len: usize) -> Vec<u8> {
        let mut request = vec![0x06, 0x00];
        request.extend_from_slice(&(len as u16).to_le_bytes());
        request.push(0x0F);
        request
    }

    fn block_reply(executed: usize, ack: u8, words: &[u32]) -> Vec<u8> {
        let mut reply = vec![0x06];
        reply.extend_from_slice(&(executed as u16).to_le_bytes());
        reply.push(ack);
        for word in words {
            reply.extend_from_slice(&word.to_le_bytes());
        }
        reply
    }

    #[test]
    fn cmsis_dap_block_write_stops_after_a_faulting_chunk() {
        let values: Vec<u32> = (0..30).map(|i| 0x1000 + i).collect();

        let mut channel = MockChannel::new(64);
        expect_cmsis_dap_connect(&mut channel);
        // 14 words fit into a 64 byte write packet. The second chunk faults
        // after three words, the last two words are never sent.
        channel
            .expect(block_write_request(&values[..14]), block_reply(14, 0x01, &[]))
            .expect(block_write_request(&values[14..28]), block_reply(3, 0x04, &[]));

        let probe = CmsisDap::with_packet_size(channel, 64);
        let mut session = Adiv5Swd::new(probe).unwrap();
        let error = session
            .write_block(PortType::AccessPort, address(0xC), &values)
            .unwrap_err();

        match error {
            ArmError::PartialTransfer {
                requested,
                executed,
                values,
                source,
            } => {
                assert_eq!(requested, 30);
                assert_eq!(executed, 17);
                assert!(values.is_empty());
                assert!(matches!(source, DapError::FaultResponse));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cmsis_dap_block_write_in_one_chunk() {
        let values = [0xDEAD_BEEF, 0x0123_4567, 0x89AB_CDEF];

        let mut channel = MockChannel::new(64);
        expect_cmsis_dap_connect(&mut channel);
        channel.expect(block_write_request(&values), block_reply(3, 0x01, &[]));

        let probe = CmsisDap::with_packet_size(channel, 64);
        let mut session = Adiv5Swd::new(probe).unwrap();
        session
            .write_block(PortType::AccessPort, address(0xC), &values)
            .unwrap();
    }

    #[test]
    fn cmsis_dap_block_read_stops_at_a_short_chunk() {
        let first: Vec<u32> = (0..15).collect();

        let mut channel = MockChannel::new(64);
        expect_cmsis_dap_connect(&mut channel);
        // The second chunk only gets two words before the target answers WAIT.
        channel
            .expect(block_read_request(15), block_reply(15, 0x01, &first))
            .expect(block_read_request(15), block_reply(2, 0x02, &[15, 16]));

        let probe = CmsisDap::with_packet_size(channel, 64);
        let mut session = Adiv5Swd::new(probe).unwrap();
        let error = session
            .read_block(PortType::AccessPort, address(0xC), 40)
            .unwrap_err();

        match error {
            ArmError::PartialTransfer {
                requested,
                executed,
                values,
                source,
            } => {
                assert_eq!(requested, 40);
                assert_eq!(executed, 17);
                assert_eq!(values, (0..17).collect::<Vec<u32>>());
                assert!(matches!(source, DapError::WaitResponse));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cmsis_dap_block_read_is_chunked_by_packet_size() {
        let mut channel = MockChannel::new(64);
        expect_cmsis_dap_connect(&mut channel);

        let mut expected = Vec::new();
        let mut next = 0u32;
        let mut remaining = 200usize;
        let mut chunks = 0;
        while remaining > 0 {
            let len = remaining.min(15);
            let words: Vec<u32> = (next..next + len as u32).collect();
            channel.expect(block_read_request(len), block_reply(len, 0x01, &words));

            expected.extend(words);
            next += len as u32;
            remaining -= len;
            chunks += 1;
        }
        assert_eq!(chunks, 14);

        let probe = CmsisDap::with_packet_size(channel, 64);
        let mut session = Adiv5Swd::new(probe).unwrap();
        let values = session
            .read_block(PortType::AccessPort, address(0xC), 200)
            .unwrap();

        assert_eq!(values, expected);
    }
}
