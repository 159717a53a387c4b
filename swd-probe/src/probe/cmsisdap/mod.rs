//! CMSIS-DAP probe implementation.
pub mod commands;
mod tools;

use std::fmt;

use commands::{
    general::{
        connect::{ConnectRequest, ConnectResponse},
        info::{
            CapabilitiesCommand, FirmwareVersionCommand, PacketCountCommand, PacketSizeCommand,
            ProductIdCommand, SerialNumberCommand, TargetDeviceNameCommand,
            TargetDeviceVendorCommand, VendorCommand,
        },
    },
    swj::{
        clock::SwjClockRequest,
        pins::SwjPinsRequestBuilder,
        sequence::{SequenceRequest, MAX_SEQUENCE_BITS},
    },
    transfer::{transfer_len, TransferBlockRequest, TransferRequest, TRANSFER_HEADER_LEN},
    CmsisDapError, CommandId, Request, SendError,
};

pub use commands::general::info::Capabilities;
pub use commands::DapChannel;
pub use tools::UsbChannel;

use crate::architecture::arm::{
    self, sequences, Ack, BlockTransferRequest, BlockTransferResult, DapTransport,
    TransferDirection, TransferResult,
};
use crate::probe::{BackendConfig, BackendConfigError, DebugProbeError};

/// Packet size used until the probe reports its own, the report size of a full speed HID device.
const DEFAULT_PACKET_SIZE: usize = 64;

/// Attempts at querying the packet size, to get past stale replies after a restart.
const PACKET_SIZE_ATTEMPTS: usize = 16;

/// DAP_Transfer encodes the number of transfers in a single byte.
const MAX_TRANSFERS_PER_PACKET: usize = 255;

/// Options understood by the `cmsis-dap` backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmsisDapOptions {
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial: Option<String>,
    /// SWD clock in kHz. The firmware default is used if not set.
    pub speed_khz: Option<u32>,
    /// Assert the target reset line after connecting.
    pub reset: bool,
}

impl CmsisDapOptions {
    const KNOWN_KEYS: [&'static str; 5] = ["vid", "pid", "serial", "speed", "reset"];

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendConfigError> {
        for (key, value) in config.options() {
            if !Self::KNOWN_KEYS.contains(&key) {
                tracing::warn!("Ignoring unknown CMSIS-DAP option {}={}", key, value);
            }
        }

        Ok(CmsisDapOptions {
            vid: config.integer_as("vid")?,
            pid: config.integer_as("pid")?,
            serial: config.text("serial").map(str::to_owned),
            speed_khz: config.integer_as("speed")?,
            reset: config.flag("reset")?,
        })
    }
}

/// What the probe reported about itself while attaching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeInfo {
    pub vendor: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
    pub firmware_version: Option<String>,
    pub target_vendor: Option<String>,
    pub target_device: Option<String>,
    pub capabilities: Capabilities,
    /// How many packets the probe can buffer.
    pub packet_count: u8,
    pub packet_size: u16,
}

impl fmt::Display for ProbeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unknown = "unknown";
        write!(
            f,
            "{} {} (serial: {}, firmware: {}, packet size: {}, packets: {})",
            self.vendor.as_deref().unwrap_or(unknown),
            self.product.as_deref().unwrap_or(unknown),
            self.serial.as_deref().unwrap_or(unknown),
            self.firmware_version.as_deref().unwrap_or(unknown),
            self.packet_size,
            self.packet_count,
        )
    }
}

/// A CMSIS-DAP probe, talking SWD to the target.
pub struct CmsisDap<D = UsbChannel> {
    channel: D,
    packet_size: usize,
    info: ProbeInfo,
}

impl<D> fmt::Debug for CmsisDap<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmsisDap")
            .field("packet_size", &self.packet_size)
            .field("info", &self.info)
            .finish()
    }
}

impl CmsisDap<UsbChannel> {
    /// Open the first matching USB probe and connect it to the target.
    #[tracing::instrument(skip_all)]
    pub fn open(options: &CmsisDapOptions) -> Result<Self, DebugProbeError> {
        let channel = tools::open_device(options)?;
        Self::attach(channel, options)
    }
}

impl<D: DapChannel> CmsisDap<D> {
    /// Wrap a channel with a known packet size, without any setup.
    pub fn with_packet_size(channel: D, packet_size: usize) -> Self {
        CmsisDap {
            channel,
            packet_size,
            info: ProbeInfo {
                packet_size: packet_size as u16,
                ..Default::default()
            },
        }
    }

    /// Negotiate with the probe, connect it in SWD mode and reset the SWD line.
    pub fn attach(mut channel: D, options: &CmsisDapOptions) -> Result<Self, DebugProbeError> {
        if options.speed_khz == Some(0) {
            return Err(DebugProbeError::UnsupportedSpeed(0));
        }

        // Clear any old status, e.g. from a debugger that was killed mid transfer.
        channel.drain();
        let packet_size = Self::find_packet_size(&mut channel)?;
        tracing::debug!("Using packet size {}", packet_size);
        channel.drain();

        let mut probe = Self::with_packet_size(channel, packet_size);
        probe.read_info()?;
        tracing::info!("Attached to {}", probe.info);

        if let Some(speed_khz) = options.speed_khz {
            probe.swj_clock(speed_khz)?;
        }

        probe.connect()?;
        sequences::swd_line_reset(&mut probe)?;

        if options.reset {
            tracing::info!("Asserting target reset");
            probe.reset_target(true)?;
        }

        Ok(probe)
    }

    fn find_packet_size(channel: &mut D) -> Result<usize, CmsisDapError> {
        for attempt in 1..=PACKET_SIZE_ATTEMPTS {
            match commands::send_command(channel, DEFAULT_PACKET_SIZE, &PacketSizeCommand {}) {
                Ok(0) => return Err(CmsisDapError::NoPacketSize),
                Ok(size) => return Ok(size as usize),
                Err(CmsisDapError::Send {
                    source: SendError::Timeout,
                    ..
                }) => tracing::debug!("Packet size query timed out (attempt {})", attempt),
                Err(other) => return Err(other),
            }
        }

        Err(CmsisDapError::NoPacketSize)
    }

    fn read_info(&mut self) -> Result<(), CmsisDapError> {
        self.info.packet_count = self.send(&PacketCountCommand {})?;

        let capabilities = self.send(&CapabilitiesCommand {})?;
        tracing::debug!("Detected probe capabilities: {:?}", capabilities);
        if !capabilities.swd_implemented {
            return Err(CmsisDapError::SwdNotSupported);
        }
        self.info.capabilities = capabilities;

        self.info.vendor = self.send(&VendorCommand {})?;
        self.info.product = self.send(&ProductIdCommand {})?;
        self.info.serial = self.send(&SerialNumberCommand {})?;
        self.info.firmware_version = self.send(&FirmwareVersionCommand {})?;
        self.info.target_vendor = self.send(&TargetDeviceVendorCommand {})?;
        self.info.target_device = self.send(&TargetDeviceNameCommand {})?;

        Ok(())
    }

    pub fn info(&self) -> &ProbeInfo {
        &self.info
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    fn send<Req: Request>(&mut self, request: &Req) -> Result<Req::Response, CmsisDapError> {
        commands::send_command(&mut self.channel, self.packet_size, request)
    }

    /// Number of leading requests which fit into one DAP_Transfer packet, both ways.
    fn batch_len(&self, requests: &[arm::TransferRequest]) -> usize {
        let budget = self.packet_size.saturating_sub(TRANSFER_HEADER_LEN);
        let mut request_len = 0;
        let mut response_len = 0;

        let fitting = requests
            .iter()
            .take(MAX_TRANSFERS_PER_PACKET)
            .take_while(|request| {
                let (req, resp) = transfer_len(request);
                request_len += req;
                response_len += resp;
                request_len <= budget && response_len <= budget
            })
            .count();

        // A single transfer always fits a valid packet size, and sending it
        // reports a proper error otherwise.
        fitting.max(1)
    }

    /// Perform a batch of register accesses with as few packets as possible.
    ///
    /// The returned vector has one entry per request. Once a packet stops early,
    /// later packets are not sent and their results are [`Ack::NotExecuted`].
    pub fn transfer_batch(
        &mut self,
        requests: &[arm::TransferRequest],
    ) -> Result<Vec<TransferResult>, DebugProbeError> {
        let mut results = Vec::with_capacity(requests.len());
        let mut remaining = requests;

        while !remaining.is_empty() {
            let (batch, rest) = remaining.split_at(self.batch_len(remaining));
            remaining = rest;

            let batch_results = self.send(&TransferRequest::new(batch))?;
            let stopped = batch_results.iter().any(|result| !result.ack.is_ok());
            results.extend(batch_results);

            if stopped {
                results.extend(
                    remaining
                        .iter()
                        .map(|_| TransferResult::with_ack(Ack::NotExecuted)),
                );
                break;
            }
        }

        Ok(results)
    }

    /// Clock out up to 256 bits on SWDIO.
    pub fn swj_sequence(&mut self, bits: &[u8], bit_len: usize) -> Result<(), CmsisDapError> {
        self.send(&SequenceRequest::new(bits, bit_len)?)?.check()
    }

    pub fn swj_clock(&mut self, speed_khz: u32) -> Result<(), CmsisDapError> {
        tracing::debug!("Setting SWD clock to {} kHz", speed_khz);
        self.send(&SwjClockRequest::from_khz(speed_khz))?.check()
    }

    fn connect(&mut self) -> Result<(), CmsisDapError> {
        match self.send(&ConnectRequest::UseSwd)? {
            ConnectResponse::SuccessfulInitForSwd => Ok(()),
            ConnectResponse::SuccessfulInitForJtag => Err(CmsisDapError::SwdNotSupported),
            ConnectResponse::InitFailed => Err(CmsisDapError::ConnectFailed),
        }
    }

    fn max_block(&self, direction: TransferDirection) -> usize {
        let overhead = match direction {
            TransferDirection::Read => TransferBlockRequest::READ_OVERHEAD,
            TransferDirection::Write => TransferBlockRequest::WRITE_OVERHEAD,
        };
        self.packet_size.saturating_sub(overhead) / 4
    }
}

impl<D: DapChannel> DapTransport for CmsisDap<D> {
    fn transfer(
        &mut self,
        request: &arm::TransferRequest,
    ) -> Result<TransferResult, DebugProbeError> {
        let mut results = self.transfer_batch(std::slice::from_ref(request))?;
        Ok(results
            .pop()
            .unwrap_or_else(|| TransferResult::with_ack(Ack::NotExecuted)))
    }

    fn transfer_block(
        &mut self,
        request: &BlockTransferRequest,
    ) -> Result<BlockTransferResult, DebugProbeError> {
        if request.is_empty() {
            return Ok(BlockTransferResult {
                ack: Ack::Ok,
                values: Vec::new(),
                executed: 0,
            });
        }

        let max = self.max_block(request.direction());
        if request.len() > max {
            return Err(CmsisDapError::TooMuchData(max).into());
        }

        let block = TransferBlockRequest::new(request).map_err(|source| CmsisDapError::Send {
            command_id: CommandId::TransferBlock,
            source,
        })?;

        Ok(self.send(&block)?)
    }

    fn max_transfer_block(&self, direction: TransferDirection) -> Option<usize> {
        Some(self.max_block(direction))
    }

    fn posts_ap_reads(&self) -> bool {
        false
    }

    fn raw_out(&mut self, bits: &[u8], bit_len: usize) -> Result<(), DebugProbeError> {
        let mut offset = 0;
        while offset < bit_len {
            let chunk = (bit_len - offset).min(MAX_SEQUENCE_BITS);
            let data = bits.get(offset / 8..).unwrap_or(&[]);
            self.swj_sequence(data, chunk)?;
            offset += chunk;
        }
        Ok(())
    }

    fn reset_target(&mut self, assert: bool) -> Result<(), DebugProbeError> {
        let request = SwjPinsRequestBuilder::new().nreset(!assert).build();
        let pins = self.send(&request)?;
        tracing::debug!(
            "Reset {}, pins now {:?}",
            if assert { "asserted" } else { "released" },
            pins
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::architecture::arm::{PortType, ProtocolError, RegisterAddress};

    #[derive(Debug)]
    enum Reply {
        Data(Vec<u8>),
        /// Only the given bytes, without padding to a full packet.
        Short(Vec<u8>),
        Timeout,
        /// A packet size reply, after which packets have the new size.
        PacketSize(u16),
    }

    /// A scripted CMSIS-DAP probe.
    ///
    /// Each expectation is the start of a request packet and the reply to it.
    pub(crate) struct MockChannel {
        packet_size: usize,
        expected: VecDeque<(Vec<u8>, Reply)>,
        pending: Option<Reply>,
    }

    impl MockChannel {
        pub fn new(packet_size: usize) -> Self {
            MockChannel {
                packet_size,
                expected: VecDeque::new(),
                pending: None,
            }
        }

        fn push(&mut self, request: Vec<u8>, reply: Reply) -> &mut Self {
            self.expected.push_back((request, reply));
            self
        }

        pub fn expect(&mut self, request: Vec<u8>, reply: Vec<u8>) -> &mut Self {
            self.push(request, Reply::Data(reply))
        }

        pub fn expect_short_reply(&mut self, request: Vec<u8>, reply: Vec<u8>) -> &mut Self {
            self.push(request, Reply::Short(reply))
        }

        pub fn expect_timeout(&mut self, request: Vec<u8>) -> &mut Self {
            self.push(request, Reply::Timeout)
        }

        pub fn expect_packet_size(&mut self, size: u16) -> &mut Self {
            self.push(vec![0x00, 0xFF], Reply::PacketSize(size))
        }

        /// The four SWJ sequences of an SWD line reset.
        pub fn expect_line_reset(&mut self) -> &mut Self {
            self.expect([vec![0x12, 56], vec![0xFF; 7]].concat(), vec![0x12, 0x00])
                .expect(vec![0x12, 16, 0x9E, 0xE7], vec![0x12, 0x00])
                .expect([vec![0x12, 56], vec![0xFF; 7]].concat(), vec![0x12, 0x00])
                .expect(vec![0x12, 8, 0x00], vec![0x12, 0x00])
        }
    }

    impl DapChannel for MockChannel {
        fn write(&mut self, buffer: &[u8]) -> Result<usize, SendError> {
            assert_eq!(buffer.len(), self.packet_size, "packet is not padded");
            assert!(self.pending.is_none(), "previous reply was not read");

            let (request, reply) = self
                .expected
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected packet {:02x?}", &buffer[..8]));
            assert_eq!(&buffer[..request.len()], &request[..]);

            self.pending = Some(reply);
            Ok(buffer.len())
        }

        fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SendError> {
            assert_eq!(buffer.len(), self.packet_size);

            match self.pending.take().expect("read without a request") {
                // Probes always answer with a full report.
                Reply::Data(data) => {
                    buffer[..data.len()].copy_from_slice(&data);
                    Ok(buffer.len())
                }
                Reply::Short(data) => {
                    buffer[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                Reply::Timeout => Err(SendError::Timeout),
                Reply::PacketSize(size) => {
                    let [lo, hi] = size.to_le_bytes();
                    buffer[..4].copy_from_slice(&[0x00, 0x02, lo, hi]);
                    self.packet_size = size as usize;
                    Ok(buffer.len())
                }
            }
        }
    }

    impl Drop for MockChannel {
        fn drop(&mut self) {
            if !std::thread::panicking() {
                assert!(
                    self.expected.is_empty(),
                    "expected packets were not sent: {:02x?}",
                    self.expected
                );
            }
        }
    }

    fn address(offset: u8) -> RegisterAddress {
        RegisterAddress::try_from(offset).unwrap()
    }

    fn info_string(id: u8, value: &str) -> (Vec<u8>, Vec<u8>) {
        let mut reply = vec![0x00, value.len() as u8];
        reply.extend_from_slice(value.as_bytes());
        (vec![0x00, id], reply)
    }

    fn expect_info(channel: &mut MockChannel, capabilities: u8) {
        channel
            .expect(vec![0x00, 0xFE], vec![0x00, 0x01, 0x04])
            .expect(vec![0x00, 0xF0], vec![0x00, 0x01, capabilities]);

        if capabilities & 0x01 == 0 {
            return;
        }

        for (id, value) in [
            (0x01, "ARM"),
            (0x02, "CMSIS-DAP"),
            (0x03, "0240000032"),
            (0x04, "2.1.0"),
            (0x05, ""),
            (0x06, ""),
        ] {
            let (request, reply) = info_string(id, value);
            channel.expect(request, reply);
        }
    }

    fn probe_specific(error: &DebugProbeError) -> Option<&CmsisDapError> {
        match error {
            DebugProbeError::ProbeSpecific(e) => e.downcast_ref::<CmsisDapError>(),
            _ => None,
        }
    }

    #[test]
    fn attach_sequence() {
        let mut channel = MockChannel::new(64);
        channel.expect_packet_size(64);
        expect_info(&mut channel, 0x03);
        channel
            .expect(vec![0x11, 0x40, 0x42, 0x0F, 0x00], vec![0x11, 0x00])
            .expect(vec![0x02, 0x01], vec![0x02, 0x01])
            .expect_line_reset();

        let options = CmsisDapOptions {
            speed_khz: Some(1000),
            ..Default::default()
        };
        let probe = CmsisDap::attach(channel, &options).unwrap();

        assert_eq!(
            probe.info(),
            &ProbeInfo {
                vendor: Some("ARM".to_owned()),
                product: Some("CMSIS-DAP".to_owned()),
                serial: Some("0240000032".to_owned()),
                firmware_version: Some("2.1.0".to_owned()),
                target_vendor: None,
                target_device: None,
                capabilities: Capabilities {
                    swd_implemented: true,
                    jtag_implemented: true,
                    ..Default::default()
                },
                packet_count: 4,
                packet_size: 64,
            }
        );
        assert_eq!(probe.packet_size(), 64);
    }

    #[test]
    fn attach_with_reset_asserts_the_reset_pin() {
        let mut channel = MockChannel::new(64);
        channel.expect_packet_size(512);
        expect_info(&mut channel, 0x01);
        channel
            .expect(vec![0x02, 0x01], vec![0x02, 0x01])
            .expect_line_reset()
            .expect(vec![0x10, 0x00, 0x80, 0, 0, 0, 0], vec![0x10, 0x00]);

        let options = CmsisDapOptions {
            reset: true,
            ..Default::default()
        };
        let probe = CmsisDap::attach(channel, &options).unwrap();

        assert_eq!(probe.packet_size(), 512);
        assert_eq!(probe.max_transfer_block(TransferDirection::Read), Some(127));
    }

    #[test]
    fn packet_size_query_is_retried_on_timeout() {
        let mut channel = MockChannel::new(64);
        channel
            .expect_timeout(vec![0x00, 0xFF])
            .expect_timeout(vec![0x00, 0xFF])
            .expect_packet_size(64);
        expect_info(&mut channel, 0x01);
        channel
            .expect(vec![0x02, 0x01], vec![0x02, 0x01])
            .expect_line_reset();

        CmsisDap::attach(channel, &CmsisDapOptions::default()).unwrap();
    }

    #[test]
    fn no_packet_size() {
        let mut channel = MockChannel::new(64);
        for _ in 0..PACKET_SIZE_ATTEMPTS {
            channel.expect_timeout(vec![0x00, 0xFF]);
        }

        let error = CmsisDap::attach(channel, &CmsisDapOptions::default()).unwrap_err();

        assert!(matches!(
            probe_specific(&error),
            Some(CmsisDapError::NoPacketSize)
        ));
    }

    #[test]
    fn probe_without_swd() {
        let mut channel = MockChannel::new(64);
        channel.expect_packet_size(64);
        expect_info(&mut channel, 0x02);

        let error = CmsisDap::attach(channel, &CmsisDapOptions::default()).unwrap_err();

        assert!(matches!(
            probe_specific(&error),
            Some(CmsisDapError::SwdNotSupported)
        ));
    }

    #[test]
    fn connect_failure() {
        let mut channel = MockChannel::new(64);
        channel.expect_packet_size(64);
        expect_info(&mut channel, 0x01);
        channel.expect(vec![0x02, 0x01], vec![0x02, 0x00]);

        let error = CmsisDap::attach(channel, &CmsisDapOptions::default()).unwrap_err();

        assert!(matches!(
            probe_specific(&error),
            Some(CmsisDapError::ConnectFailed)
        ));
    }

    #[test]
    fn zero_clock_speed_is_rejected_before_talking_to_the_probe() {
        let channel = MockChannel::new(64);
        let options = CmsisDapOptions {
            speed_khz: Some(0),
            ..Default::default()
        };

        let error = CmsisDap::attach(channel, &options).unwrap_err();

        assert!(matches!(error, DebugProbeError::UnsupportedSpeed(0)));
    }

    #[test]
    fn batch_is_split_at_packet_size() {
        let mut channel = MockChannel::new(16);
        // 13 bytes of response space hold three reads.
        channel
            .expect(
                vec![0x05, 0x00, 0x03, 0x02, 0x06, 0x0A],
                vec![0x05, 0x03, 0x01, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0],
            )
            .expect(
                vec![0x05, 0x00, 0x02, 0x0E, 0x0F],
                vec![0x05, 0x02, 0x01, 4, 0, 0, 0, 5, 0, 0, 0],
            );
        let mut probe = CmsisDap::with_packet_size(channel, 16);

        let requests = [
            arm::TransferRequest::read(PortType::DebugPort, address(0x0)),
            arm::TransferRequest::read(PortType::DebugPort, address(0x4)),
            arm::TransferRequest::read(PortType::DebugPort, address(0x8)),
            arm::TransferRequest::read(PortType::DebugPort, address(0xC)),
            arm::TransferRequest::read(PortType::AccessPort, address(0xC)),
        ];
        let results = probe.transfer_batch(&requests).unwrap();

        assert_eq!(
            results,
            (1..=5)
                .map(|value| TransferResult::ok(Some(value)))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn writes_are_limited_by_request_space() {
        let mut channel = MockChannel::new(16);
        channel
            .expect(
                vec![0x05, 0x00, 0x02, 0x01, 0x11, 0, 0, 0, 0x05, 0x22],
                vec![0x05, 0x02, 0x01],
            )
            .expect(vec![0x05, 0x00, 0x01, 0x09, 0x33], vec![0x05, 0x01, 0x01]);
        let mut probe = CmsisDap::with_packet_size(channel, 16);

        let requests = [
            arm::TransferRequest::write(PortType::AccessPort, address(0x0), 0x11),
            arm::TransferRequest::write(PortType::AccessPort, address(0x4), 0x22),
            arm::TransferRequest::write(PortType::AccessPort, address(0x8), 0x33),
        ];
        let results = probe.transfer_batch(&requests).unwrap();

        assert_eq!(results, vec![TransferResult::ok(None); 3]);
    }

    #[test]
    fn later_packets_are_skipped_after_a_failure() {
        let mut channel = MockChannel::new(16);
        channel.expect(
            vec![0x05, 0x00, 0x03],
            vec![0x05, 0x01, 0x02, 0x78, 0x56, 0x34, 0x12],
        );
        let mut probe = CmsisDap::with_packet_size(channel, 16);

        let requests = vec![arm::TransferRequest::read(PortType::AccessPort, address(0xC)); 5];
        let results = probe.transfer_batch(&requests).unwrap();

        assert_eq!(
            results,
            vec![
                TransferResult::ok(Some(0x1234_5678)),
                TransferResult::with_ack(Ack::Wait),
                TransferResult::with_ack(Ack::NotExecuted),
                TransferResult::with_ack(Ack::NotExecuted),
                TransferResult::with_ack(Ack::NotExecuted),
            ]
        );
    }

    #[test]
    fn single_transfer_with_protocol_error() {
        let mut channel = MockChannel::new(64);
        channel.expect(vec![0x05, 0x00, 0x01, 0x02], vec![0x05, 0x00, 0x07]);
        let mut probe = CmsisDap::with_packet_size(channel, 64);

        let result = probe
            .transfer(&arm::TransferRequest::read(PortType::DebugPort, address(0x0)))
            .unwrap();

        assert_eq!(result.ack, Ack::Protocol(ProtocolError::InvalidAck(7)));
        assert_eq!(result.value, None);
    }

    #[test]
    fn block_limits() {
        let probe = CmsisDap::with_packet_size(MockChannel::new(64), 64);

        assert_eq!(probe.max_transfer_block(TransferDirection::Read), Some(15));
        assert_eq!(probe.max_transfer_block(TransferDirection::Write), Some(14));
        assert!(!probe.posts_ap_reads());
    }

    #[test]
    fn oversized_block_is_rejected() {
        let mut probe = CmsisDap::with_packet_size(MockChannel::new(64), 64);

        let request = BlockTransferRequest::write(PortType::AccessPort, address(0xC), vec![0; 15]);
        let error = probe.transfer_block(&request).unwrap_err();

        assert!(matches!(
            probe_specific(&error),
            Some(CmsisDapError::TooMuchData(14))
        ));
    }

    #[test]
    fn empty_block_is_not_sent() {
        let mut probe = CmsisDap::with_packet_size(MockChannel::new(64), 64);

        let result = probe
            .transfer_block(&BlockTransferRequest::read(
                PortType::AccessPort,
                address(0xC),
                0,
            ))
            .unwrap();

        assert_eq!(result.executed, 0);
        assert!(result.values.is_empty());
    }

    #[test]
    fn long_sequences_are_split() {
        let mut channel = MockChannel::new(64);
        channel
            .expect([vec![0x12, 0x00], vec![0xAA; 32]].concat(), vec![0x12, 0x00])
            .expect([vec![0x12, 44], vec![0xAA; 6]].concat(), vec![0x12, 0x00]);
        let mut probe = CmsisDap::with_packet_size(channel, 64);

        probe.raw_out(&[0xAA; 38], 300).unwrap();
    }

    #[test]
    fn sequence_error_status() {
        let mut channel = MockChannel::new(64);
        channel.expect(vec![0x12, 8, 0x00], vec![0x12, 0xFF]);
        let mut probe = CmsisDap::with_packet_size(channel, 64);

        let error = probe.raw_out(&[0x00], 8).unwrap_err();

        assert!(matches!(
            probe_specific(&error),
            Some(CmsisDapError::ErrorResponse)
        ));
    }

    #[test]
    fn reset_pin() {
        let mut channel = MockChannel::new(64);
        channel
            .expect(vec![0x10, 0x00, 0x80, 0, 0, 0, 0], vec![0x10, 0x00])
            .expect(vec![0x10, 0x80, 0x80, 0, 0, 0, 0], vec![0x10, 0x80]);
        let mut probe = CmsisDap::with_packet_size(channel, 64);

        probe.reset_target(true).unwrap();
        probe.reset_target(false).unwrap();
    }

    #[test]
    fn options_from_config() {
        let config: BackendConfig =
            "cmsis-dap:vid=0xc251:pid=0xf001:serial=0123:speed=4000:reset=yes"
                .parse()
                .unwrap();

        assert_eq!(
            CmsisDapOptions::from_config(&config).unwrap(),
            CmsisDapOptions {
                vid: Some(0xC251),
                pid: Some(0xF001),
                serial: Some("0123".to_owned()),
                speed_khz: Some(4000),
                reset: true,
            }
        );
    }

    #[test]
    fn vid_out_of_range() {
        let config: BackendConfig = "cmsis-dap:vid=0x12345".parse().unwrap();

        assert!(matches!(
            CmsisDapOptions::from_config(&config),
            Err(BackendConfigError::OutOfRange { value: 0x12345, .. })
        ));
    }
}
