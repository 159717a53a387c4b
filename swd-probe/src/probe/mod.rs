//! Probe drivers, and the traits connecting them to [`Adiv5Swd`].

pub(crate) mod arm_debug_interface;
pub mod bitbang;
pub mod cmsisdap;
#[cfg(test)]
pub(crate) mod mock;
pub mod selector;

use std::net::ToSocketAddrs;

pub use arm_debug_interface::SwdLink;
pub use selector::{BackendConfig, BackendConfigError, OptionValue};

use crate::architecture::arm::{Adiv5Swd, ArmError, DapTransport};
use bitbang::BitBangEngine;
use cmsisdap::{CmsisDap, CmsisDapOptions};

/// Default TCP port of an OpenOCD `remote_bitbang` server.
const REMOTE_BITBANG_DEFAULT_PORT: u16 = 44242;

#[derive(thiserror::Error, docsplay::Display, Debug)]
pub enum DebugProbeError {
    /// Communication with the probe failed.
    Io(#[from] std::io::Error),

    /// An error specific to a probe type occurred.
    ProbeSpecific(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Probe could not be created.
    ProbeCouldNotBeCreated(#[from] ProbeCreationError),

    /// The probe does not support the operation '{0}'.
    CommandNotSupportedByProbe(&'static str),

    /// The requested speed setting ({0} kHz) is not supported by the probe.
    UnsupportedSpeed(u32),
}

#[derive(thiserror::Error, docsplay::Display, Debug)]
pub enum ProbeCreationError {
    /// Probe was not found.
    NotFound,

    /// USB device could not be opened. Please check the permissions.
    CouldNotOpen,

    /// {0}
    Rusb(#[from] rusb::Error),

    /// The backend configuration is invalid.
    Config(#[from] BackendConfigError),

    /// The backend '{0}' is not supported.
    UnsupportedBackend(String),
}

/// Bit level access to SWCLK and SWDIO.
///
/// Implementations clock the bits and handle line turnaround, the meaning of the
/// bits is up to [`SwdLink`]. Everything is sent LSB first.
pub trait BitTransport {
    /// Clock out `bit_len` bits of `bits` with the host driving SWDIO.
    fn raw_out(&mut self, bits: &[u8], bit_len: usize) -> Result<(), DebugProbeError>;

    /// Send an 8-bit request header and return the 3 acknowledge bits.
    fn write_cmd(&mut self, request: u8) -> Result<u8, DebugProbeError>;

    /// Send the data phase of a write.
    fn write_word_and_parity(&mut self, word: u32, parity: bool) -> Result<(), DebugProbeError>;

    /// Receive the data phase of a read.
    fn read_word_and_parity(&mut self) -> Result<(u32, bool), DebugProbeError>;

    /// Send everything queued so far.
    fn flush(&mut self) -> Result<(), DebugProbeError>;

    fn reset_target(&mut self, _assert: bool) -> Result<(), DebugProbeError> {
        Err(DebugProbeError::CommandNotSupportedByProbe("reset_target"))
    }
}

/// Names accepted for the backend in a [`BackendConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    CmsisDap,
    RemoteBitbang,
}

impl Backend {
    fn from_name(name: &str) -> Result<Self, ProbeCreationError> {
        match name {
            "cmsis-dap" | "cmsisdap" => Ok(Backend::CmsisDap),
            "remote-bitbang" | "bitbang" => Ok(Backend::RemoteBitbang),
            other => Err(ProbeCreationError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Open the probe described by `config` and connect to the target.
///
/// ```no_run
/// let config = "cmsis-dap:vid=0xc251:pid=0xf001:speed=1000".parse()?;
/// let session = swd_probe::open_backend(&config)?;
/// println!("{:#010x}", session.dpidr());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[tracing::instrument(skip_all, fields(backend = %config.name()))]
pub fn open_backend(
    config: &BackendConfig,
) -> Result<Adiv5Swd<Box<dyn DapTransport + Send>>, ArmError> {
    let transport = open_transport(config)?;

    Adiv5Swd::new(transport)
}

/// Open the probe described by `config`, without talking to the target.
///
/// With `reset` set in the configuration, the target reset line is asserted once the
/// probe is connected, and stays asserted until released with
/// [`DapTransport::reset_target`].
pub fn open_transport(
    config: &BackendConfig,
) -> Result<Box<dyn DapTransport + Send>, DebugProbeError> {
    match Backend::from_name(config.name())? {
        Backend::CmsisDap => {
            let options = CmsisDapOptions::from_config(config)?;
            let probe = CmsisDap::open(&options)?;
            Ok(Box::new(probe))
        }
        Backend::RemoteBitbang => {
            let host = config.text("host").unwrap_or("127.0.0.1");
            let port = config
                .integer_as::<u16>("port")?
                .unwrap_or(REMOTE_BITBANG_DEFAULT_PORT);

            if config.get("speed").is_some() {
                tracing::warn!("The remote bitbang backend ignores the speed option");
            }

            let address = (host, port)
                .to_socket_addrs()?
                .next()
                .ok_or(ProbeCreationError::NotFound)?;

            tracing::debug!("Connecting to remote bitbang server at {}", address);
            let mut engine = BitBangEngine::connect(address)?;

            if config.flag("reset")? {
                tracing::info!("Asserting target reset");
                engine.reset_target(true)?;
            }

            Ok(Box::new(SwdLink::new(engine)))
        }
    }
}

impl From<BackendConfigError> for DebugProbeError {
    fn from(error: BackendConfigError) -> Self {
        DebugProbeError::ProbeCouldNotBeCreated(ProbeCreationError::Config(error))
    }
}
