//! # Serial Wire Debug for ADIv5 targets
//!
//! This crate talks to the Debug Port (DP) and Access Ports (AP) of an ARM
//! ADIv5 target over SWD. Two kinds of probes are supported:
//!
//! - CMSIS-DAP probes, driven with DAP command packets over USB.
//! - Bit-banged adapters speaking the OpenOCD `remote_bitbang` protocol, where
//!   this crate generates every clock edge itself.
//!
//! Both plug into the same [`Adiv5Swd`] session, which performs the line reset,
//! clears sticky errors and resolves posted AP reads.
//!
//! # Examples
//!
//! ## Reading the debug port ID
//!
//! ```no_run
//! use swd_probe::{open_backend, BackendConfig, PortType, RegisterAddress};
//!
//! let config: BackendConfig = "cmsis-dap:speed=4000".parse()?;
//! let mut session = open_backend(&config)?;
//!
//! println!("DPIDR: {:#010x}", session.dpidr());
//!
//! // Read CTRL/STAT.
//! let ctrl_stat = session.read(PortType::DebugPort, RegisterAddress::try_from(0x4)?)?;
//! # let _ = ctrl_stat;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Reading a burst from an access port register
//!
//! ```no_run
//! use swd_probe::{open_backend, BackendConfig, PortType, RegisterAddress};
//!
//! let config: BackendConfig = "remote-bitbang:host=127.0.0.1:port=44242".parse()?;
//! let mut session = open_backend(&config)?;
//!
//! session.select_ap_bank(0, 0)?;
//! let words = session.read_block(PortType::AccessPort, RegisterAddress::try_from(0xC)?, 16)?;
//! assert_eq!(words.len(), 16);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// All the interface bits for the different architectures.
pub mod architecture;
pub mod probe;

pub use crate::architecture::arm::{
    Ack, Adiv5Swd, ArmError, BlockTransferKind, BlockTransferRequest, BlockTransferResult,
    DapError, DapTransport, LinkState, PortType, ProtocolError, RegisterAddress,
    TransferDirection, TransferKind, TransferRequest, TransferResult,
};
pub use crate::probe::{
    open_backend, BackendConfig, BackendConfigError, BitTransport, DebugProbeError,
    ProbeCreationError,
};
