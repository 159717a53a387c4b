pub mod info;
pub mod read;
pub mod reset;
pub mod write;

use std::num::ParseIntError;

use anyhow::{Context, Result};
use swd_probe::{open_backend, Adiv5Swd, BackendConfig, DapTransport, PortType, RegisterAddress};

pub type Session = Adiv5Swd<Box<dyn DapTransport + Send>>;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Port {
    /// Debug port
    Dp,
    /// Access port
    Ap,
}

impl From<Port> for PortType {
    fn from(port: Port) -> Self {
        match port {
            Port::Dp => PortType::DebugPort,
            Port::Ap => PortType::AccessPort,
        }
    }
}

/// Selects one DP or AP register.
#[derive(clap::Parser, Debug)]
pub struct RegisterOptions {
    /// Register space
    #[clap(value_enum)]
    port: Port,

    /// Register address. For AP registers, bits 7:4 select the bank.
    #[clap(value_parser = parse_u8)]
    address: u8,

    /// Access port to use for AP registers
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    ap: u8,
}

impl RegisterOptions {
    /// Select the AP bank if necessary, and return the register address on the wire.
    pub fn prepare(&self, session: &mut Session) -> Result<(PortType, RegisterAddress)> {
        let (port, bank, address) = self.decode()?;

        if let Some(bank) = bank {
            session
                .select_ap_bank(self.ap, bank)
                .context("Failed to select the AP register bank")?;
        }

        Ok((port, address))
    }

    /// Split the address into the AP bank, if any, and the offset within it.
    fn decode(&self) -> Result<(PortType, Option<u8>, RegisterAddress)> {
        let port = PortType::from(self.port);

        let bank = if port.is_ap() {
            Some(self.address >> 4)
        } else if self.address > 0xC {
            anyhow::bail!("DP register address {:#x} is out of range", self.address);
        } else {
            None
        };

        let address = RegisterAddress::try_from(self.address & 0x0F)?;
        Ok((port, bank, address))
    }
}

pub fn open(config: &BackendConfig) -> Result<Session> {
    open_backend(config).with_context(|| format!("Failed to connect using '{config}'"))
}

pub fn parse_u8(input: &str) -> Result<u8, ParseIntError> {
    parse_int::parse(input)
}

pub fn parse_u32(input: &str) -> Result<u32, ParseIntError> {
    parse_int::parse(input)
}
