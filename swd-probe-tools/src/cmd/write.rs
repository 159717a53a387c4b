use anyhow::Result;
use swd_probe::BackendConfig;

use super::{parse_u32, RegisterOptions};

/// Write a DP or AP register
///
/// e.g. swd write dp 0x4 0x50000000
///      Requests debug and system power up in CTRL/STAT
///
///      swd write ap 0x0c 1 2 3
///      Writes three words to DRW
#[derive(clap::Parser)]
#[clap(verbatim_doc_comment)]
pub struct Cmd {
    #[clap(flatten)]
    register: RegisterOptions,

    /// Values to write, in order
    #[arg(required = true, value_parser = parse_u32)]
    values: Vec<u32>,
}

impl Cmd {
    pub fn run(self, config: &BackendConfig) -> Result<()> {
        let mut session = super::open(config)?;
        let (port, address) = self.register.prepare(&mut session)?;

        match self.values.as_slice() {
            [value] => session.write(port, address, *value)?,
            values => session.write_block(port, address, values)?,
        }
        session.flush()?;

        Ok(())
    }
}
