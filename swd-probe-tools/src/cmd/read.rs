use anyhow::Result;
use swd_probe::BackendConfig;

use super::RegisterOptions;

/// Read a DP or AP register
///
/// e.g. swd read ap 0xfc
///      Reads the IDR of access port 0
///
///      swd read ap 0x0c --count 4
///      Reads DRW four times, e.g. a burst from memory
#[derive(clap::Parser)]
#[clap(verbatim_doc_comment)]
pub struct Cmd {
    #[clap(flatten)]
    register: RegisterOptions,

    /// Number of reads from the register
    #[arg(long, short, default_value = "1")]
    count: usize,
}

impl Cmd {
    pub fn run(self, config: &BackendConfig) -> Result<()> {
        let mut session = super::open(config)?;
        let (port, address) = self.register.prepare(&mut session)?;

        let values = if self.count == 1 {
            vec![session.read(port, address)?]
        } else {
            session.read_block(port, address, self.count)?
        };

        for value in values {
            println!("{:#010x}", value);
        }

        Ok(())
    }
}
