mod cmd;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use swd_probe::BackendConfig;

use crate::logging::{setup_logging, LevelFilter};

#[derive(clap::Parser)]
#[clap(
    name = "swd",
    about = "Access ADIv5 debug and access port registers over SWD",
    version
)]
struct Cli {
    /// Probe to use, e.g. `cmsis-dap:vid=0xc251:speed=4000` or `remote-bitbang:port=44242`
    #[arg(long, short, global = true, env = "SWD_BACKEND", default_value = "cmsis-dap")]
    backend: String,

    /// Log level, overrides RUST_LOG
    #[arg(long, global = true, value_enum, help_heading = "LOG CONFIGURATION")]
    log_level: Option<LevelFilter>,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(clap::Subcommand)]
enum Subcommand {
    /// Connect to the target and show what the debug port reports about itself
    Info(cmd::info::Cmd),
    /// Read DP or AP registers
    Read(cmd::read::Cmd),
    /// Write DP or AP registers
    Write(cmd::write::Cmd),
    /// Drive the target reset line
    Reset(cmd::reset::Cmd),
}

impl Cli {
    fn run(self) -> Result<()> {
        let config: BackendConfig = self
            .backend
            .parse()
            .with_context(|| format!("Invalid backend selection '{}'", self.backend))?;

        match self.subcommand {
            Subcommand::Info(cmd) => cmd.run(&config),
            Subcommand::Read(cmd) => cmd.run(&config),
            Subcommand::Write(cmd) => cmd.run(&config),
            Subcommand::Reset(cmd) => cmd.run(&config),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level);

    cli.run()
}
