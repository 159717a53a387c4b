use std::time::Duration;

use anyhow::{Context, Result};
use swd_probe::probe::open_transport;
use swd_probe::{BackendConfig, DapTransport};

/// Pulse the target reset line
///
/// This does not talk to the target over SWD, so it also works when the
/// debug port does not respond.
#[derive(clap::Parser)]
pub struct Cmd {
    /// How long to keep reset asserted, in milliseconds
    #[arg(long, default_value = "100")]
    duration: u64,

    /// Leave reset asserted
    #[arg(long)]
    hold: bool,
}

impl Cmd {
    pub fn run(self, config: &BackendConfig) -> Result<()> {
        let mut probe = open_transport(config)
            .with_context(|| format!("Failed to open the probe using '{config}'"))?;

        probe.reset_target(true)?;
        probe.flush()?;

        if self.hold {
            return Ok(());
        }

        std::thread::sleep(Duration::from_millis(self.duration));
        probe.reset_target(false)?;
        probe.flush()?;

        Ok(())
    }
}
