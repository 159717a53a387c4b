use anyhow::Result;
use swd_probe::architecture::arm::dp::{Ctrl, DebugPortId, DebugPortVersion, DPIDR};
use swd_probe::{BackendConfig, PortType, RegisterAddress};

#[derive(clap::Parser)]
pub struct Cmd {}

impl Cmd {
    pub fn run(self, config: &BackendConfig) -> Result<()> {
        let mut session = super::open(config)?;

        let dpidr = session.dpidr();
        let id = DebugPortId::from(DPIDR::from(dpidr));

        println!("DPIDR:    {:#010x}", dpidr);
        println!(
            "Designer: {}",
            id.designer.get().unwrap_or("<unknown designer>")
        );
        println!("Part:     {:#04x}, revision {}", id.part_no, id.revision);
        match id.version {
            DebugPortVersion::Unsupported(version) => {
                println!("Version:  unsupported ({version})")
            }
            version => println!("Version:  {version:?}"),
        }

        let ctrl_stat = session.read(PortType::DebugPort, RegisterAddress::of::<Ctrl>())?;
        println!("CTRL/STAT: {:#010x}", ctrl_stat);
        println!("{:#?}", Ctrl::from(ctrl_stat));

        Ok(())
    }
}
