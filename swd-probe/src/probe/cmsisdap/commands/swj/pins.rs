use super::super::{write_bytes, CommandId, Request, SendError};

/// Drive the SWJ pins directly, and read them back.
#[derive(Debug, Clone, Copy)]
pub struct SwjPinsRequest {
    /// A mask of the values the different pins selected in the selection mask will be set to.
    pub(crate) output: Pins,
    /// A mask to select all the pins that should be toggled.
    pub(crate) select: Pins,
    /// Time to wait for the selected pins to settle, in µs.
    pub(crate) wait: u32,
}

#[derive(Debug, Default)]
pub struct SwjPinsRequestBuilder {
    nreset: Option<bool>,
}

impl SwjPinsRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level of the active low reset line.
    pub fn nreset(&mut self, value: bool) -> &mut Self {
        self.nreset = Some(value);
        self
    }

    pub fn build(&self) -> SwjPinsRequest {
        let mut mask = Pins(0);
        let mut values = Pins(0);

        if let Some(nreset) = self.nreset {
            mask.set_nreset(true);
            values.set_nreset(nreset);
        }

        SwjPinsRequest {
            output: values,
            select: mask,
            wait: 0,
        }
    }
}

bitfield::bitfield! {
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Pins(u8);
    impl Debug;
    pub nreset, set_nreset: 7;
    pub ntrst, set_ntrst: 5;
    pub tdo, set_tdo: 3;
    pub tdi, set_tdi: 2;
    pub swdio_tms, set_swdio_tms: 1;
    pub swclk_tck, set_swclk_tck: 0;
}

impl Request for SwjPinsRequest {
    const COMMAND_ID: CommandId = CommandId::SwjPins;

    type Response = Pins;

    fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, SendError> {
        write_bytes(buffer, 0, &[self.output.0, self.select.0])?;
        write_bytes(buffer, 2, &self.wait.to_le_bytes())?;
        Ok(6)
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, SendError> {
        buffer
            .first()
            .map(|&pins| Pins(pins))
            .ok_or(SendError::NotEnoughData)
    }
}
