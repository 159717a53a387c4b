use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};

use super::bitbang_adapter::BitBangAdapter;
use crate::probe::{BitTransport, DebugProbeError};

/// Which side currently drives SWDIO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineOwner {
    Host,
    Target,
}

/// Uses a [`BitBangAdapter`] to clock SWD bits.
///
/// The host changes SWDIO while SWCLK is low, the target samples on the rising edge.
/// Bits driven by the target are sampled while SWCLK is low, before the rising edge.
/// A turnaround cycle is inserted whenever the line changes owner.
#[derive(Debug)]
pub struct BitBangEngine<S: Read + Write = TcpStream> {
    adapter: BitBangAdapter<S>,
    owner: LineOwner,
}

impl BitBangEngine<TcpStream> {
    /// Connect to a `remote_bitbang` server.
    pub fn connect(address: SocketAddr) -> io::Result<Self> {
        let adapter = BitBangAdapter::connect(address)?;
        Ok(Self::new(adapter))
    }
}

impl<S: Read + Write> BitBangEngine<S> {
    pub fn new(mut adapter: BitBangAdapter<S>) -> Self {
        adapter.swdio_drive(true);
        Self {
            adapter,
            owner: LineOwner::Host,
        }
    }

    #[cfg(test)]
    pub(crate) fn adapter(&self) -> &BitBangAdapter<S> {
        &self.adapter
    }

    fn write_bit(&mut self, bit: bool) {
        self.adapter.swd_write(false, bit);
        self.adapter.swd_write(true, bit);
    }

    fn write_bits(&mut self, value: u64, count: usize) {
        for i in 0..count {
            self.write_bit(value >> i & 1 == 1);
        }
    }

    fn sample_bits(&mut self, count: usize) {
        for _ in 0..count {
            self.adapter.swd_write(false, false);
            self.adapter.swdio_sample();
            self.adapter.swd_write(true, false);
        }
    }

    /// Hand SWDIO over to `owner`, with one turnaround clock cycle.
    fn turn_to(&mut self, owner: LineOwner) {
        if self.owner == owner {
            return;
        }

        match owner {
            LineOwner::Target => {
                self.adapter.swdio_drive(false);
                self.write_bit(false);
            }
            LineOwner::Host => {
                self.write_bit(false);
                self.adapter.swdio_drive(true);
            }
        }

        self.owner = owner;
    }

    /// Read `count` bits from the target, LSB first.
    fn read_bits(&mut self, count: usize) -> io::Result<u64> {
        self.turn_to(LineOwner::Target);
        self.sample_bits(count);

        let bits = self.adapter.fetch_samples()?;

        Ok(bits
            .iter()
            .enumerate()
            .fold(0, |value, (i, bit)| value | (*bit as u64) << i))
    }
}

impl<S: Read + Write> BitTransport for BitBangEngine<S> {
    fn raw_out(&mut self, bits: &[u8], bit_len: usize) -> Result<(), DebugProbeError> {
        self.turn_to(LineOwner::Host);

        for i in 0..bit_len {
            let byte = bits.get(i / 8).copied().unwrap_or(0);
            self.write_bit(byte >> (i % 8) & 1 == 1);
        }

        Ok(())
    }

    fn write_cmd(&mut self, request: u8) -> Result<u8, DebugProbeError> {
        self.turn_to(LineOwner::Host);
        self.write_bits(request as u64, 8);

        let ack = self.read_bits(3)? as u8;
        tracing::trace!("request {:#04x} -> ack {:#05b}", request, ack);

        Ok(ack)
    }

    fn write_word_and_parity(&mut self, word: u32, parity: bool) -> Result<(), DebugProbeError> {
        self.turn_to(LineOwner::Host);
        self.write_bits(word as u64 | (parity as u64) << 32, 33);
        Ok(())
    }

    fn read_word_and_parity(&mut self) -> Result<(u32, bool), DebugProbeError> {
        let bits = self.read_bits(33)?;
        Ok((bits as u32, bits >> 32 & 1 == 1))
    }

    fn flush(&mut self) -> Result<(), DebugProbeError> {
        self.adapter.flush()?;
        Ok(())
    }

    fn reset_target(&mut self, assert: bool) -> Result<(), DebugProbeError> {
        tracing::trace!("BitBang reset_target({})", assert);
        self.adapter.reset(false, assert);
        self.adapter.flush()?;
        Ok(())
    }
}

impl<S: Read + Write> Drop for BitBangEngine<S> {
    fn drop(&mut self) {
        if let Err(e) = self.adapter.quit() {
            tracing::debug!("Failed to send quit to the bitbang server: {}", e);
        }
    }
}
