use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Encodes pin changes as the single character commands of the OpenOCD `remote_bitbang`
/// protocol, including its SWD extension.
///
/// The protocol is described in the OpenOCD manual:
/// [remote_bitbang](https://github.com/openocd-org/openocd/blob/master/doc/manual/jtag/drivers/remote_bitbang.txt)
///
/// Commands are buffered until [`flush`](BitBangAdapter::flush) or
/// [`fetch_samples`](BitBangAdapter::fetch_samples) is called, so a whole SWD transaction
/// costs a single round trip.
#[derive(Debug)]
pub struct BitBangAdapter<S> {
    stream: S,
    pending: Vec<u8>,
    samples: usize,
}

impl BitBangAdapter<TcpStream> {
    /// Connect to a `remote_bitbang` server.
    pub fn connect(address: SocketAddr) -> io::Result<Self> {
        let mut socket = TcpStream::connect_timeout(&address, CONNECT_TIMEOUT)?;
        socket.set_nodelay(true)?;
        socket.set_write_timeout(Some(READ_TIMEOUT))?;

        // Dump anything that was already in the socket
        socket.set_read_timeout(Some(DRAIN_TIMEOUT))?;
        let mut junk = vec![];
        let _ = socket.read_to_end(&mut junk);
        if !junk.is_empty() {
            tracing::debug!("Discarded {} stale bytes from the server", junk.len());
        }
        socket.set_read_timeout(Some(READ_TIMEOUT))?;

        Ok(Self::new(socket))
    }
}

impl<S: Read + Write> BitBangAdapter<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Vec::with_capacity(256),
            samples: 0,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    fn queue(&mut self, command: u8) {
        self.pending.push(command);
    }

    /// Control the reset lines. `true` asserts the line.
    pub fn reset(&mut self, trst: bool, srst: bool) {
        let command = match (trst, srst) {
            (false, false) => b'r',
            (false, true) => b's',
            (true, false) => b't',
            (true, true) => b'u',
        };
        self.queue(command);
    }

    /// Set SWCLK and the value driven on SWDIO.
    pub fn swd_write(&mut self, swclk: bool, swdio: bool) {
        self.queue(b'd' + ((swclk as u8) << 1 | swdio as u8));
    }

    /// Enable (`true`) or disable the host's SWDIO output driver.
    pub fn swdio_drive(&mut self, drive: bool) {
        self.queue(if drive { b'O' } else { b'o' });
    }

    /// Queue a sample of SWDIO. The result is returned by the next
    /// [`fetch_samples`](BitBangAdapter::fetch_samples).
    pub fn swdio_sample(&mut self) {
        self.queue(b'c');
        self.samples += 1;
    }

    /// Send all queued commands and receive the answers to all queued samples.
    pub fn fetch_samples(&mut self) -> io::Result<Vec<bool>> {
        self.flush()?;

        let mut answers = vec![0; self.samples];
        self.samples = 0;
        self.stream.read_exact(&mut answers)?;

        answers
            .into_iter()
            .map(|answer| match answer {
                b'0' => Ok(false),
                b'1' => Ok(true),
                other => Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unexpected answer {other:#04x} to an SWDIO sample"),
                )),
            })
            .collect()
    }

    /// Send all queued commands.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            tracing::trace!(
                "bitbang send: {}",
                String::from_utf8_lossy(&self.pending)
            );
            self.stream.write_all(&self.pending)?;
            self.pending.clear();
        }
        self.stream.flush()
    }

    /// Tell the bit bang server we are done sending messages
    pub fn quit(&mut self) -> io::Result<()> {
        self.queue(b'Q');
        self.flush()
    }
}
