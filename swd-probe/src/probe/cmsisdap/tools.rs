use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, Direction, Recipient, RequestType, TransferType, UsbContext};

use super::commands::{DapChannel, SendError};
use super::CmsisDapOptions;
use crate::probe::ProbeCreationError;

const USB_CLASS_HID: u8 = 0x03;

const TIMEOUT: Duration = Duration::from_millis(1000);
const DRAIN_TIMEOUT: Duration = Duration::from_millis(1);

/// HID class requests, used when the interface has no interrupt endpoints.
const HID_GET_REPORT: u8 = 0x01;
const HID_SET_REPORT: u8 = 0x09;
/// Report type in the high byte of `wValue`, report ID 0.
const HID_REPORT_INPUT: u16 = 0x0100;
const HID_REPORT_OUTPUT: u16 = 0x0200;

/// A CMSIS-DAP v1 (HID) probe, accessed with libusb.
pub struct UsbChannel {
    handle: DeviceHandle<Context>,
    interface: u8,
    out_ep: Option<u8>,
    in_ep: Option<u8>,
}

impl std::fmt::Debug for UsbChannel {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("UsbChannel")
            .field("interface", &self.interface)
            .field("out_ep", &self.out_ep)
            .field("in_ep", &self.in_ep)
            .finish()
    }
}

/// Checks if a given Device is a CMSIS-DAP probe matching `options`.
///
/// Returns an open, not yet claimed channel if so.
fn try_open<T: UsbContext>(
    device: &Device<T>,
    options: &CmsisDapOptions,
) -> Result<Option<(DeviceHandle<T>, u8, Option<u8>, Option<u8>)>, rusb::Error> {
    let descriptor = device.device_descriptor()?;

    if options.vid.is_some_and(|vid| vid != descriptor.vendor_id())
        || options.pid.is_some_and(|pid| pid != descriptor.product_id())
    {
        return Ok(None);
    }

    let config = device.config_descriptor(0)?;
    let Some(setting) = config
        .interfaces()
        .next()
        .and_then(|interface| interface.descriptors().next())
    else {
        return Ok(None);
    };

    if setting.class_code() != USB_CLASS_HID {
        return Ok(None);
    }

    let handle = device.open()?;

    // Most CMSIS-DAP probes say something like "CMSIS-DAP"
    let product = handle.read_product_string_ascii(&descriptor)?;
    if !product.contains("CMSIS-DAP") {
        return Ok(None);
    }

    if let Some(serial) = &options.serial {
        let actual = handle.read_serial_number_string_ascii(&descriptor)?;
        if &actual != serial {
            tracing::trace!("Skipping {} with serial number {}", product, actual);
            return Ok(None);
        }
    }

    tracing::debug!(
        "Found {} ({:04x}:{:04x})",
        product,
        descriptor.vendor_id(),
        descriptor.product_id()
    );

    let mut out_ep = None;
    let mut in_ep = None;
    for endpoint in setting.endpoint_descriptors() {
        if endpoint.transfer_type() != TransferType::Interrupt {
            continue;
        }
        match endpoint.direction() {
            Direction::Out => out_ep = out_ep.or(Some(endpoint.address())),
            Direction::In => in_ep = in_ep.or(Some(endpoint.address())),
        }
    }

    Ok(Some((handle, setting.interface_number(), out_ep, in_ep)))
}

/// Open the first CMSIS-DAP probe matching `options`.
#[tracing::instrument(skip_all)]
pub fn open_device(options: &CmsisDapOptions) -> Result<UsbChannel, ProbeCreationError> {
    let context = Context::new()?;
    let mut access_denied = false;

    for device in context.devices()?.iter() {
        match try_open(&device, options) {
            Ok(Some((handle, interface, out_ep, in_ep))) => {
                return UsbChannel::new(handle, interface, out_ep, in_ep)
            }
            Ok(None) => {}
            Err(rusb::Error::Access) => {
                tracing::debug!("Access denied to USB device {:?}", device);
                access_denied = true;
            }
            Err(e) => tracing::trace!("Skipping USB device {:?}: {}", device, e),
        }
    }

    if access_denied {
        Err(ProbeCreationError::CouldNotOpen)
    } else {
        Err(ProbeCreationError::NotFound)
    }
}

impl UsbChannel {
    fn new(
        handle: DeviceHandle<Context>,
        interface: u8,
        out_ep: Option<u8>,
        in_ep: Option<u8>,
    ) -> Result<Self, ProbeCreationError> {
        if handle.kernel_driver_active(interface).unwrap_or(false) {
            tracing::debug!("Detaching kernel driver from interface {}", interface);
            handle.detach_kernel_driver(interface)?;
        }
        handle.claim_interface(interface)?;
        tracing::debug!(
            "Claimed interface {} (out: {:?}, in: {:?})",
            interface,
            out_ep,
            in_ep
        );

        Ok(Self {
            handle,
            interface,
            out_ep,
            in_ep,
        })
    }
}

impl DapChannel for UsbChannel {
    fn write(&mut self, buffer: &[u8]) -> Result<usize, SendError> {
        let written = match self.out_ep {
            Some(ep) => self.handle.write_interrupt(ep, buffer, TIMEOUT)?,
            None => self.handle.write_control(
                rusb::request_type(Direction::Out, RequestType::Class, Recipient::Interface),
                HID_SET_REPORT,
                HID_REPORT_OUTPUT,
                self.interface as u16,
                buffer,
                TIMEOUT,
            )?,
        };
        Ok(written)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SendError> {
        let read = match self.in_ep {
            Some(ep) => self.handle.read_interrupt(ep, buffer, TIMEOUT)?,
            None => self.handle.read_control(
                rusb::request_type(Direction::In, RequestType::Class, Recipient::Interface),
                HID_GET_REPORT,
                HID_REPORT_INPUT,
                self.interface as u16,
                buffer,
                TIMEOUT,
            )?,
        };
        Ok(read)
    }

    /// Drain any pending data from the probe, ensuring future responses are
    /// synchronised to requests. Swallows any errors, which are expected if
    /// there is no pending data to read.
    fn drain(&mut self) {
        let Some(ep) = self.in_ep else {
            return;
        };

        tracing::debug!("Draining probe of any pending data.");
        let mut discard = [0u8; 1024];
        while let Ok(n) = self.handle.read_interrupt(ep, &mut discard, DRAIN_TIMEOUT) {
            if n == 0 {
                break;
            }
        }
    }
}

impl Drop for UsbChannel {
    fn drop(&mut self) {
        // We ignore the error case as we can't do much about it anyways.
        let _ = self.handle.release_interface(self.interface);
    }
}
