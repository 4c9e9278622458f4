// libsmartcard/src/protocol/link.rs

//! Character link over a `ByteTransport`, applying the convention and
//! retrying failed sends.

use crate::constants::SEND_ATTEMPTS;
use crate::protocol::convention;
use crate::transport::ByteTransport;
use crate::types::Convention;
use crate::{Error, Result};

/// Character-level view of the transport for one exchange.
///
/// In software mode the link applies the inverse convention itself and
/// pads each transmitted character with the extra guard time. In hardware
/// mode the UART does both and the link passes bytes through untouched.
pub struct Link<'a, T: ByteTransport + ?Sized> {
    transport: &'a mut T,
    convention: Convention,
    hardware: bool,
    extra_guard_etu: u32,
}

impl<'a, T: ByteTransport + ?Sized> Link<'a, T> {
    /// Link over `transport`. `hardware` leaves convention and guard time to the UART.
    pub fn new(
        transport: &'a mut T,
        convention: Convention,
        hardware: bool,
        extra_guard_etu: u32,
    ) -> Self {
        Self {
            transport,
            convention,
            hardware,
            extra_guard_etu,
        }
    }

    /// Guard time added before each character (software mode only).
    pub fn set_extra_guard(&mut self, etu: u32) {
        self.extra_guard_etu = etu;
    }

    /// Underlying transport, for line control between characters.
    pub fn transport(&mut self) -> &mut T {
        &mut *self.transport
    }

    fn map(&self, byte: u8) -> u8 {
        if self.hardware {
            byte
        } else {
            convention::apply(self.convention, byte)
        }
    }

    /// Send `bytes` as one unit; the last byte carries the end-of-block hint.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        for (i, &byte) in bytes.iter().enumerate() {
            if !self.hardware && self.extra_guard_etu > 0 {
                self.transport.delay_etu(self.extra_guard_etu);
            }
            self.send_byte(self.map(byte), i + 1 == bytes.len())?;
        }
        #[cfg(feature = "diagnostics")]
        log::trace!("tx {}", crate::utils::HexBytes(bytes));
        Ok(())
    }

    fn send_byte(&mut self, wire: u8, last: bool) -> Result<()> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.transport.send(wire, last) {
                Ok(()) => return Ok(()),
                Err(e) if attempts < SEND_ATTEMPTS => {
                    log::debug!("send {:02X} failed ({}), retrying", wire, e);
                }
                Err(e) => {
                    log::warn!("send {:02X} failed after {} attempts: {}", wire, attempts, e);
                    return Err(Error::TransmitFailed { attempts });
                }
            }
        }
    }

    /// Receive one character within `timeout_etu`.
    pub fn receive(&mut self, timeout_etu: u32) -> Result<u8> {
        let byte = self.transport.receive(timeout_etu)?;
        #[cfg(feature = "diagnostics")]
        log::trace!("rx {:02X}", byte);
        Ok(self.map(byte))
    }
}
