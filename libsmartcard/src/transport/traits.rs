// libsmartcard/src/transport/traits.rs

//! The hardware seam: character I/O, line control and timers.

use std::time::Instant;

use crate::Result;
use crate::types::Convention;

/// Byte transport abstracts the card interface (UART, contacts, reset
/// line) away from the protocol logic.
///
/// Every call blocks until the byte went out, a byte came in, or the ETU
/// based timeout elapsed. `receive` reports an elapsed timeout as
/// `Error::Timeout` and a character received with bad parity as
/// `Error::Parity`.
pub trait ByteTransport {
    /// Send one byte. `last` is set on the final byte of a block so the
    /// UART can switch to reception right after it.
    fn send(&mut self, byte: u8, last: bool) -> Result<()>;

    /// Receive one byte, waiting at most `timeout_etu` elementary time units.
    fn receive(&mut self, timeout_etu: u32) -> Result<u8>;

    /// Reconfigure the bit clock.
    fn set_baud_rate_divisor(&mut self, divisor: u16) -> Result<()>;

    /// Card detect switch.
    fn card_present(&self) -> bool;

    /// Power the contacts, start the clock and release RST.
    fn cold_reset(&mut self) -> Result<()>;

    /// Pulse RST while the card stays powered.
    fn warm_reset(&mut self) -> Result<()>;

    /// Deactivation sequence: RST low, clock stopped, I/O low, VCC off.
    fn deactivate(&mut self) -> Result<()>;

    /// One-time peripheral setup. Default is a no-op.
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Switch the UART's own convention handling. Only called when the
    /// session is configured for hardware convention support.
    fn set_convention(&mut self, _convention: Convention) -> Result<()> {
        Ok(())
    }

    /// Hold the line idle for `etu` elementary time units. Used for the
    /// extra guard time between transmitted characters.
    fn delay_etu(&mut self, _etu: u32) {}

    /// Time source for windows spanning several characters, such as the
    /// total ATR time. Defaults to the monotonic system clock.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for Box<T> {
    fn send(&mut self, byte: u8, last: bool) -> Result<()> {
        (**self).send(byte, last)
    }

    fn receive(&mut self, timeout_etu: u32) -> Result<u8> {
        (**self).receive(timeout_etu)
    }

    fn set_baud_rate_divisor(&mut self, divisor: u16) -> Result<()> {
        (**self).set_baud_rate_divisor(divisor)
    }

    fn card_present(&self) -> bool {
        (**self).card_present()
    }

    fn cold_reset(&mut self) -> Result<()> {
        (**self).cold_reset()
    }

    fn warm_reset(&mut self) -> Result<()> {
        (**self).warm_reset()
    }

    fn deactivate(&mut self) -> Result<()> {
        (**self).deactivate()
    }

    fn initialize(&mut self) -> Result<()> {
        (**self).initialize()
    }

    fn set_convention(&mut self, convention: Convention) -> Result<()> {
        (**self).set_convention(convention)
    }

    fn delay_etu(&mut self, etu: u32) {
        (**self).delay_etu(etu)
    }

    fn now(&self) -> Instant {
        (**self).now()
    }
}
