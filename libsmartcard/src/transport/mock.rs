// libsmartcard/src/transport/mock.rs

//! Scripted in-memory transport for tests and demos.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::transport::traits::ByteTransport;
use crate::types::{Convention, ResetType};
use crate::{Error, Result};

/// What the simulated card does on the next `receive` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// A byte available immediately
    Byte(u8),
    /// A byte that arrives only after the line stayed idle this long
    Late(u8, Duration),
    /// Nothing within the timeout
    Timeout,
    /// A character with a parity error
    Parity,
}

/// Mock transport for unit tests. It records every transmitted byte and
/// plays back queued receive events; an empty queue reads as a timeout.
#[derive(Debug)]
pub struct MockTransport {
    /// Events still to be played back
    pub rx: VecDeque<RxEvent>,
    /// Every byte sent, in order
    pub sent: Vec<u8>,
    /// Sent bytes grouped by the `last` hint
    pub frames: Vec<Vec<u8>>,
    /// Card detect
    pub present: bool,
    /// Every baud divisor programmed
    pub divisors: Vec<u16>,
    /// Every reset requested
    pub resets: Vec<ResetType>,
    /// Number of deactivation sequences
    pub deactivations: usize,
    /// Every convention handed to the UART
    pub conventions: Vec<Convention>,
    /// Every `delay_etu` argument
    pub delays: Vec<u32>,
    /// Timeout passed to each `receive` call
    pub receive_timeouts: Vec<u32>,
    /// Testing hook: number of subsequent `send` calls that should fail
    pub send_failures: usize,
    /// Number of `initialize` calls
    pub initialized: usize,
    /// Simulated time since the mock was created, advanced by late bytes
    pub elapsed: Duration,
    epoch: Instant,
    open_frame: Vec<u8>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A reader with a card inserted and nothing queued.
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            sent: Vec::new(),
            frames: Vec::new(),
            present: true,
            divisors: Vec::new(),
            resets: Vec::new(),
            deactivations: 0,
            conventions: Vec::new(),
            delays: Vec::new(),
            receive_timeouts: Vec::new(),
            send_failures: 0,
            initialized: 0,
            elapsed: Duration::ZERO,
            epoch: Instant::now(),
            open_frame: Vec::new(),
        }
    }

    /// Queue one byte.
    pub fn push_byte(&mut self, byte: u8) {
        self.rx.push_back(RxEvent::Byte(byte));
    }

    /// Queue several bytes in order.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().map(|&b| RxEvent::Byte(b)));
    }

    /// Queue a byte the card sends only after `idle` of silence.
    pub fn push_late_byte(&mut self, byte: u8, idle: Duration) {
        self.rx.push_back(RxEvent::Late(byte, idle));
    }

    /// Queue a receive timeout.
    pub fn push_timeout(&mut self) {
        self.rx.push_back(RxEvent::Timeout);
    }

    /// Queue a parity error.
    pub fn push_parity_error(&mut self) {
        self.rx.push_back(RxEvent::Parity);
    }

    /// Set how many subsequent `send` calls should fail (for tests).
    pub fn set_send_failures(&mut self, n: usize) {
        self.send_failures = n;
    }

    /// Pull the card out.
    pub fn remove_card(&mut self) {
        self.present = false;
    }

    /// Drain the sent log.
    pub fn take_sent(&mut self) -> Vec<u8> {
        self.frames.clear();
        std::mem::take(&mut self.sent)
    }

    /// Receive events not yet consumed.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl ByteTransport for MockTransport {
    fn send(&mut self, byte: u8, last: bool) -> Result<()> {
        if self.send_failures > 0 {
            self.send_failures -= 1;
            return Err(Error::Timeout);
        }
        self.sent.push(byte);
        self.open_frame.push(byte);
        if last {
            self.frames.push(std::mem::take(&mut self.open_frame));
        }
        Ok(())
    }

    fn receive(&mut self, timeout_etu: u32) -> Result<u8> {
        self.receive_timeouts.push(timeout_etu);
        match self.rx.pop_front() {
            Some(RxEvent::Byte(b)) => Ok(b),
            Some(RxEvent::Late(b, idle)) => {
                self.elapsed += idle;
                Ok(b)
            }
            Some(RxEvent::Parity) => Err(Error::Parity),
            Some(RxEvent::Timeout) | None => Err(Error::Timeout),
        }
    }

    fn set_baud_rate_divisor(&mut self, divisor: u16) -> Result<()> {
        self.divisors.push(divisor);
        Ok(())
    }

    fn card_present(&self) -> bool {
        self.present
    }

    fn cold_reset(&mut self) -> Result<()> {
        self.resets.push(ResetType::Cold);
        Ok(())
    }

    fn warm_reset(&mut self) -> Result<()> {
        self.resets.push(ResetType::Warm);
        Ok(())
    }

    fn deactivate(&mut self) -> Result<()> {
        self.deactivations += 1;
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        self.initialized += 1;
        Ok(())
    }

    fn set_convention(&mut self, convention: Convention) -> Result<()> {
        self.conventions.push(convention);
        Ok(())
    }

    fn delay_etu(&mut self, etu: u32) {
        self.delays.push(etu);
    }

    fn now(&self) -> Instant {
        self.epoch + self.elapsed
    }
}
