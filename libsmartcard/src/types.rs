// libsmartcard/src/types.rs

//! Plain value types shared by the protocol layers and the session.

use derive_more::Display;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{TS_DIRECT, TS_INVERSE};

/// Reset requested before reading the ATR
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetType {
    /// Power-up activation
    #[display(fmt = "cold reset")]
    Cold,
    /// RST pulse with the card powered
    #[display(fmt = "warm reset")]
    Warm,
}

/// Bit ordering and polarity announced by TS
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Convention {
    /// TS = 3B
    #[default]
    #[display(fmt = "direct")]
    Direct,
    /// TS = 3F on the wire, 03 as read
    #[display(fmt = "inverse")]
    Inverse,
}

impl Convention {
    /// Decode TS as received through a direct-convention UART.
    pub fn from_ts(ts: u8) -> Option<Self> {
        match ts {
            TS_DIRECT => Some(Convention::Direct),
            TS_INVERSE => Some(Convention::Inverse),
            _ => None,
        }
    }
}

/// Transmission protocol in use
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProtocolType {
    /// Character protocol
    #[display(fmt = "T=0")]
    T0,
    /// Block protocol
    #[display(fmt = "T=1")]
    T1,
    /// No usable protocol, or no ATR yet
    #[default]
    #[display(fmt = "invalid")]
    Invalid,
}

impl ProtocolType {
    /// Protocol from the low nibble of TDi (or PPS0).
    pub fn from_nibble(value: u8) -> Self {
        match value & 0x0F {
            0 => ProtocolType::T0,
            1 => ProtocolType::T1,
            _ => ProtocolType::Invalid,
        }
    }
}

/// Session state as reported by `CardSession::state`
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CardState {
    /// Not reset yet, or shut down
    #[default]
    #[display(fmt = "unknown")]
    Unknown,
    /// A valid ATR was received
    #[display(fmt = "ATR on")]
    AtrOn,
}

/// Whether a PPS exchange may follow the ATR
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PpsSupport {
    /// Specific mode without the ability to change
    #[display(fmt = "not allowed")]
    NotAllowed,
    /// Negotiable mode
    #[display(fmt = "allowed")]
    Allowed,
    /// Specific mode, switchable to negotiable mode by a warm reset
    #[display(fmt = "allowed after warm reset")]
    AllowedAfterWarmReset,
}

/// Error detection code appended to T=1 blocks
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EdcMode {
    /// One byte XOR
    #[default]
    #[display(fmt = "LRC")]
    Lrc,
    /// Two byte CRC-16
    #[display(fmt = "CRC")]
    Crc,
}

impl EdcMode {
    /// Number of trailer bytes.
    pub fn trailer_len(&self) -> usize {
        match self {
            EdcMode::Lrc => 1,
            EdcMode::Crc => 2,
        }
    }

    /// Selection made by TC3 bit 0.
    pub fn from_tc3(tc3: u8) -> Self {
        if tc3 & 0x01 != 0 {
            EdcMode::Crc
        } else {
            EdcMode::Lrc
        }
    }
}

/// Response of a T=0 or T=1 exchange.
///
/// `data` holds everything the card returned except the trailing status
/// word, so `rx_data_len()` is the received length minus two.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApduResponse {
    /// Response body without the status word
    pub data: Vec<u8>,
    /// First status byte
    pub sw1: u8,
    /// Second status byte
    pub sw2: u8,
}

impl ApduResponse {
    /// Response from its parts.
    pub fn new(data: Vec<u8>, sw1: u8, sw2: u8) -> Self {
        Self { data, sw1, sw2 }
    }

    /// Split a raw response whose last two bytes are SW1 SW2. Shorter
    /// buffers are kept as data with a zero status word.
    pub fn from_raw(mut raw: Vec<u8>) -> Self {
        if raw.len() < 2 {
            return Self::new(raw, 0, 0);
        }
        let sw2 = raw.pop().unwrap_or_default();
        let sw1 = raw.pop().unwrap_or_default();
        Self::new(raw, sw1, sw2)
    }

    /// Number of data bytes received.
    pub fn rx_data_len(&self) -> usize {
        self.data.len()
    }

    /// SW1 SW2 as one big-endian word.
    pub fn status_word(&self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    /// SW1 SW2 = 90 00
    pub fn is_success(&self) -> bool {
        self.status_word() == 0x9000
    }
}

/// Prologue supplied with a T=1 exchange.
///
/// Only the block type carried by `pcb` is honoured: sequence and chaining
/// bits are managed by the transport, and the NAD on the wire is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prologue {
    /// Node address; not put on the wire
    pub nad: u8,
    /// Block type: `0x00` for an I-block or an S-block request PCB
    pub pcb: u8,
    /// Informational; the I-field slice decides the length
    pub length: u8,
}

impl Prologue {
    /// Prologue for an I-block carrying `length` bytes.
    pub fn information(length: u8) -> Self {
        Self {
            nad: 0,
            pcb: 0x00,
            length,
        }
    }

    /// Prologue for a supervisory request.
    pub fn supervisory(pcb: u8, length: u8) -> Self {
        Self { nad: 0, pcb, length }
    }
}
