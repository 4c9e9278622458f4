// libsmartcard/src/error.rs

//! Crate-wide error type and the flat status reported to callers.

use derive_more::Display;
use thiserror::Error;

/// Every failure a transport, parser or protocol layer can report. Session
/// operations shut the card down before surfacing one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No card in the slot, or the card has not answered to reset yet.
    #[error("card not present")]
    CardNotPresent,

    /// The ATR breaks a structural rule (bad TS, unusable TA3).
    #[error("invalid ATR data: {0}")]
    AtrDataInvalid(String),

    /// Neither reset produced a usable ATR.
    #[error("no valid answer to reset")]
    NoAtrResponse,

    /// The command APDU or its T=0 response is malformed.
    #[error("invalid T=0 command APDU: {0}")]
    InvalidCommandApduT0(String),

    /// The prologue or I-field handed to a T=1 exchange is unusable.
    #[error("invalid T=1 command: {0}")]
    InvalidCommandApduT1(String),

    /// The card went quiet past the work waiting time.
    #[error("card did not respond")]
    CardNoResponse,

    /// T=0 byte that is neither NULL, ACK nor a status byte.
    #[error("unexpected procedure byte {0:#04x}")]
    ProcedureByte(u8),

    /// PPS answer missing, malformed or not matching the request.
    #[error("PPS exchange failed: {0}")]
    PpsFailed(String),

    /// CRC trailer of a received block does not match.
    #[error("receive CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ReceiveCrc {
        /// CRC computed over the received bytes
        expected: u16,
        /// CRC carried by the block
        actual: u16,
    },

    /// LRC of a received block does not cancel out.
    #[error("receive LRC mismatch: residue {residue:#04x}")]
    ReceiveLrc {
        /// XOR of the whole block, trailer included
        residue: u8,
    },

    /// The transport kept refusing a character.
    #[error("transmit failed after {attempts} attempts")]
    TransmitFailed {
        /// Send attempts made for the failing character
        attempts: usize,
    },

    /// T=1 error recovery ran out of retries.
    #[error("T=1 retry budget exhausted")]
    T1RetryExhausted,

    /// The card refused or garbled a supervisory exchange.
    #[error("T=1 supervisory block error: {0}")]
    T1SBlockResponse(String),

    /// A received block violates the T=1 block structure.
    #[error("T=1 invalid block: {0}")]
    T1InvalidBlock(String),

    /// A buffer is shorter or longer than its framing announces.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Length the framing calls for
        expected: usize,
        /// Length actually seen
        actual: usize,
    },

    /// A one-byte checksum (TCK, PCK) does not add up.
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// Value that would have made the checksum hold
        expected: u8,
        /// Value received
        actual: u8,
    },

    /// A character arrived with a parity error.
    #[error("parity error on received character")]
    Parity,

    /// Nothing arrived within the requested number of ETU.
    #[error("operation timed out")]
    Timeout,

    /// A session was built without a transport.
    #[error("no transport configured")]
    TransportNotConfigured,

    /// A `SessionConfig` field is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a public card operation, one value per surfaced error kind.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// The operation completed.
    #[display(fmt = "transaction successful")]
    Successful,
    /// No card, or no active session.
    #[display(fmt = "card not present")]
    CardNotPresent,
    /// Structurally invalid ATR.
    #[display(fmt = "ATR data error")]
    AtrDataInvalid,
    /// No usable ATR after the reset sequence.
    #[display(fmt = "no ATR response")]
    NoAtrResponse,
    /// Malformed T=0 command or response.
    #[display(fmt = "invalid T=0 command APDU")]
    InvalidCommandApduT0,
    /// Malformed T=1 command.
    #[display(fmt = "invalid T=1 command APDU")]
    InvalidCommandApduT1,
    /// The card stopped answering.
    #[display(fmt = "card no response")]
    CardNoResponse,
    /// Unexpected T=0 procedure byte.
    #[display(fmt = "procedure byte error")]
    ProcedureByte,
    /// PPS negotiation failed.
    #[display(fmt = "PPS error")]
    PpsFailed,
    /// CRC mismatch on a received block.
    #[display(fmt = "receive CRC error")]
    ReceiveCrc,
    /// LRC or parity error on received data.
    #[display(fmt = "receive LRC error")]
    ReceiveLrc,
    /// A character could not be sent.
    #[display(fmt = "transmit error")]
    TransmitFailed,
    /// T=1 retries exhausted.
    #[display(fmt = "T=1 retry error")]
    T1RetryExhausted,
    /// Supervisory exchange failed.
    #[display(fmt = "T=1 S-block response error")]
    T1SBlockResponse,
    /// Invalid T=1 block.
    #[display(fmt = "T=1 invalid block")]
    T1InvalidBlock,
}

impl TransactionStatus {
    /// Status of any operation result.
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => TransactionStatus::Successful,
            Err(e) => e.status(),
        }
    }

    /// `true` only for `Successful`.
    pub fn is_successful(&self) -> bool {
        matches!(self, TransactionStatus::Successful)
    }
}

impl Error {
    /// Map an error onto the flat status taxonomy reported to callers.
    pub fn status(&self) -> TransactionStatus {
        match self {
            Error::CardNotPresent | Error::TransportNotConfigured | Error::InvalidConfig(_) => {
                TransactionStatus::CardNotPresent
            }
            Error::AtrDataInvalid(_) => TransactionStatus::AtrDataInvalid,
            Error::NoAtrResponse => TransactionStatus::NoAtrResponse,
            Error::InvalidCommandApduT0(_) => TransactionStatus::InvalidCommandApduT0,
            Error::InvalidCommandApduT1(_) => TransactionStatus::InvalidCommandApduT1,
            Error::CardNoResponse | Error::Timeout => TransactionStatus::CardNoResponse,
            Error::ProcedureByte(_) => TransactionStatus::ProcedureByte,
            Error::PpsFailed(_) => TransactionStatus::PpsFailed,
            Error::ReceiveCrc { .. } => TransactionStatus::ReceiveCrc,
            Error::ReceiveLrc { .. } | Error::Parity => TransactionStatus::ReceiveLrc,
            Error::TransmitFailed { .. } => TransactionStatus::TransmitFailed,
            Error::T1RetryExhausted => TransactionStatus::T1RetryExhausted,
            Error::T1SBlockResponse(_) => TransactionStatus::T1SBlockResponse,
            Error::T1InvalidBlock(_)
            | Error::InvalidLength { .. }
            | Error::ChecksumMismatch { .. } => TransactionStatus::T1InvalidBlock,
        }
    }
}
