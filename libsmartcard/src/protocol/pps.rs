// libsmartcard/src/protocol/pps.rs

//! Protocol and parameter selection.

use std::fmt;

use crate::constants::{MAX_PPS_LEN, PPS_RESPONSE_TIMEOUT_ETU, PPSS};
use crate::protocol::edc::lrc;
use crate::protocol::link::Link;
use crate::transport::ByteTransport;
use crate::types::ProtocolType;
use crate::utils::HexBytes;
use crate::{Error, Result};

const PPS1_PRESENT: u8 = 0x10;
const PPS2_PRESENT: u8 = 0x20;
const PPS3_PRESENT: u8 = 0x40;

/// Number of bytes a PPS message with this PPS0 occupies, PCK included.
pub fn message_len(pps0: u8) -> usize {
    3 + [PPS1_PRESENT, PPS2_PRESENT, PPS3_PRESENT]
        .iter()
        .filter(|&&flag| pps0 & flag != 0)
        .count()
}

/// PPSS PPS0 [PPS1] [PPS2] [PPS3] PCK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpsMessage {
    bytes: Vec<u8>,
}

impl PpsMessage {
    /// Build a request for `protocol` (0 or 1) with a PCK that checks.
    pub fn request(protocol: u8, pps1: Option<u8>, pps2: Option<u8>, pps3: Option<u8>) -> Self {
        let mut pps0 = protocol & 0x0F;
        let mut bytes = vec![PPSS, 0];
        for (flag, value) in [(PPS1_PRESENT, pps1), (PPS2_PRESENT, pps2), (PPS3_PRESENT, pps3)] {
            if let Some(v) = value {
                pps0 |= flag;
                bytes.push(v);
            }
        }
        bytes[1] = pps0;
        bytes.push(lrc(&bytes));
        Self { bytes }
    }

    /// Take a caller supplied request as is. Only the framing is checked;
    /// the PCK goes out unchanged.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 3 {
            return Err(Error::PpsFailed(format!(
                "request of {} bytes is too short",
                bytes.len()
            )));
        }
        if bytes[0] != PPSS {
            return Err(Error::PpsFailed(format!("PPSS {:#04x}", bytes[0])));
        }
        let expected = message_len(bytes[1]);
        if bytes.len() != expected {
            return Err(Error::PpsFailed(format!(
                "PPS0 {:#04x} announces {} bytes, got {}",
                bytes[1],
                expected,
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Bytes as sent or received, PPSS through PCK.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Format byte.
    pub fn pps0(&self) -> u8 {
        self.bytes[1]
    }

    fn optional(&self, flag: u8) -> Option<u8> {
        if self.pps0() & flag == 0 {
            return None;
        }
        let mut idx = 2;
        for f in [PPS1_PRESENT, PPS2_PRESENT] {
            if f < flag && self.pps0() & f != 0 {
                idx += 1;
            }
        }
        self.bytes.get(idx).copied()
    }

    /// Fi/Di, if PPS0 announces it.
    pub fn pps1(&self) -> Option<u8> {
        self.optional(PPS1_PRESENT)
    }

    /// PPS2, if present.
    pub fn pps2(&self) -> Option<u8> {
        self.optional(PPS2_PRESENT)
    }

    /// PPS3, if present.
    pub fn pps3(&self) -> Option<u8> {
        self.optional(PPS3_PRESENT)
    }

    /// Check byte.
    pub fn pck(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    /// Protocol selected by the low nibble of PPS0.
    pub fn protocol(&self) -> ProtocolType {
        ProtocolType::from_nibble(self.pps0())
    }
}

impl fmt::Display for PpsMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HexBytes(&self.bytes))
    }
}

/// Check a card's answer against the request that caused it.
///
/// PPS1 may come back different (the card proposes another rate); PPS2
/// and PPS3, when present in the answer, must echo the request.
pub fn validate_response(request: &PpsMessage, response: &[u8]) -> Result<PpsMessage> {
    if response.len() <= 2 {
        return Err(Error::PpsFailed(format!(
            "response of {} bytes",
            response.len()
        )));
    }
    if response[0] != PPSS {
        return Err(Error::PpsFailed(format!("response PPSS {:#04x}", response[0])));
    }
    if response[1] & 0x0F != request.pps0() & 0x0F {
        return Err(Error::PpsFailed(format!(
            "protocol T={} answered with T={}",
            request.pps0() & 0x0F,
            response[1] & 0x0F
        )));
    }
    let answer = PpsMessage::from_bytes(response)?;
    if answer.pps2().is_some() && answer.pps2() != request.pps2() {
        return Err(Error::PpsFailed("PPS2 not echoed".into()));
    }
    if answer.pps3().is_some() && answer.pps3() != request.pps3() {
        return Err(Error::PpsFailed("PPS3 not echoed".into()));
    }
    let residue = lrc(response);
    if residue != 0 {
        return Err(Error::PpsFailed(format!("PCK residue {:#04x}", residue)));
    }
    Ok(answer)
}

/// Send `request` and collect the answer until the line stays quiet for
/// the PPS response timeout.
pub fn negotiate<T: ByteTransport + ?Sized>(
    link: &mut Link<'_, T>,
    request: &PpsMessage,
) -> Result<PpsMessage> {
    log::debug!("PPS request {}", request);
    link.send(request.as_bytes())?;

    let mut response = Vec::with_capacity(MAX_PPS_LEN);
    loop {
        match link.receive(PPS_RESPONSE_TIMEOUT_ETU) {
            Ok(b) => {
                response.push(b);
                if response.len() >= MAX_PPS_LEN {
                    return Err(Error::PpsFailed("response too long".into()));
                }
            }
            Err(Error::Timeout) => break,
            Err(Error::Parity) => return Err(Error::PpsFailed("parity error".into())),
            Err(e) => return Err(e),
        }
    }

    let answer = validate_response(request, &response)?;
    log::debug!("PPS response {}", answer);
    Ok(answer)
}
