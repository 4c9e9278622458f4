// libsmartcard/src/protocol/block.rs

//! T=1 block layout: prologue, information field and PCB encoding.

use derive_more::Display;

use crate::protocol::edc;
use crate::protocol::parser::{byte_at, ensure_exact_len, ensure_len, slice_at};
use crate::types::EdcMode;
use crate::utils::HexBytes;
use crate::{Error, Result};

/// Protocol control byte values.
pub mod pcb {
    /// I-block with N(S) = 0 and M = 0
    pub const I_BLOCK: u8 = 0x00;
    /// N(S) of an I-block
    pub const I_SEQUENCE: u8 = 0x40;
    /// More-data bit of an I-block
    pub const I_MORE: u8 = 0x20;

    /// R-block without error
    pub const R_BLOCK: u8 = 0x80;
    /// N(R) of an R-block
    pub const R_SEQUENCE: u8 = 0x10;
    /// R-block code: EDC or parity error
    pub const R_ERR_EDC: u8 = 0x01;
    /// R-block code: other error
    pub const R_ERR_OTHER: u8 = 0x02;

    /// S(RESYNCH request)
    pub const S_RESYNC_REQUEST: u8 = 0xC0;
    /// S(IFS request)
    pub const S_IFS_REQUEST: u8 = 0xC1;
    /// S(ABORT request)
    pub const S_ABORT_REQUEST: u8 = 0xC2;
    /// S(WTX request)
    pub const S_WTX_REQUEST: u8 = 0xC3;
    /// S(RESYNCH response)
    pub const S_RESYNC_RESPONSE: u8 = 0xE0;
    /// S(IFS response)
    pub const S_IFS_RESPONSE: u8 = 0xE1;
    /// S(ABORT response)
    pub const S_ABORT_RESPONSE: u8 = 0xE2;
    /// S(WTX response)
    pub const S_WTX_RESPONSE: u8 = 0xE3;
    /// Set on S-block responses
    pub const S_RESPONSE: u8 = 0x20;
}

/// Block type encoded in the two high PCB bits.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Carries application data
    #[display(fmt = "I")]
    Information,
    /// Acknowledgement or error report
    #[display(fmt = "R")]
    ReceiveReady,
    /// Link control
    #[display(fmt = "S")]
    Supervisory,
}

impl BlockKind {
    /// Classify a PCB.
    pub fn of(pcb: u8) -> Self {
        if pcb & 0x80 == 0 {
            BlockKind::Information
        } else if pcb & 0x40 == 0 {
            BlockKind::ReceiveReady
        } else {
            BlockKind::Supervisory
        }
    }
}

/// Function of an S-block, from PCB bits 0..=4.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Supervisory {
    /// Resynchronisation
    #[display(fmt = "RESYNC")]
    Resync,
    /// Information field size change
    #[display(fmt = "IFS")]
    Ifs,
    /// Chain abort
    #[display(fmt = "ABORT")]
    Abort,
    /// Waiting time extension
    #[display(fmt = "WTX")]
    Wtx,
}

impl Supervisory {
    /// `None` for RFU codes.
    pub fn of(pcb: u8) -> Option<Self> {
        match pcb & 0x1F {
            0 => Some(Supervisory::Resync),
            1 => Some(Supervisory::Ifs),
            2 => Some(Supervisory::Abort),
            3 => Some(Supervisory::Wtx),
            _ => None,
        }
    }

    /// PCB of the request form.
    pub fn request_pcb(&self) -> u8 {
        pcb::S_RESYNC_REQUEST | *self as u8
    }

    /// PCB of the response form.
    pub fn response_pcb(&self) -> u8 {
        self.request_pcb() | pcb::S_RESPONSE
    }
}

/// One T=1 block: prologue (NAD, PCB, LEN), information field and EDC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Node address
    pub nad: u8,
    /// Protocol control byte
    pub pcb: u8,
    /// Information field; LEN is its length
    pub data: Vec<u8>,
}

impl Block {
    /// Largest information field a block can carry.
    pub const MAX_INF: usize = 254;

    /// I-block with N(S) = `sequence` and the M bit from `more`.
    pub fn information(sequence: bool, more: bool, data: &[u8]) -> Self {
        let mut pcb = pcb::I_BLOCK;
        if sequence {
            pcb |= pcb::I_SEQUENCE;
        }
        if more {
            pcb |= pcb::I_MORE;
        }
        Self {
            nad: 0,
            pcb,
            data: data.to_vec(),
        }
    }

    /// R-block acknowledging up to N(R) = `sequence`, with an optional error code.
    pub fn receive_ready(sequence: bool, error: u8) -> Self {
        let mut pcb = pcb::R_BLOCK | (error & 0x03);
        if sequence {
            pcb |= pcb::R_SEQUENCE;
        }
        Self {
            nad: 0,
            pcb,
            data: Vec::new(),
        }
    }

    /// S-block with the given PCB and information field.
    pub fn supervisory(pcb: u8, data: &[u8]) -> Self {
        Self {
            nad: 0,
            pcb,
            data: data.to_vec(),
        }
    }

    /// Type from the PCB.
    pub fn kind(&self) -> BlockKind {
        BlockKind::of(self.pcb)
    }

    /// N(S) for an I-block, N(R) for an R-block.
    pub fn sequence(&self) -> bool {
        match self.kind() {
            BlockKind::Information => self.pcb & pcb::I_SEQUENCE != 0,
            BlockKind::ReceiveReady => self.pcb & pcb::R_SEQUENCE != 0,
            BlockKind::Supervisory => false,
        }
    }

    /// M bit of an I-block.
    pub fn more(&self) -> bool {
        self.kind() == BlockKind::Information && self.pcb & pcb::I_MORE != 0
    }

    /// S-block function, `None` for other blocks or RFU codes.
    pub fn supervisory_kind(&self) -> Option<Supervisory> {
        match self.kind() {
            BlockKind::Supervisory => Supervisory::of(self.pcb),
            _ => None,
        }
    }

    /// S-block with the response bit set.
    pub fn is_response(&self) -> bool {
        self.kind() == BlockKind::Supervisory && self.pcb & pcb::S_RESPONSE != 0
    }

    /// Encode a block for the wire. With `emv` set the LRC leaves NAD out.
    pub fn encode(&self, mode: EdcMode, emv: bool) -> Result<Vec<u8>> {
        if self.data.len() > Self::MAX_INF {
            return Err(Error::InvalidLength {
                expected: Self::MAX_INF,
                actual: self.data.len(),
            });
        }

        let mut out = Vec::with_capacity(3 + self.data.len() + mode.trailer_len());
        out.push(self.nad);
        out.push(self.pcb);
        out.push(self.data.len() as u8);
        out.extend_from_slice(&self.data);
        let covered = if emv && mode == EdcMode::Lrc {
            &out[1..]
        } else {
            &out[..]
        };
        let trailer = edc::compute(mode, covered);
        out.extend_from_slice(&trailer);
        Ok(out)
    }

    /// Decode a complete received block, EDC included.
    pub fn decode(frame: &[u8], mode: EdcMode) -> Result<Self> {
        let trailer_len = mode.trailer_len();
        ensure_len(frame, 3 + trailer_len)?;

        let len = byte_at(frame, 2)? as usize;
        if len > Self::MAX_INF {
            return Err(Error::InvalidLength {
                expected: Self::MAX_INF,
                actual: len,
            });
        }
        ensure_exact_len(frame, 3 + len + trailer_len)?;

        let body_end = 3 + len;
        edc::verify(mode, &frame[..body_end], &frame[body_end..])?;

        Ok(Self {
            nad: frame[0],
            pcb: frame[1],
            data: slice_at(frame, 3, len)?.to_vec(),
        })
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-block pcb={:02X} [{}]",
            self.kind(),
            self.pcb,
            HexBytes(&self.data)
        )
    }
}
