// libsmartcard/src/atr/mod.rs

//! Answer-To-Reset parsing.
//!
//! `Atr::parse` walks the TDi chain and records every interface byte group
//! it finds. Length and TCK rules are checked separately by
//! `Atr::check_integrity`, and the profile rules applied before a card is
//! accepted live in `validate`.

pub mod validate;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_IFSC, DEFAULT_TA1, MAX_ATR_LEN, MAX_IFS, MIN_IFS, TS_DIRECT};
use crate::types::{Convention, EdcMode, PpsSupport, ProtocolType};
use crate::utils::HexBytes;
use crate::{Error, Result};

pub use validate::{AtrViolation, validate};

/// TAi TBi TCi TDi of one group; `None` when the bitmask left it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterfaceGroup {
    /// TAi
    pub ta: Option<u8>,
    /// TBi
    pub tb: Option<u8>,
    /// TCi
    pub tc: Option<u8>,
    /// Also tells whether another group follows
    pub td: Option<u8>,
}

/// Parsed answer to reset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Atr {
    raw: Vec<u8>,
    convention: Convention,
    groups: Vec<InterfaceGroup>,
    interface_count: usize,
    historical_start: usize,
    expected_len: usize,
    truncated: bool,
}

impl Default for Atr {
    /// TS and a T0 announcing nothing. Used for timing before any ATR.
    fn default() -> Self {
        Self {
            raw: vec![TS_DIRECT, 0x00],
            convention: Convention::Direct,
            groups: vec![InterfaceGroup::default()],
            interface_count: 0,
            historical_start: 2,
            expected_len: 2,
            truncated: false,
        }
    }
}

struct Cursor<'a> {
    raw: &'a [u8],
    pos: usize,
    indicated: usize,
    truncated: bool,
}

impl Cursor<'_> {
    fn take_if(&mut self, present: bool) -> Option<u8> {
        if !present {
            return None;
        }
        self.indicated += 1;
        match self.raw.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Some(b)
            }
            None => {
                self.truncated = true;
                None
            }
        }
    }
}

impl Atr {
    /// Parse a captured ATR. TS must be 0x3B or 0x03 and TA3, when
    /// present, must be a usable IFS.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::InvalidLength {
                expected: 2,
                actual: raw.len(),
            });
        }
        if raw.len() > MAX_ATR_LEN {
            return Err(Error::InvalidLength {
                expected: MAX_ATR_LEN,
                actual: raw.len(),
            });
        }

        let convention = Convention::from_ts(raw[0])
            .ok_or_else(|| Error::AtrDataInvalid(format!("TS {:#04x}", raw[0])))?;

        let t0 = raw[1];
        let mut cursor = Cursor {
            raw,
            pos: 2,
            indicated: 0,
            truncated: false,
        };
        let mut groups = Vec::new();
        let mut mask = t0 >> 4;
        loop {
            let group = InterfaceGroup {
                ta: cursor.take_if(mask & 0x1 != 0),
                tb: cursor.take_if(mask & 0x2 != 0),
                tc: cursor.take_if(mask & 0x4 != 0),
                td: cursor.take_if(mask & 0x8 != 0),
            };
            groups.push(group);
            match group.td {
                Some(td) if td & 0xF0 != 0 && !cursor.truncated => mask = td >> 4,
                _ => break,
            }
        }

        if let Some(ta3) = groups.get(2).and_then(|g| g.ta) {
            if !(MIN_IFS..=MAX_IFS).contains(&ta3) {
                return Err(Error::AtrDataInvalid(format!("TA3 {:#04x} is not an IFS", ta3)));
            }
        }

        let historical = (t0 & 0x0F) as usize;
        Ok(Self {
            raw: raw.to_vec(),
            convention,
            groups,
            interface_count: cursor.indicated,
            historical_start: cursor.pos,
            expected_len: 2 + cursor.indicated + historical,
            truncated: cursor.truncated,
        })
    }

    /// Length and TCK rules: T=1 requires a TCK, T=0 alone accepts either
    /// an exact length or a trailing TCK. The XOR of T0..=TCK must be zero.
    pub fn check_integrity(&self) -> Result<()> {
        let actual = self.raw.len();
        let expected = self.expected_len;
        if actual == expected && !self.truncated {
            if self.indicates_t1() {
                return Err(Error::AtrDataInvalid("TCK missing for T=1".into()));
            }
            Ok(())
        } else if actual == expected + 1 {
            let residue = self.raw[1..].iter().fold(0u8, |acc, &b| acc ^ b);
            if residue != 0 {
                let tck = self.raw[expected];
                return Err(Error::ChecksumMismatch {
                    expected: residue ^ tck,
                    actual: tck,
                });
            }
            Ok(())
        } else {
            Err(Error::InvalidLength { expected, actual })
        }
    }

    /// Bytes as received, TS first.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Initial character, after convention handling.
    pub fn ts(&self) -> u8 {
        self.raw[0]
    }

    /// Format byte: Y1 in the high nibble, K in the low.
    pub fn t0(&self) -> u8 {
        self.raw[1]
    }

    /// Convention announced by TS.
    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// All interface byte groups in order.
    pub fn groups(&self) -> &[InterfaceGroup] {
        &self.groups
    }

    /// Interface byte group `i`, 1-based as in TAi.
    pub fn group(&self, i: usize) -> Option<&InterfaceGroup> {
        i.checked_sub(1).and_then(|idx| self.groups.get(idx))
    }

    /// TAi for 1-based `i`.
    pub fn ta(&self, i: usize) -> Option<u8> {
        self.group(i).and_then(|g| g.ta)
    }

    /// TBi for 1-based `i`.
    pub fn tb(&self, i: usize) -> Option<u8> {
        self.group(i).and_then(|g| g.tb)
    }

    /// TCi for 1-based `i`.
    pub fn tc(&self, i: usize) -> Option<u8> {
        self.group(i).and_then(|g| g.tc)
    }

    /// TDi for 1-based `i`.
    pub fn td(&self, i: usize) -> Option<u8> {
        self.group(i).and_then(|g| g.td)
    }

    /// Interface bytes in ATR order.
    pub fn interface_bytes(&self) -> Vec<u8> {
        self.groups
            .iter()
            .flat_map(|g| [g.ta, g.tb, g.tc, g.td])
            .flatten()
            .collect()
    }

    /// Interface bytes the chain announced.
    pub fn interface_byte_count(&self) -> usize {
        self.interface_count
    }

    /// TA1, or the default F=372 D=1 encoding when absent.
    pub fn ta1(&self) -> u8 {
        self.ta(1).unwrap_or(DEFAULT_TA1)
    }

    /// The K historical bytes, cut short if the ATR is.
    pub fn historical_bytes(&self) -> &[u8] {
        let start = self.historical_start.min(self.raw.len());
        let end = (start + (self.t0() & 0x0F) as usize).min(self.raw.len());
        &self.raw[start..end]
    }

    /// Byte following the historical bytes, if the ATR has one.
    pub fn tck(&self) -> Option<u8> {
        if self.truncated {
            return None;
        }
        self.raw.get(self.expected_len).copied()
    }

    /// 2 + interface bytes + historical bytes.
    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// The chain promised bytes the capture did not contain.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Protocol announced by TD1 (T=0 when TD1 is absent).
    pub fn protocol(&self) -> ProtocolType {
        match self.td(1) {
            Some(td1) => ProtocolType::from_nibble(td1),
            None => ProtocolType::T0,
        }
    }

    /// TD1 or TD2 names T=1, which makes TCK mandatory.
    pub fn indicates_t1(&self) -> bool {
        [self.td(1), self.td(2)]
            .iter()
            .flatten()
            .any(|td| td & 0x0F == 0x01)
    }

    /// TA2 present: the card starts in specific mode.
    pub fn is_specific_mode(&self) -> bool {
        self.ta(2).is_some()
    }

    /// What TA2 allows after this ATR.
    pub fn pps_support(&self) -> PpsSupport {
        match self.ta(2) {
            None => PpsSupport::Allowed,
            Some(ta2) if ta2 & 0x80 != 0 => PpsSupport::NotAllowed,
            Some(_) => PpsSupport::AllowedAfterWarmReset,
        }
    }

    /// IFSC announced by TA3.
    pub fn ifsc(&self) -> u8 {
        self.ta(3).unwrap_or(DEFAULT_IFSC)
    }

    /// EDC announced by TC3, if any.
    pub fn edc_mode(&self) -> Option<EdcMode> {
        self.tc(3).map(EdcMode::from_tc3)
    }
}

impl fmt::Display for Atr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HexBytes(&self.raw))
    }
}
