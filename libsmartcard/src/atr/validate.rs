// libsmartcard/src/atr/validate.rs

//! Acceptance rules for ATRs, checked after parsing.

use derive_more::Display;

use crate::atr::Atr;
use crate::constants::{MAX_IFS, MIN_IFS, TC1_MINIMUM_GUARD};
use crate::types::ResetType;

/// A rule an ATR breaks. Any violation rejects the ATR.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum AtrViolation {
    /// Cold-reset ATR with a nonzero TB1
    #[display(fmt = "TB1 {:#04x} must be zero after a cold reset", _0)]
    Tb1NonZero(u8),
    /// Cold-reset ATR without TB1
    #[display(fmt = "TB1 missing after a cold reset")]
    Tb1Missing,
    /// TD1 names neither T=0 nor T=1
    #[display(fmt = "TD1 announces unsupported protocol T={}", _0)]
    UnsupportedProtocol(u8),
    /// Specific mode protocol differs from the first offered one
    #[display(fmt = "TA2 {:#04x} names a protocol other than TD1's", _0)]
    Ta2ProtocolMismatch(u8),
    /// TA2 bit 5 set
    #[display(fmt = "TA2 {:#04x} requests implicit parameters", _0)]
    Ta2ImplicitParameters(u8),
    /// TB2 is not allowed
    #[display(fmt = "TB2 present")]
    Tb2Present,
    /// A zero work waiting integer
    #[display(fmt = "TC2 is zero")]
    Tc2Zero,
    /// TD2 does not follow TD1's protocol
    #[display(fmt = "TD2 {:#04x} inconsistent with TD1 {:#04x}", td2, td1)]
    Td2Inconsistent {
        /// TD1 as received
        td1: u8,
        /// TD2 as received
        td2: u8,
    },
    /// IFSC outside 0x10..=0xFE
    #[display(fmt = "TA3 {:#04x} outside the IFS range", _0)]
    Ta3OutOfRange(u8),
    /// T=1 card without waiting integers
    #[display(fmt = "TB3 missing for T=1")]
    Tb3Missing,
    /// BWI from TB3 above the EMV limit
    #[display(fmt = "BWI {} exceeds 4", _0)]
    BwiTooLarge(u8),
    /// CWI from TB3 above the EMV limit
    #[display(fmt = "CWI {} exceeds 5", _0)]
    CwiTooLarge(u8),
    /// Character waiting time shorter than the guard time
    #[display(fmt = "2^CWI ({}) not above the extra guard time N+1 ({})", pow, guard)]
    CwiBelowGuardTime {
        /// 2^CWI
        pow: u16,
        /// TC1 + 1
        guard: u16,
    },
    /// Only LRC is accepted
    #[display(fmt = "TC3 {:#04x} must be zero", _0)]
    Tc3NonZero(u8),
}

/// Structural checks applied before a card is accepted. `reset` is the
/// reset that produced the ATR; TB1 rules only bind after a cold reset.
pub fn validate(atr: &Atr, reset: ResetType) -> Vec<AtrViolation> {
    let mut out = Vec::new();

    if reset == ResetType::Cold {
        match atr.tb(1) {
            Some(0) => {}
            Some(tb1) => out.push(AtrViolation::Tb1NonZero(tb1)),
            None => out.push(AtrViolation::Tb1Missing),
        }
    }

    let td1_protocol = atr.td(1).map(|td| td & 0x0F).unwrap_or(0);
    if td1_protocol > 1 {
        out.push(AtrViolation::UnsupportedProtocol(td1_protocol));
    }

    if let Some(ta2) = atr.ta(2) {
        if ta2 & 0x0F != td1_protocol {
            out.push(AtrViolation::Ta2ProtocolMismatch(ta2));
        }
        if ta2 & 0x10 != 0 {
            out.push(AtrViolation::Ta2ImplicitParameters(ta2));
        }
    }

    if atr.tb(2).is_some() {
        out.push(AtrViolation::Tb2Present);
    }

    if atr.tc(2) == Some(0) {
        out.push(AtrViolation::Tc2Zero);
    }

    if let Some(td2) = atr.td(2) {
        let td1 = atr.td(1).unwrap_or(0);
        let consistent = match td1_protocol {
            1 => td2 & 0x0F == 0x01,
            0 => matches!(td2 & 0x0F, 0x01 | 0x0E),
            _ => true,
        };
        if !consistent {
            out.push(AtrViolation::Td2Inconsistent { td1, td2 });
        }
    }

    if let Some(ta3) = atr.ta(3) {
        if !(MIN_IFS..=MAX_IFS).contains(&ta3) {
            out.push(AtrViolation::Ta3OutOfRange(ta3));
        }
    }

    if atr.indicates_t1() {
        match atr.tb(3) {
            None => out.push(AtrViolation::Tb3Missing),
            Some(tb3) => {
                let bwi = tb3 >> 4;
                let cwi = tb3 & 0x0F;
                if bwi > 4 {
                    out.push(AtrViolation::BwiTooLarge(bwi));
                }
                if cwi > 5 {
                    out.push(AtrViolation::CwiTooLarge(cwi));
                }
                // N = TC1, with 0xFF counting as N+1 = 0
                let guard = match atr.tc(1).unwrap_or(0) {
                    TC1_MINIMUM_GUARD => 0,
                    n => n as u16 + 1,
                };
                let pow = 1u16 << cwi;
                if pow <= guard {
                    out.push(AtrViolation::CwiBelowGuardTime { pow, guard });
                }
            }
        }
    }

    if let Some(tc3) = atr.tc(3) {
        if tc3 != 0 {
            out.push(AtrViolation::Tc3NonZero(tc3));
        }
    }

    out
}
