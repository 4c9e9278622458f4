// libsmartcard/src/timing/mod.rs

//! Baud rate and wait times derived from the ATR (or a PPS response).

pub mod fd;

pub use fd::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::atr::Atr;
use crate::constants::{DEFAULT_BWI, DEFAULT_CWI, DEFAULT_WI, ETU_11, ETU_12, TC1_MINIMUM_GUARD};
use crate::types::ProtocolType;
use crate::utils::etu_to_micros;

/// Everything the link needs to pace and time out characters. All wait
/// times are in ETU at `baud_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingParameters {
    /// F and D in force
    pub fd: FdParameters,
    /// Bits per second at the reference clock
    pub baud_rate: u32,
    /// Character guard time, start bit to start bit
    pub cgt_etu: u32,
    /// T=0 work waiting time
    pub t0_wwt_etu: u32,
    /// T=1 character waiting time
    pub t1_cwt_etu: u32,
    /// T=1 block waiting time
    pub t1_bwt_etu: u32,
}

impl TimingParameters {
    /// Parameters in force before any ATR has been accepted.
    pub fn initial(clock_hz: u32) -> Self {
        Self::compute(&Atr::default(), FdParameters::default(), ProtocolType::T0, clock_hz)
    }

    /// Derive guard and wait times from the ATR for `protocol` at `fd`.
    pub fn compute(atr: &Atr, fd: FdParameters, protocol: ProtocolType, clock_hz: u32) -> Self {
        let cgt_etu = match atr.tc(1).unwrap_or(0) {
            TC1_MINIMUM_GUARD if protocol == ProtocolType::T1 => ETU_11,
            TC1_MINIMUM_GUARD => ETU_12,
            n => ETU_12 + n as u32,
        };

        let wi = atr.tc(2).unwrap_or(DEFAULT_WI) as u32;
        let t0_wwt_etu = fd.scale_by_d(wi * 960);

        // TB2 wins over TB3
        let tb = atr.tb(2).or_else(|| atr.tb(3));
        let cwi = tb.map(|b| b & 0x0F).unwrap_or(DEFAULT_CWI) as u32;
        let bwi = tb.map(|b| b >> 4).unwrap_or(DEFAULT_BWI) as u32;

        let t1_cwt_etu = ETU_11 + (1u32 << cwi);
        let unit = 960u64 * fd.d_numerator as u64;
        let bwt = ETU_11 as u64 + (1u64 << bwi) * unit + unit;

        Self {
            fd,
            baud_rate: fd.baud_rate(clock_hz),
            cgt_etu,
            t0_wwt_etu,
            t1_cwt_etu,
            t1_bwt_etu: bwt.min(u32::MAX as u64) as u32,
        }
    }

    /// WWT plus the D x 480 ETU margin the EMV profile grants.
    pub fn emv_wwt_etu(&self) -> u32 {
        self.t0_wwt_etu.saturating_add(self.fd.scale_by_d(480))
    }

    /// Per-character T=0 timeout for the active profile.
    pub fn work_wait_etu(&self, emv: bool) -> u32 {
        if emv {
            self.emv_wwt_etu()
        } else {
            self.t0_wwt_etu
        }
    }

    /// Length of one ETU in microseconds.
    pub fn etu_us(&self) -> u64 {
        etu_to_micros(1, self.baud_rate)
    }

    /// UART divisor for a baud generator running at `system_clock_hz / 4`.
    pub fn baud_divisor(&self, system_clock_hz: u32) -> u16 {
        if self.baud_rate == 0 {
            return u16::MAX;
        }
        let div = (system_clock_hz / 4 / self.baud_rate).saturating_sub(1);
        div.min(u16::MAX as u32) as u16
    }

    /// Guard time the link adds in software on top of the UART's own
    /// character frame (12 ETU for T=0, 11 for T=1).
    pub fn extra_guard_etu(&self, protocol: ProtocolType) -> u32 {
        let base = match protocol {
            ProtocolType::T1 => ETU_11,
            _ => ETU_12,
        };
        self.cgt_etu.saturating_sub(base)
    }
}
