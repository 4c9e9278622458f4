// libsmartcard/src/config.rs
//! Session configuration resolved when a session is built.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_REFERENCE_CLOCK_HZ, DEFAULT_SYSTEM_CLOCK_HZ, MAX_IFS, MIN_IFS};
use crate::types::EdcMode;
use crate::{Error, Result};

/// Options that change how the transport behaves for one reader.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Clock supplied to the card (Hz)
    pub reference_clock_hz: u32,
    /// Clock feeding the UART baud generator (Hz)
    pub system_clock_hz: u32,
    /// EDC used when the ATR carries no TC3 and the EMV profile is off
    pub edc_mode: EdcMode,
    /// UART handles the inverse convention and guard time itself
    pub hardware_convention: bool,
    /// EMV timing and EDC profile
    pub emv_timing: bool,
    /// Send S(RESYNC request) once the T=1 retry budget is spent
    pub resync_enabled: bool,
    /// Answer S(ABORT request) before deactivating
    pub abort_response_before_deactivation: bool,
    /// Deactivate when a character arrives after CWT
    pub deactivate_on_cwt_exceeded: bool,
    /// Accept TA1 = 0xD6 in specific mode
    pub accept_ta1_d6: bool,
    /// IFSD announced in S(IFS request)
    pub ifsd: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reference_clock_hz: DEFAULT_REFERENCE_CLOCK_HZ,
            system_clock_hz: DEFAULT_SYSTEM_CLOCK_HZ,
            edc_mode: EdcMode::Lrc,
            hardware_convention: false,
            emv_timing: true,
            resync_enabled: false,
            abort_response_before_deactivation: false,
            deactivate_on_cwt_exceeded: false,
            accept_ta1_d6: true,
            ifsd: MAX_IFS,
        }
    }
}

impl SessionConfig {
    /// Profile with ISO timing and the configured EDC honoured.
    pub fn iso() -> Self {
        Self {
            emv_timing: false,
            ..Self::default()
        }
    }

    /// Allow S(RESYNCH) recovery.
    pub fn with_resync(mut self, enabled: bool) -> Self {
        self.resync_enabled = enabled;
        self
    }

    /// EDC used when the ATR does not choose one.
    pub fn with_edc(mut self, edc: EdcMode) -> Self {
        self.edc_mode = edc;
        self
    }

    /// Let the UART handle inverse convention itself.
    pub fn with_hardware_convention(mut self, enabled: bool) -> Self {
        self.hardware_convention = enabled;
        self
    }

    /// Reject clock, IFSD and timing values the session cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.reference_clock_hz == 0 || self.system_clock_hz == 0 {
            return Err(Error::InvalidConfig("clock frequencies must be non-zero".into()));
        }
        if !(MIN_IFS..=MAX_IFS).contains(&self.ifsd) {
            return Err(Error::InvalidConfig(format!(
                "IFSD {:#04x} outside {:#04x}..={:#04x}",
                self.ifsd, MIN_IFS, MAX_IFS
            )));
        }
        Ok(())
    }
}
