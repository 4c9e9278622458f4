// libsmartcard/src/session/power.rs

//! Activation: reset, ATR capture and ATR acceptance.

use crate::atr::{Atr, validate};
use crate::constants::{
    ATR_INITIAL_WAIT_CLOCKS_EMV, ATR_INITIAL_WAIT_CLOCKS_ISO, ATR_INTERVAL_ETU_EMV,
    ATR_INTERVAL_ETU_ISO, ATR_TOTAL_ETU_EMV, MAX_ATR_LEN, SPECIFIC_MODE_TA1_D6,
    SPECIFIC_MODE_TA1_MAX, SPECIFIC_MODE_TA1_MIN,
};
use crate::protocol::convention;
use crate::protocol::t1::T1State;
use crate::session::handle::{CardSession, Initialized};
use crate::timing::{FdParameters, TimingParameters};
use crate::transport::ByteTransport;
use crate::types::{CardState, Convention, EdcMode, ResetType};
use crate::utils::{clocks_to_etu, etu_to_duration};
use crate::{Error, Result};

impl<T: ByteTransport> CardSession<T, Initialized> {
    /// Reset the card and read its answer. A cold reset whose ATR is
    /// unusable is retried once as a warm reset.
    pub fn power_on_atr(&mut self, reset: ResetType) -> Result<()> {
        let result = self.power_on(reset);
        self.finish(result)
    }

    fn power_on(&mut self, mut reset: ResetType) -> Result<()> {
        if !self.transport.card_present() {
            return Err(Error::CardNotPresent);
        }
        self.state = CardState::Unknown;
        self.atr = None;
        self.pps_response = None;

        loop {
            self.timing = TimingParameters::initial(self.config.reference_clock_hz);
            self.convention = Convention::Direct;
            self.transport
                .set_baud_rate_divisor(self.timing.baud_divisor(self.config.system_clock_hz))?;

            match reset {
                ResetType::Cold => self.transport.cold_reset()?,
                ResetType::Warm => self.transport.warm_reset()?,
            }
            log::debug!("{} issued", reset);

            let raw = self.capture_atr()?;
            match self.judge_atr(&raw, reset)? {
                Some(atr) => return self.accept_atr(atr),
                None if reset == ResetType::Cold => {
                    log::debug!("retrying with a warm reset");
                    reset = ResetType::Warm;
                }
                None => return Err(Error::NoAtrResponse),
            }
        }
    }

    /// Collect ATR characters until the line goes quiet, 33 bytes arrive or
    /// the EMV total window closes. Bytes after TS are returned decoded.
    fn capture_atr(&mut self) -> Result<Vec<u8>> {
        let emv = self.config.emv_timing;
        let baud = self.timing.baud_rate;
        let clock = self.config.reference_clock_hz;

        let initial_wait = if emv {
            clocks_to_etu(ATR_INITIAL_WAIT_CLOCKS_EMV, baud, clock) + 1
        } else {
            clocks_to_etu(ATR_INITIAL_WAIT_CLOCKS_ISO, baud, clock)
        };
        let interval = if emv {
            ATR_INTERVAL_ETU_EMV
        } else {
            ATR_INTERVAL_ETU_ISO
        };
        let window = etu_to_duration(ATR_TOTAL_ETU_EMV, baud);
        let deadline = emv.then(|| self.transport.now() + window);

        let mut raw = Vec::with_capacity(MAX_ATR_LEN);
        let mut conv = Convention::Direct;
        while raw.len() < MAX_ATR_LEN {
            let wait = if raw.is_empty() { initial_wait } else { interval };
            let byte = match self.transport.receive(wait) {
                Ok(b) => b,
                Err(Error::Timeout) => break,
                Err(Error::Parity) => {
                    log::warn!("parity error in ATR after {} bytes", raw.len());
                    return Err(Error::NoAtrResponse);
                }
                Err(e) => return Err(e),
            };

            if raw.is_empty() {
                conv = Convention::from_ts(byte).ok_or_else(|| {
                    log::warn!("invalid TS {:#04x}", byte);
                    Error::NoAtrResponse
                })?;
                if self.config.hardware_convention {
                    self.transport.set_convention(conv)?;
                }
                raw.push(byte);
            } else if self.config.hardware_convention {
                raw.push(byte);
            } else {
                raw.push(convention::apply(conv, byte));
            }

            if deadline.is_some_and(|d| self.transport.now() > d) {
                log::warn!("ATR window elapsed after {} bytes", raw.len());
                break;
            }
        }

        if raw.len() < 2 {
            return Err(Error::NoAtrResponse);
        }
        log::debug!("ATR captured: {}", crate::utils::HexBytes(&raw));
        Ok(raw)
    }

    /// `Ok(None)` asks for another attempt with a warm reset.
    fn judge_atr(&self, raw: &[u8], reset: ResetType) -> Result<Option<Atr>> {
        let atr = Atr::parse(raw)?;

        match atr.check_integrity() {
            Ok(()) => {}
            Err(Error::InvalidLength { expected, actual }) => {
                log::warn!("ATR length {} does not match {}", actual, expected);
                return Ok(None);
            }
            Err(e) => {
                log::warn!("ATR rejected: {}", e);
                return Err(Error::NoAtrResponse);
            }
        }

        if atr.is_specific_mode() && !self.specific_ta1_supported(atr.ta1()) {
            log::warn!("specific mode with unsupported TA1 {:#04x}", atr.ta1());
            return Ok(None);
        }

        let violations = validate(&atr, reset);
        if !violations.is_empty() {
            for v in &violations {
                log::warn!("ATR {}: {}", atr, v);
            }
            return Ok(None);
        }

        Ok(Some(atr))
    }

    fn specific_ta1_supported(&self, ta1: u8) -> bool {
        (ta1 > SPECIFIC_MODE_TA1_MIN && ta1 < SPECIFIC_MODE_TA1_MAX)
            || (self.config.accept_ta1_d6 && ta1 == SPECIFIC_MODE_TA1_D6)
    }

    fn accept_atr(&mut self, atr: Atr) -> Result<()> {
        let protocol = atr.protocol();
        let fd = if atr.is_specific_mode() {
            FdParameters::from_ta1(atr.ta1())
        } else {
            FdParameters::default()
        };
        let edc = if self.config.emv_timing {
            EdcMode::Lrc
        } else {
            atr.edc_mode().unwrap_or(self.config.edc_mode)
        };

        self.timing = TimingParameters::compute(&atr, fd, protocol, self.config.reference_clock_hz);
        self.transport
            .set_baud_rate_divisor(self.timing.baud_divisor(self.config.system_clock_hz))?;

        self.convention = atr.convention();
        self.t1 = T1State::new(atr.ifsc(), edc, self.config.emv_timing);
        self.protocol = protocol;
        self.state = CardState::AtrOn;
        log::debug!(
            "ATR accepted: {} ({}, {} convention, {} baud)",
            atr,
            protocol,
            self.convention,
            self.timing.baud_rate
        );
        self.atr = Some(atr);
        Ok(())
    }
}
