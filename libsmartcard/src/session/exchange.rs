// libsmartcard/src/session/exchange.rs

//! PPS and APDU exchanges on an activated card.

use crate::protocol::block::pcb;
use crate::protocol::link::Link;
use crate::protocol::pps::{self, PpsMessage};
use crate::protocol::t0;
use crate::protocol::t1::{self, T1Outcome, T1Params};
use crate::session::handle::{CardSession, Initialized};
use crate::timing::{FdParameters, TimingParameters};
use crate::transport::ByteTransport;
use crate::types::{ApduResponse, PpsSupport, ProtocolType, Prologue};
use crate::{Error, Result};

impl<T: ByteTransport> CardSession<T, Initialized> {
    /// Send a PPS request (PPSS PPS0 [PPS1] [PPS2] [PPS3] PCK) and switch
    /// to the parameters the card confirms.
    pub fn pps_exchange(&mut self, request: &[u8]) -> Result<PpsMessage> {
        let result = self.negotiate_pps(request);
        self.finish(result)
    }

    fn negotiate_pps(&mut self, request: &[u8]) -> Result<PpsMessage> {
        self.ensure_active()?;
        if self.pps_support() == PpsSupport::NotAllowed {
            return Err(Error::PpsFailed("card does not allow PPS".into()));
        }
        let request = PpsMessage::from_bytes(request)?;

        // PPS goes out with the plain 12 ETU character frame
        let answer = pps::negotiate(&mut self.link(0), &request)?;

        let protocol = answer.protocol();
        let fd = answer
            .pps1()
            .map(FdParameters::from_ta1)
            .unwrap_or(self.timing.fd);
        if let Some(atr) = self.atr.as_ref() {
            self.timing =
                TimingParameters::compute(atr, fd, protocol, self.config.reference_clock_hz);
        }
        if answer.pps1().is_some() {
            self.transport
                .set_baud_rate_divisor(self.timing.baud_divisor(self.config.system_clock_hz))?;
        }
        self.protocol = protocol;
        log::debug!(
            "PPS accepted: {} at {} baud",
            protocol,
            self.timing.baud_rate
        );
        self.pps_response = Some(answer.clone());
        Ok(answer)
    }

    /// Run one command APDU over T=0.
    pub fn data_exchange_t0(&mut self, apdu: &[u8]) -> Result<ApduResponse> {
        let result = self.exchange_t0(apdu);
        self.finish(result)
    }

    fn exchange_t0(&mut self, apdu: &[u8]) -> Result<ApduResponse> {
        self.ensure_active()?;
        let wait = self.timing.work_wait_etu(self.config.emv_timing);
        let guard = self.timing.extra_guard_etu(ProtocolType::T0);
        t0::exchange(&mut self.link(guard), apdu, wait)
    }

    /// Run one T=1 exchange. An I-block prologue sends `inf` as an APDU,
    /// chained over several blocks when it exceeds the IFSC; an S-block
    /// prologue sends a supervisory request and returns the card's echo
    /// as response data.
    ///
    /// When the card aborts the exchange the session is shut down and an
    /// empty response is returned.
    pub fn data_exchange_t1(&mut self, prologue: Prologue, inf: &[u8]) -> Result<ApduResponse> {
        let result = self.exchange_t1(&prologue, inf);
        match self.finish(result)? {
            T1Outcome::Completed(response) => Ok(response),
            T1Outcome::Aborted => {
                self.shutdown();
                Ok(ApduResponse::default())
            }
        }
    }

    fn exchange_t1(&mut self, prologue: &Prologue, inf: &[u8]) -> Result<T1Outcome> {
        self.ensure_active()?;
        let params = T1Params::new(&self.timing, &self.config);
        let guard = self.timing.extra_guard_etu(ProtocolType::T1);
        let mut link = Link::new(
            &mut self.transport,
            self.convention,
            self.config.hardware_convention,
            guard,
        );
        t1::exchange(&mut link, &mut self.t1, &params, prologue, inf)
    }

    /// Announce the configured IFSD to the card with S(IFS request).
    pub fn negotiate_ifsd(&mut self) -> Result<()> {
        let ifsd = self.config.ifsd;
        self.data_exchange_t1(Prologue::supervisory(pcb::S_IFS_REQUEST, 1), &[ifsd])?;
        log::debug!("IFSD {:#04x} accepted", ifsd);
        Ok(())
    }
}
