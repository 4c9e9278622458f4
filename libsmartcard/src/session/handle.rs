// libsmartcard/src/session/handle.rs

//! The session handle and its type states.

use std::marker::PhantomData;

use crate::atr::Atr;
use crate::config::SessionConfig;
use crate::constants::DEFAULT_IFSC;
use crate::protocol::link::Link;
use crate::protocol::pps::PpsMessage;
use crate::protocol::t1::T1State;
use crate::timing::TimingParameters;
use crate::transport::ByteTransport;
use crate::types::{CardState, Convention, EdcMode, PpsSupport, ProtocolType};
use crate::{Error, Result};

/// Type-state marker: transport not brought up yet
pub struct Uninitialized;
/// Type-state marker: transport ready, card operations available
pub struct Initialized;

/// One card slot driven through a byte transport. Card operations exist
/// only once the session is initialized.
pub struct CardSession<T: ByteTransport, State = Uninitialized> {
    pub(crate) transport: T,
    pub(crate) config: SessionConfig,
    pub(crate) atr: Option<Atr>,
    pub(crate) pps_response: Option<PpsMessage>,
    pub(crate) timing: TimingParameters,
    pub(crate) convention: Convention,
    pub(crate) protocol: ProtocolType,
    pub(crate) state: CardState,
    pub(crate) t1: T1State,
    _state: PhantomData<State>,
}

impl<T: ByteTransport> CardSession<T, Uninitialized> {
    /// Wrap a transport. The configuration is checked here so later
    /// operations can rely on it.
    pub fn new(transport: T, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let timing = TimingParameters::initial(config.reference_clock_hz);
        let t1 = T1State::new(DEFAULT_IFSC, config.edc_mode, config.emv_timing);
        Ok(Self {
            transport,
            config,
            atr: None,
            pps_response: None,
            timing,
            convention: Convention::Direct,
            protocol: ProtocolType::Invalid,
            state: CardState::Unknown,
            t1,
            _state: PhantomData,
        })
    }

    /// Bring the transport up and program the default baud rate.
    pub fn initialize(self) -> Result<CardSession<T, Initialized>> {
        let mut this = self;
        this.transport.initialize()?;
        let divisor = this.timing.baud_divisor(this.config.system_clock_hz);
        this.transport.set_baud_rate_divisor(divisor)?;
        log::debug!("session initialized, divisor {}", divisor);

        Ok(CardSession {
            transport: this.transport,
            config: this.config,
            atr: this.atr,
            pps_response: this.pps_response,
            timing: this.timing,
            convention: this.convention,
            protocol: this.protocol,
            state: this.state,
            t1: this.t1,
            _state: PhantomData,
        })
    }
}

impl<T: ByteTransport, State> CardSession<T, State> {
    /// Configuration the session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Borrow the transport mutably, e.g. to script a mock between calls.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back, ending the session.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: ByteTransport> CardSession<T, Initialized> {
    /// ATR of the last successful power-on.
    pub fn atr(&self) -> Option<&Atr> {
        self.atr.as_ref()
    }

    /// Answer of the last successful PPS exchange.
    pub fn pps_response(&self) -> Option<&PpsMessage> {
        self.pps_response.as_ref()
    }

    /// Timing in force for the current activation.
    pub fn timing(&self) -> &TimingParameters {
        &self.timing
    }

    /// Current T=1 information field size of the card.
    pub fn ifsc(&self) -> u8 {
        self.t1.ifsc
    }

    /// EDC used for T=1 blocks.
    pub fn edc_mode(&self) -> EdcMode {
        self.t1.edc
    }

    /// Convention announced by the last ATR.
    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// Card detect as reported by the transport.
    pub fn is_present(&self) -> bool {
        self.transport.card_present()
    }

    /// Whether a valid ATR is in force.
    pub fn state(&self) -> CardState {
        self.state
    }

    /// Protocol selected by the ATR or PPS.
    pub fn protocol_type(&self) -> ProtocolType {
        self.protocol
    }

    /// PPS permission from TA2. Without an ATR nothing may be negotiated.
    pub fn pps_support(&self) -> PpsSupport {
        self.atr
            .as_ref()
            .map(Atr::pps_support)
            .unwrap_or(PpsSupport::NotAllowed)
    }

    /// Deactivate the card and forget the protocol state. A failing
    /// deactivation is logged and otherwise ignored.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.transport.deactivate() {
            log::warn!("deactivation failed: {}", e);
        }
        self.state = CardState::Unknown;
        self.t1.resync();
        log::debug!("session shut down");
    }

    /// Card operations need a card that answered to reset.
    pub(crate) fn ensure_active(&self) -> Result<()> {
        if !self.transport.card_present() || self.state != CardState::AtrOn {
            return Err(Error::CardNotPresent);
        }
        Ok(())
    }

    /// Shut the session down when `result` carries an error.
    pub(crate) fn finish<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            log::warn!("transaction failed: {}", e);
            self.shutdown();
        }
        result
    }

    pub(crate) fn link(&mut self, extra_guard_etu: u32) -> Link<'_, T> {
        Link::new(
            &mut self.transport,
            self.convention,
            self.config.hardware_convention,
            extra_guard_etu,
        )
    }
}
