// libsmartcard/src/protocol/t1.rs

//! Block oriented half-duplex protocol T=1.
//!
//! `exchange` runs one command: either an I-block chain carrying an APDU,
//! or a single S-block request such as an IFS negotiation. Sequence bits
//! and the IFSC live in `T1State` and survive between commands.

use crate::config::SessionConfig;
use crate::constants::{
    MAX_APDU_RESPONSE_LEN, MAX_IFS, MIN_IFS, T1_MAX_RESTARTS, T1_MAX_RETRIES, T1_MAX_ROUNDS,
    T1_RETRIES_BEFORE_RESYNC, T1_WAIT_MARGIN_ETU,
};
use crate::protocol::block::{Block, BlockKind, Supervisory, pcb};
use crate::protocol::link::Link;
use crate::timing::TimingParameters;
use crate::transport::ByteTransport;
use crate::types::{ApduResponse, EdcMode, Prologue};
use crate::{Error, Result};

/// Protocol state kept across exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct T1State {
    /// N(S) of the last I-block sent
    pub tx_sbit: bool,
    /// N(S) of the last I-block accepted from the card
    pub rx_sbit_prev: bool,
    /// Largest information field the card accepts
    pub ifsc: u8,
    /// Epilogue in use
    pub edc: EdcMode,
    /// EDC computed without NAD on transmit
    pub emv: bool,
}

impl T1State {
    /// State right after the ATR: the first I-block on either side carries N(S) = 0.
    pub fn new(ifsc: u8, edc: EdcMode, emv: bool) -> Self {
        Self {
            tx_sbit: true,
            rx_sbit_prev: true,
            ifsc,
            edc,
            emv,
        }
    }

    /// Sequence numbers after activation or an accepted RESYNC: the next
    /// I-block each side sends carries N(S) = 0.
    pub fn resync(&mut self) {
        self.tx_sbit = true;
        self.rx_sbit_prev = true;
    }
}

/// Wait times and policy switches for one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct T1Params {
    /// Character waiting time
    pub cwt_etu: u32,
    /// Block waiting time, before any WTX
    pub bwt_etu: u32,
    /// Try S(RESYNCH) before giving up
    pub resync_enabled: bool,
    /// Answer S(ABORT request) before deactivating
    pub abort_response: bool,
    /// Treat a CWT overrun as fatal
    pub deactivate_on_cwt: bool,
}

impl T1Params {
    /// Parameters for the negotiated timing and session policy.
    pub fn new(timing: &TimingParameters, config: &SessionConfig) -> Self {
        Self {
            cwt_etu: timing.t1_cwt_etu,
            bwt_etu: timing.t1_bwt_etu,
            resync_enabled: config.resync_enabled,
            abort_response: config.abort_response_before_deactivation,
            deactivate_on_cwt: config.deactivate_on_cwt_exceeded,
        }
    }
}

/// How an exchange ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum T1Outcome {
    /// The chain finished with this response
    Completed(ApduResponse),
    /// The card sent S(ABORT request); the session must be deactivated
    Aborted,
}

/// Result of reading one block off the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A well formed block
    Block(Block),
    /// Something arrived but cannot be used. `error` is the R-block error
    /// code to report back.
    Invalid {
        /// R-block error code
        error: u8,
        /// What was wrong with it
        cause: Error,
    },
    /// Nothing within the block wait time
    Missing,
}

/// One block read plus what the character timer saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    /// What was read
    pub received: Received,
    /// A character arrived late, or not at all, inside the block
    pub cwt_exceeded: bool,
}

/// Encode `block` with the session EDC and put it on the line.
pub fn send_block<T: ByteTransport + ?Sized>(
    link: &mut Link<'_, T>,
    state: &T1State,
    block: &Block,
) -> Result<()> {
    log::trace!("T=1 send {}", block);
    let frame = block.encode(state.edc, state.emv)?;
    link.send(&frame)
}

/// Read one block. The NAD is awaited for BWT times `wtx`, every later
/// character for CWT; both get a 4 ETU margin.
pub fn receive_block<T: ByteTransport + ?Sized>(
    link: &mut Link<'_, T>,
    edc: EdcMode,
    params: &T1Params,
    wtx: u32,
) -> Result<Reception> {
    let block_wait = params.bwt_etu.saturating_mul(wtx.max(1)) + T1_WAIT_MARGIN_ETU;
    let char_wait = params.cwt_etu + T1_WAIT_MARGIN_ETU;

    let mut parity = false;
    let mut late = false;

    let nad = match link.receive(block_wait) {
        Ok(b) => b,
        Err(Error::Timeout) => {
            return Ok(Reception {
                received: Received::Missing,
                cwt_exceeded: false,
            });
        }
        Err(Error::Parity) => {
            parity = true;
            0
        }
        Err(e) => return Err(e),
    };

    let pcb = read_char(link, char_wait, &mut late, &mut parity)?;
    let len = read_char(link, char_wait, &mut late, &mut parity)?;
    let oversized = len as usize > Block::MAX_INF;
    let remaining = len as usize + edc.trailer_len();
    let mut raw = Vec::with_capacity(3 + remaining);
    raw.extend_from_slice(&[nad, pcb, len]);
    for _ in 0..remaining {
        raw.push(read_char(link, char_wait, &mut late, &mut parity)?);
    }

    let invalid = |error: u8, cause: Error| Received::Invalid { error, cause };
    let received = if oversized {
        invalid(
            pcb::R_ERR_OTHER,
            Error::InvalidLength {
                expected: Block::MAX_INF,
                actual: len as usize,
            },
        )
    } else if late {
        invalid(pcb::R_ERR_OTHER, Error::CardNoResponse)
    } else {
        match Block::decode(&raw, edc) {
            Err(cause) => invalid(pcb::R_ERR_EDC, cause),
            Ok(_) if parity => invalid(pcb::R_ERR_EDC, Error::Parity),
            Ok(block) => match check_structure(&block) {
                Ok(()) => Received::Block(block),
                Err(cause) => invalid(pcb::R_ERR_OTHER, cause),
            },
        }
    };

    if let Received::Invalid { cause, .. } = &received {
        log::warn!("T=1 invalid block: {}", cause);
    } else if let Received::Block(b) = &received {
        log::trace!("T=1 recv {}", b);
    }

    Ok(Reception {
        received,
        cwt_exceeded: late,
    })
}

/// One character inside a block. Faults are flagged and reading goes on
/// so the line is drained up to the announced length.
fn read_char<T: ByteTransport + ?Sized>(
    link: &mut Link<'_, T>,
    wait_etu: u32,
    late: &mut bool,
    parity: &mut bool,
) -> Result<u8> {
    match link.receive(wait_etu) {
        Ok(b) => Ok(b),
        Err(Error::Timeout) => {
            *late = true;
            Ok(0)
        }
        Err(Error::Parity) => {
            *parity = true;
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

/// Field rules a block must follow beyond its EDC.
fn check_structure(block: &Block) -> Result<()> {
    let bad = |what: &str| Err(Error::T1InvalidBlock(format!("{} ({})", what, block)));
    if block.nad != 0 {
        return bad("NAD is not zero");
    }
    match block.kind() {
        BlockKind::Information => Ok(()),
        BlockKind::ReceiveReady => {
            if !block.data.is_empty() {
                return bad("R-block with information field");
            }
            if block.pcb & 0x20 != 0 {
                return bad("R-block with bit 6 set");
            }
            Ok(())
        }
        BlockKind::Supervisory => {
            if block.pcb & 0x1F >= 0x04 {
                return bad("unknown S-block");
            }
            let one_byte = matches!(
                block.pcb,
                pcb::S_IFS_REQUEST | pcb::S_IFS_RESPONSE | pcb::S_WTX_REQUEST | pcb::S_WTX_RESPONSE
            );
            if one_byte && block.data.len() != 1 {
                return bad("S-block needs one byte");
            }
            if matches!(block.pcb, pcb::S_IFS_REQUEST | pcb::S_IFS_RESPONSE)
                && !(MIN_IFS..=MAX_IFS).contains(&block.data[0])
            {
                return bad("IFS out of range");
            }
            if block.pcb == pcb::S_ABORT_RESPONSE && !block.data.is_empty() {
                return bad("ABORT response with data");
            }
            Ok(())
        }
    }
}

/// Run one command: an I-block chain or a supervisory request, picked by
/// the type bits of `prologue.pcb`. The information field is `inf`.
pub fn exchange<T: ByteTransport + ?Sized>(
    link: &mut Link<'_, T>,
    state: &mut T1State,
    params: &T1Params,
    prologue: &Prologue,
    inf: &[u8],
) -> Result<T1Outcome> {
    match BlockKind::of(prologue.pcb) {
        BlockKind::Information => information_exchange(link, state, params, inf),
        BlockKind::Supervisory => {
            let data = supervisory_exchange(link, state, params, prologue.pcb, inf)?;
            Ok(T1Outcome::Completed(ApduResponse::new(data, 0, 0)))
        }
        BlockKind::ReceiveReady => Err(Error::InvalidCommandApduT1(
            "an exchange cannot start with an R-block".into(),
        )),
    }
}

/// Next I-block of the chain starting at `offset`. Toggles N(S).
fn next_segment(state: &mut T1State, inf: &[u8], offset: usize) -> (Block, usize) {
    state.tx_sbit = !state.tx_sbit;
    segment_at(state, inf, offset)
}

/// I-block at `offset` with the current N(S).
fn segment_at(state: &T1State, inf: &[u8], offset: usize) -> (Block, usize) {
    let rest = &inf[offset.min(inf.len())..];
    let ifsc = state.ifsc as usize;
    let more = rest.len() > ifsc;
    let len = rest.len().min(ifsc);
    (Block::information(state.tx_sbit, more, &rest[..len]), len)
}

fn resync_or_fail(params: &T1Params) -> Result<Block> {
    if params.resync_enabled {
        log::debug!("T=1 retries spent, requesting RESYNC");
        Ok(Block::supervisory(pcb::S_RESYNC_REQUEST, &[]))
    } else {
        log::warn!("T=1 retries spent");
        Err(Error::T1RetryExhausted)
    }
}

fn information_exchange<T: ByteTransport + ?Sized>(
    link: &mut Link<'_, T>,
    state: &mut T1State,
    params: &T1Params,
    inf: &[u8],
) -> Result<T1Outcome> {
    let mut restarts = 0u8;

    'restart: loop {
        let mut offset = 0usize;
        let mut retry_r = 0u8;
        let mut rounds = 0u8;
        let mut rx_mbit = false;
        let mut received = Vec::new();
        let mut wtx = 1u32;

        let (mut last_i, mut segment) = next_segment(state, inf, offset);
        let mut tx = last_i.clone();

        loop {
            send_block(link, state, &tx)?;
            let reception = receive_block(link, state.edc, params, wtx)?;
            wtx = 1;
            rounds = rounds.saturating_add(1);

            if reception.cwt_exceeded && params.deactivate_on_cwt {
                return Err(Error::CardNoResponse);
            }

            let tx_mbit = last_i.more();
            let mut error = pcb::R_ERR_OTHER;
            let mut block = match reception.received {
                Received::Block(b) => Some(b),
                Received::Invalid { error: e, .. } => {
                    error = e;
                    None
                }
                Received::Missing => None,
            };

            // I-blocks are only acceptable once our chain is complete and
            // must carry the next sequence number
            if let Some(b) = &block {
                if b.kind() == BlockKind::Information
                    && (tx_mbit || b.sequence() == state.rx_sbit_prev)
                {
                    log::warn!("T=1 unexpected I-block {}", b);
                    block = None;
                    error = pcb::R_ERR_OTHER;
                }
            }

            match block {
                Some(b) if b.kind() == BlockKind::Information => {
                    rx_mbit = b.more();
                    state.rx_sbit_prev = b.sequence();
                    retry_r = 0;
                    rounds = 0;
                    if received.len() + b.data.len() > MAX_APDU_RESPONSE_LEN + 2 {
                        return Err(Error::InvalidLength {
                            expected: MAX_APDU_RESPONSE_LEN + 2,
                            actual: received.len() + b.data.len(),
                        });
                    }
                    received.extend_from_slice(&b.data);
                    if rx_mbit {
                        tx = Block::receive_ready(!b.sequence(), 0);
                        continue;
                    }
                    log::debug!("T=1 response complete, {} bytes", received.len());
                    return Ok(T1Outcome::Completed(ApduResponse::from_raw(received)));
                }

                Some(b) if b.kind() == BlockKind::Supervisory && !b.is_response() => {
                    match b.pcb {
                        pcb::S_IFS_REQUEST => {
                            log::debug!("T=1 card sets IFSC to {:#04x}", b.data[0]);
                            state.ifsc = b.data[0];
                            tx = Block::supervisory(pcb::S_IFS_RESPONSE, &b.data);
                        }
                        pcb::S_WTX_REQUEST => {
                            log::debug!("T=1 waiting time extension x{}", b.data[0]);
                            wtx = b.data[0] as u32;
                            rounds = 0;
                            tx = Block::supervisory(pcb::S_WTX_RESPONSE, &b.data);
                        }
                        pcb::S_ABORT_REQUEST => {
                            log::warn!("T=1 card aborted the exchange");
                            if params.abort_response {
                                send_block(
                                    link,
                                    state,
                                    &Block::supervisory(pcb::S_ABORT_RESPONSE, &[]),
                                )?;
                            }
                            return Ok(T1Outcome::Aborted);
                        }
                        _ => {
                            // RESYNC requests come from the reader only
                            tx = invalid_block_reply(
                                &tx, state, params, rx_mbit, pcb::R_ERR_OTHER, &mut retry_r,
                            )?;
                        }
                    }
                }

                Some(b) if b.kind() == BlockKind::Supervisory => {
                    let matches_request = b.supervisory_kind() != Some(Supervisory::Ifs)
                        && tx.kind() == BlockKind::Supervisory
                        && b.pcb == tx.pcb | pcb::S_RESPONSE;
                    if matches_request {
                        restarts += 1;
                        if restarts > T1_MAX_RESTARTS {
                            return Err(Error::T1RetryExhausted);
                        }
                        if b.supervisory_kind() == Some(Supervisory::Resync) {
                            state.resync();
                        } else {
                            state.tx_sbit = true;
                        }
                        log::debug!("T=1 {} accepted, restarting exchange", b);
                        continue 'restart;
                    }
                    tx = invalid_block_reply(
                        &tx, state, params, rx_mbit, pcb::R_ERR_OTHER, &mut retry_r,
                    )?;
                }

                Some(b) => {
                    // R-block
                    let seq = b.sequence();
                    if tx_mbit {
                        if seq != state.tx_sbit {
                            offset += segment;
                            (last_i, segment) = next_segment(state, inf, offset);
                            tx = last_i.clone();
                            rounds = 0;
                        } else {
                            retry_r += 1;
                            if retry_r > T1_RETRIES_BEFORE_RESYNC {
                                tx = resync_or_fail(params)?;
                            }
                        }
                    } else if rx_mbit {
                        // card asks again for our acknowledgement
                    } else if seq == state.tx_sbit {
                        if retry_r < T1_RETRIES_BEFORE_RESYNC {
                            (last_i, segment) = segment_at(state, inf, offset);
                            tx = last_i.clone();
                        } else {
                            tx = resync_or_fail(params)?;
                        }
                        retry_r += 1;
                    } else if tx.kind() != BlockKind::ReceiveReady {
                        tx = Block::receive_ready(!state.rx_sbit_prev, pcb::R_ERR_OTHER);
                    }
                }

                None => {
                    tx = invalid_block_reply(&tx, state, params, rx_mbit, error, &mut retry_r)?;
                }
            }

            if retry_r >= T1_MAX_RETRIES || rounds >= T1_MAX_ROUNDS {
                log::warn!("T=1 gave up after {} retries, {} rounds", retry_r, rounds);
                return Err(Error::T1RetryExhausted);
            }
        }
    }
}

/// Block to send after an invalid or missing block.
fn invalid_block_reply(
    tx: &Block,
    state: &T1State,
    params: &T1Params,
    rx_mbit: bool,
    error: u8,
    retry_r: &mut u8,
) -> Result<Block> {
    let next = if rx_mbit {
        tx.clone()
    } else if *retry_r < T1_RETRIES_BEFORE_RESYNC {
        match tx.kind() {
            BlockKind::ReceiveReady => tx.clone(),
            _ => Block::receive_ready(!state.rx_sbit_prev, error),
        }
    } else {
        resync_or_fail(params)?
    };
    *retry_r += 1;
    Ok(next)
}

fn validate_supervisory_request(request_pcb: u8, inf: &[u8]) -> Result<Supervisory> {
    let kind = Supervisory::of(request_pcb)
        .filter(|_| request_pcb & pcb::S_RESPONSE == 0)
        .ok_or_else(|| {
            Error::InvalidCommandApduT1(format!("PCB {:#04x} is not an S-block request", request_pcb))
        })?;
    if inf.len() > 1 {
        return Err(Error::InvalidCommandApduT1(format!(
            "S-block with {} byte information field",
            inf.len()
        )));
    }
    if kind == Supervisory::Ifs && !matches!(inf.first(), Some(v) if (MIN_IFS..=MAX_IFS).contains(v))
    {
        return Err(Error::InvalidCommandApduT1("IFS request needs a value in 0x10..=0xFE".into()));
    }
    Ok(kind)
}

/// Send an S-block request and wait for the matching response. Returns
/// the information field of the response.
fn supervisory_exchange<T: ByteTransport + ?Sized>(
    link: &mut Link<'_, T>,
    state: &mut T1State,
    params: &T1Params,
    request_pcb: u8,
    inf: &[u8],
) -> Result<Vec<u8>> {
    validate_supervisory_request(request_pcb, inf)?;

    let mut tx = Block::supervisory(request_pcb, inf);
    let mut retry_r = 0u8;
    let mut wtx = 1u32;

    for _ in 0..T1_MAX_ROUNDS {
        send_block(link, state, &tx)?;
        let reception = receive_block(link, state.edc, params, wtx)?;
        wtx = 1;

        if reception.cwt_exceeded && params.deactivate_on_cwt {
            return Err(Error::CardNoResponse);
        }

        match reception.received {
            Received::Block(b) if b.kind() == BlockKind::Supervisory && b.is_response() => {
                if b.pcb != tx.pcb | pcb::S_RESPONSE {
                    retry_r += 1;
                    continue;
                }
                if b.data != tx.data {
                    log::warn!("T=1 {} does not echo {}", b, tx);
                    retry_r += 1;
                    continue;
                }
                if b.supervisory_kind() == Some(Supervisory::Resync) {
                    state.resync();
                }
                log::debug!("T=1 {} confirmed", b);
                return Ok(b.data);
            }
            Received::Block(b) if b.kind() == BlockKind::Supervisory => match b.pcb {
                pcb::S_IFS_REQUEST => {
                    state.ifsc = b.data[0];
                    send_block(link, state, &Block::supervisory(pcb::S_IFS_RESPONSE, &b.data))?;
                }
                pcb::S_WTX_REQUEST => {
                    wtx = b.data[0] as u32;
                    send_block(link, state, &Block::supervisory(pcb::S_WTX_RESPONSE, &b.data))?;
                }
                _ => {
                    return Err(Error::T1SBlockResponse(format!(
                        "card sent {} during an S-block exchange",
                        b
                    )));
                }
            },
            _ => {
                if retry_r >= T1_RETRIES_BEFORE_RESYNC {
                    tx = resync_or_fail(params)?;
                    retry_r = 0;
                }
                retry_r += 1;
            }
        }
    }

    Err(Error::T1RetryExhausted)
}
