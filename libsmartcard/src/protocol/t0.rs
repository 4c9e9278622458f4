// libsmartcard/src/protocol/t0.rs

//! Character oriented half-duplex protocol T=0.
//!
//! The command header goes out first, then the card drives the exchange
//! with procedure bytes until it sends the status word.

use derive_more::Display;

use crate::constants::{
    GET_RESPONSE_INS, MAX_APDU_RESPONSE_LEN, T0_HEADER_LEN, T0_NULL_BYTE, T0_SW1_BYTES_AVAILABLE,
    T0_SW1_WRONG_LENGTH,
};
use crate::protocol::link::Link;
use crate::transport::ByteTransport;
use crate::types::ApduResponse;
use crate::{Error, Result};

/// ISO 7816-4 command case, short length fields only.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ApduCase {
    /// No command data, no response data
    #[display(fmt = "case 1")]
    Case1,
    /// Response data only, Le in P3 (0 means 256)
    #[display(fmt = "case 2S")]
    Case2,
    /// Command data only, Lc in P3
    #[display(fmt = "case 3S")]
    Case3,
    /// Command data and response data, Le trails the data
    #[display(fmt = "case 4S")]
    Case4,
}

/// Classify a command APDU by its length relative to the header.
pub fn classify(apdu: &[u8]) -> Result<ApduCase> {
    match apdu.len() {
        4 => Ok(ApduCase::Case1),
        5 => Ok(ApduCase::Case2),
        n if n > 5 => {
            let lc = apdu[4] as usize;
            if lc == 0 {
                Err(Error::InvalidCommandApduT0("Lc of zero".into()))
            } else if n == 5 + lc {
                Ok(ApduCase::Case3)
            } else if n == 6 + lc {
                Ok(ApduCase::Case4)
            } else {
                Err(Error::InvalidCommandApduT0(format!(
                    "{} bytes do not match Lc {}",
                    n, lc
                )))
            }
        }
        n => Err(Error::InvalidCommandApduT0(format!("{} byte command", n))),
    }
}

fn p3_len(p3: u8) -> usize {
    if p3 == 0 { 256 } else { p3 as usize }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Send { offset: usize },
    Receive { remaining: usize },
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusAction {
    Done,
    /// Resend the header with a corrected P3
    Resend(u8),
    /// Issue GET RESPONSE with this P3
    GetResponse(u8),
}

/// What to do with SW1 SW2 given the command case. `ins` is the
/// instruction of the original command.
fn status_action(case: ApduCase, sw1: u8, sw2: u8, ins: u8, all_sent: bool) -> StatusAction {
    match case {
        ApduCase::Case1 => StatusAction::Done,
        ApduCase::Case2 => match sw1 {
            T0_SW1_WRONG_LENGTH => StatusAction::Resend(sw2),
            T0_SW1_BYTES_AVAILABLE => StatusAction::GetResponse(sw2),
            _ => StatusAction::Done,
        },
        ApduCase::Case3 => match (sw1, sw2) {
            (0x90, 0x00) | (0x62, 0x81) => StatusAction::Done,
            (0x63, s) if s != 0x35 => StatusAction::Done,
            (T0_SW1_BYTES_AVAILABLE, s) => StatusAction::GetResponse(s),
            (0x62, _) | (0x63, _) if ins != 0x82 => StatusAction::GetResponse(0),
            (0x9F, _) if ins != 0x82 && all_sent => StatusAction::GetResponse(0),
            (T0_SW1_WRONG_LENGTH, s) => StatusAction::Resend(s),
            _ => StatusAction::Done,
        },
        ApduCase::Case4 => match (sw1, sw2) {
            (T0_SW1_BYTES_AVAILABLE, s) | (T0_SW1_WRONG_LENGTH, s) => StatusAction::GetResponse(s),
            (0x62, 0x81) => StatusAction::Done,
            (0x63, s) if s != 0x35 => StatusAction::Done,
            (0x62, _) | (0x63, _) => StatusAction::GetResponse(0),
            _ => StatusAction::Done,
        },
    }
}

/// Run one command APDU. `wait_etu` bounds every character read.
pub fn exchange<T: ByteTransport + ?Sized>(
    link: &mut Link<'_, T>,
    apdu: &[u8],
    wait_etu: u32,
) -> Result<ApduResponse> {
    let mut case = classify(apdu)?;
    let ins = apdu[1];

    let mut header = [0u8; T0_HEADER_LEN];
    header[..4].copy_from_slice(&apdu[..4]);
    header[4] = if case == ApduCase::Case1 { 0 } else { apdu[4] };

    let body: &[u8] = match case {
        ApduCase::Case3 | ApduCase::Case4 => &apdu[T0_HEADER_LEN..T0_HEADER_LEN + apdu[4] as usize],
        _ => &[],
    };

    log::debug!("T=0 {} INS={:02X}", case, ins);
    link.send(&header)?;

    let mut phase = match case {
        ApduCase::Case1 => Phase::Status,
        ApduCase::Case2 => Phase::Receive {
            remaining: p3_len(header[4]),
        },
        ApduCase::Case3 | ApduCase::Case4 => Phase::Send { offset: 0 },
    };
    let mut all_sent = body.is_empty();
    let mut data = Vec::new();

    loop {
        let current_ins = header[1];
        let pb = read(link, wait_etu)?;

        if pb == T0_NULL_BYTE {
            continue;
        }

        if pb == current_ins {
            match phase {
                Phase::Send { offset } => {
                    link.send(&body[offset..])?;
                    all_sent = true;
                    phase = Phase::Status;
                }
                Phase::Receive { remaining } => {
                    for _ in 0..remaining {
                        push(&mut data, read(link, wait_etu)?)?;
                    }
                    phase = Phase::Status;
                }
                Phase::Status => {}
            }
            continue;
        }

        if pb == !current_ins {
            match phase {
                Phase::Send { offset } => {
                    link.send(&body[offset..offset + 1])?;
                    if offset + 1 == body.len() {
                        all_sent = true;
                        phase = Phase::Status;
                    } else {
                        phase = Phase::Send { offset: offset + 1 };
                    }
                }
                Phase::Receive { remaining } => {
                    push(&mut data, read(link, wait_etu)?)?;
                    phase = if remaining > 1 {
                        Phase::Receive {
                            remaining: remaining - 1,
                        }
                    } else {
                        Phase::Status
                    };
                }
                Phase::Status => {}
            }
            continue;
        }

        if matches!(pb & 0xF0, 0x60 | 0x90) {
            let sw1 = pb;
            let sw2 = read(link, wait_etu)?;
            match status_action(case, sw1, sw2, ins, all_sent) {
                StatusAction::Done => {
                    log::debug!("T=0 done SW={:02X}{:02X}, {} bytes", sw1, sw2, data.len());
                    return Ok(ApduResponse::new(data, sw1, sw2));
                }
                StatusAction::Resend(p3) => {
                    log::debug!("T=0 SW={:02X}{:02X}, resending with P3={:02X}", sw1, sw2, p3);
                    header[4] = p3;
                    link.send(&header)?;
                    phase = if case == ApduCase::Case3 {
                        // command data counts as delivered, only SW1 SW2 follow
                        all_sent = true;
                        Phase::Status
                    } else {
                        Phase::Receive {
                            remaining: p3_len(p3),
                        }
                    };
                }
                StatusAction::GetResponse(p3) => {
                    log::debug!("T=0 SW={:02X}{:02X}, GET RESPONSE P3={:02X}", sw1, sw2, p3);
                    header = [0x00, GET_RESPONSE_INS, 0x00, 0x00, p3];
                    link.send(&header)?;
                    all_sent = true;
                    phase = Phase::Receive {
                        remaining: p3_len(p3),
                    };
                    // GET RESPONSE is itself a case 2 command
                    case = ApduCase::Case2;
                }
            }
            continue;
        }

        log::warn!("T=0 unexpected procedure byte {:02X}", pb);
        return Err(Error::ProcedureByte(pb));
    }
}

fn read<T: ByteTransport + ?Sized>(link: &mut Link<'_, T>, wait_etu: u32) -> Result<u8> {
    match link.receive(wait_etu) {
        Ok(b) => Ok(b),
        Err(Error::Timeout) | Err(Error::Parity) => Err(Error::CardNoResponse),
        Err(e) => Err(e),
    }
}

fn push(data: &mut Vec<u8>, byte: u8) -> Result<()> {
    if data.len() >= MAX_APDU_RESPONSE_LEN {
        return Err(Error::InvalidCommandApduT0(format!(
            "response exceeds {} bytes",
            MAX_APDU_RESPONSE_LEN
        )));
    }
    data.push(byte);
    Ok(())
}
