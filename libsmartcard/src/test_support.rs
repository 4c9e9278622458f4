//! Test support helpers intended for use by unit and integration tests.
//!
//! These helpers centralize common MockTransport setup so tests across the
//! crate and tests/ directory can reuse the same logic.
#![allow(dead_code)]

use crate::config::SessionConfig;
use crate::protocol::block::Block;
use crate::session::{CardSession, Initialized};
use crate::transport::MockTransport;
use crate::types::{EdcMode, ResetType};
use crate::Result;

/// T=0 card: TB1=00, TC1=00, nothing else.
#[doc(hidden)]
pub const T0_ATR: &[u8] = &[0x3B, 0x60, 0x00, 0x00];

/// Append the TCK that makes T0..=TCK XOR to zero.
#[doc(hidden)]
pub fn with_tck(bytes: &[u8]) -> Vec<u8> {
    let tck = bytes.iter().skip(1).fold(0u8, |acc, &b| acc ^ b);
    let mut out = bytes.to_vec();
    out.push(tck);
    out
}

/// T=1 card: TB1=00, TC1=FF, TD1=81, TD2=31, TA3=FE (IFSC), TB3=45
/// (BWI 4, CWI 5) and five historical bytes.
#[doc(hidden)]
pub fn t1_atr() -> Vec<u8> {
    with_tck(&[
        0x3B, 0xE5, 0x00, 0xFF, 0x81, 0x31, 0xFE, 0x45, 0x01, 0x02, 0x03, 0x04, 0x05,
    ])
}

#[doc(hidden)]
pub fn mock_with_atr(atr: &[u8]) -> MockTransport {
    let mut mock = MockTransport::new();
    mock.push_bytes(atr);
    mock
}

/// Build and initialize a session over `mock`.
#[doc(hidden)]
pub fn initialized_session(
    mock: MockTransport,
    config: SessionConfig,
) -> Result<CardSession<MockTransport, Initialized>> {
    CardSession::new(mock, config)?.initialize()
}

/// A session whose card answered a cold reset with `atr`.
#[doc(hidden)]
pub fn powered_session(
    atr: &[u8],
    config: SessionConfig,
) -> Result<CardSession<MockTransport, Initialized>> {
    let mut session = initialized_session(mock_with_atr(atr), config)?;
    session.power_on_atr(ResetType::Cold)?;
    Ok(session)
}

/// Wire image of a block sent by the card (LRC over NAD included).
/// Blocks the encoder refuses come out empty.
#[doc(hidden)]
pub fn card_block(block: &Block) -> Vec<u8> {
    card_block_with(block, EdcMode::Lrc)
}

#[doc(hidden)]
pub fn card_block_with(block: &Block, mode: EdcMode) -> Vec<u8> {
    block.encode(mode, false).unwrap_or_default()
}
