// libsmartcard/src/protocol/mod.rs

//! Wire level protocol pieces: convention handling, PPS, block codec
//! and the T=0 / T=1 state machines.

pub mod block;
pub mod convention;
pub mod edc;
pub mod link;
pub mod parser;
pub mod pps;
pub mod t0;
pub mod t1;

pub use block::{Block, BlockKind, Supervisory};
pub use edc::{crc16, lrc};
pub use link::Link;
pub use pps::PpsMessage;
pub use t0::ApduCase;
pub use t1::{T1Outcome, T1State};
