// libsmartcard/src/protocol/convention.rs

//! Inverse convention in software.
//!
//! An inverse-convention card sends bits MSB first with inverted levels. A
//! UART set up for the direct convention sees every such character bit
//! reversed and complemented, so the same mapping converts both ways.

use crate::types::Convention;

const NIBBLE_REVERSED: [u8; 16] = [0, 8, 4, 12, 2, 10, 6, 14, 1, 9, 5, 13, 3, 11, 7, 15];

/// Reverse the bit order of `byte` and complement it.
pub fn inverse_byte(byte: u8) -> u8 {
    let lo = NIBBLE_REVERSED[(byte & 0x0F) as usize];
    let hi = NIBBLE_REVERSED[(byte >> 4) as usize];
    ((lo << 4) | hi) ^ 0xFF
}

/// Map a character between the wire and the logical value.
pub fn apply(convention: Convention, byte: u8) -> u8 {
    match convention {
        Convention::Direct => byte,
        Convention::Inverse => inverse_byte(byte),
    }
}
