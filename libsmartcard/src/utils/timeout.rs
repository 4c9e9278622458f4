// libsmartcard/src/utils/timeout.rs

//! Conversions between elementary time units and wall-clock time.
//!
//! Every wait in the transport is expressed in ETU; these helpers turn
//! those counts into microseconds or `Duration` for the current baud rate.

use std::time::Duration;

/// Microseconds spanned by `etu` characters' worth of bit times.
pub fn etu_to_micros(etu: u32, baud_rate: u32) -> u64 {
    if baud_rate == 0 {
        return 0;
    }
    (etu as u64 * 1_000_000) / baud_rate as u64
}

/// `etu_to_micros` as a `Duration`.
pub fn etu_to_duration(etu: u32, baud_rate: u32) -> Duration {
    Duration::from_micros(etu_to_micros(etu, baud_rate))
}

/// Card clock cycles expressed in ETU at `baud_rate`, rounded down.
pub fn clocks_to_etu(clocks: u32, baud_rate: u32, clock_hz: u32) -> u32 {
    if clock_hz == 0 {
        return 0;
    }
    ((clocks as u64 * baud_rate as u64) / clock_hz as u64) as u32
}
