//! Hexadecimal rendering for log lines and `Display` impls.
//!
//! `HexBytes` formats lazily, so wrapping a buffer in a `debug!` or
//! `trace!` call costs nothing when the level is disabled.

use std::fmt;

/// Byte slice rendered as space separated upper-case pairs, `3B 8F 80`.
#[derive(Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self)
    }
}

/// Owned form of `HexBytes`.
pub fn to_hex_spaced(bytes: &[u8]) -> String {
    HexBytes(bytes).to_string()
}
