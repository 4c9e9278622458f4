//! Small helpers shared by the protocol layers: hex rendering for logs and
//! ETU/time conversions.

pub mod hex;
pub mod timeout;

pub use hex::*;
pub use timeout::*;
