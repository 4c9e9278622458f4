// libsmartcard/src/lib.rs

//! libsmartcard
//!
//! ISO/IEC 7816-3 contact smart-card transport: answer-to-reset
//! interpretation, protocol and parameter selection, and the T=0 and T=1
//! transmission protocols, driven over a platform supplied byte transport.
#![warn(missing_docs)]

pub mod atr;
pub mod config;
pub mod constants;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod session;
pub mod test_support;
pub mod timing;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export common types at crate root so `crate::Error`, `crate::Result`,
// and the value types in `types` are available for consumers and for
// convenient `prelude` re-exports.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
